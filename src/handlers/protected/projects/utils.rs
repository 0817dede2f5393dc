use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::ProjectStatus;

pub const PROJECT_NOT_FOUND: &str = "Project not found";

/// Ids that cannot be UUIDs can never match a row.
pub fn parse_project_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::not_found(PROJECT_NOT_FOUND))
}

/// Unknown status filters are dropped rather than rejected.
pub fn status_filter(raw: Option<&str>) -> Option<ProjectStatus> {
    let raw = raw?;
    match raw.parse() {
        Ok(status) => Some(status),
        Err(_) => {
            tracing::debug!("Ignoring unknown status filter '{}'", raw);
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    /// Unparsable values fall back to the defaults. The limit is capped only
    /// when `max_list_limit` is configured.
    pub fn from_params(limit: Option<&str>, offset: Option<&str>, config: &ApiConfig) -> Self {
        let limit = limit
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(config.default_list_limit);
        let limit = match config.max_list_limit {
            Some(max) => limit.min(max),
            None => limit,
        };
        let offset = offset.and_then(|s| s.trim().parse::<u32>().ok()).unwrap_or(0);
        Self { limit, offset }
    }

    pub fn has_more(&self, total: Option<u64>) -> bool {
        total.unwrap_or(0) > u64::from(self.offset) + u64::from(self.limit)
    }

    /// `{total, limit, offset, hasMore}`
    pub fn to_json(&self, total: Option<u64>) -> Value {
        json!({
            "total": total,
            "limit": self.limit,
            "offset": self.offset,
            "hasMore": self.has_more(total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn api() -> ApiConfig {
        AppConfig::development().api
    }

    #[test]
    fn defaults_apply_to_missing_or_garbage_params() {
        let config = api();
        assert_eq!(Pagination::from_params(None, None, &config), Pagination { limit: 50, offset: 0 });
        assert_eq!(
            Pagination::from_params(Some("abc"), Some("-3"), &config),
            Pagination { limit: 50, offset: 0 }
        );
        assert_eq!(
            Pagination::from_params(Some("10"), Some("20"), &config),
            Pagination { limit: 10, offset: 20 }
        );
    }

    #[test]
    fn limit_is_uncapped_unless_configured() {
        let mut config = api();
        assert_eq!(Pagination::from_params(Some("100000"), None, &config).limit, 100000);

        config.max_list_limit = Some(200);
        assert_eq!(Pagination::from_params(Some("100000"), None, &config).limit, 200);
        assert_eq!(Pagination::from_params(Some("20"), None, &config).limit, 20);
    }

    #[test]
    fn has_more_arithmetic() {
        let page = Pagination { limit: 10, offset: 0 };
        assert!(page.has_more(Some(11)));
        assert!(!page.has_more(Some(10)));
        assert!(!page.has_more(None));

        let page = Pagination { limit: 10, offset: 50 };
        assert!(page.has_more(Some(61)));
        assert!(!page.has_more(Some(60)));
        assert_eq!(page.to_json(Some(60))["hasMore"], false);
    }

    #[test]
    fn unknown_status_filter_is_ignored() {
        assert_eq!(status_filter(Some("active")), Some(ProjectStatus::Active));
        assert_eq!(status_filter(Some("paused")), None);
        assert_eq!(status_filter(None), None);
    }

    #[test]
    fn non_uuid_id_is_not_found() {
        let err = parse_project_id("42").unwrap_err();
        assert_eq!(err.message(), PROJECT_NOT_FOUND);
        assert!(parse_project_id("6f1c1c9e-1d3b-4a7e-9d65-0f0e6f3f9a11").is_ok());
    }
}
