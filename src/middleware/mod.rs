pub mod guard;
pub mod session;

pub use guard::{guard, guard_middleware, GuardDecision};
pub use session::{session_middleware, verify, AuthUser, CookieUpdate, RequestContext, Verification};
