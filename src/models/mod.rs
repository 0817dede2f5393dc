pub mod profile;
pub mod project;

pub use profile::{Profile, ProfileChanges};
pub use project::{NewProject, Project, ProjectChanges, ProjectStatus};
