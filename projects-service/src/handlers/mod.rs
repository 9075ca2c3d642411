pub mod health;
pub mod projects;
pub mod sheet;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use projects::list_projects;
pub use sheet::{sheet_to_db, SYNC_SUCCESS_MESSAGE};
