//! service-core: shared HTTP infrastructure for the projects services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
