pub mod database;
pub mod memory;
pub mod metrics;
pub mod sheet_sync;
pub mod store;

pub use database::MongoDb;
pub use memory::InMemoryProjectStore;
pub use metrics::{get_metrics, init_metrics};
pub use sheet_sync::{sync_sheet, SyncOutcome};
pub use store::{ProjectStore, WriteBatch, WriteOp};
