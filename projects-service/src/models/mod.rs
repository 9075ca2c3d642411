pub mod project_row;

pub use project_row::{ProjectRow, RowFields, ROW_FIELD};
