pub mod sheet;

pub use sheet::{MessageResponse, RowRange, SheetToDbRequest, SheetUpdate};
