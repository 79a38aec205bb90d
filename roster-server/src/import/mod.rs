//! Spreadsheet import pipeline

pub mod parse;
pub mod pipeline;

pub use parse::{parse_upload, SheetRow, EMPTY_OR_INVALID_FILE};
pub use pipeline::{ImportOutcome, ImportPipeline};
