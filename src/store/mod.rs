//! Flat-file record log with staleness rotation.

pub mod log_store;
pub mod record;

pub use log_store::LogStore;
pub use record::{sanitize_code, LogRecord};
