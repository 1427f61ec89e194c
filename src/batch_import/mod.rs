//! Batch import of transactions from CSV files.
//!
//! Uploaded files are parsed in full, then submitted to the scoring API in
//! sequential chunks while the tally is accumulated.

mod coordinator;
mod csv;
mod import_endpoint;
mod import_page;

pub use coordinator::DEFAULT_BATCH_SIZE;
pub use import_endpoint::{ImportState, import_transactions};
pub use import_page::get_import_page;
