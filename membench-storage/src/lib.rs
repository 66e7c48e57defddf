//! Results persistence: append-only SQLite store with aggregation
//! queries and JSON/CSV export.

pub mod export;
pub mod queries;
pub mod store;

pub use export::{parse_export, RunExport};
pub use queries::{GroupAggregate, PairAggregate};
pub use store::ResultsStore;
