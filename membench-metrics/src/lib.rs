//! Metrics engine: pure post-hoc computation over stored evaluation
//! results, dispatched by name through the metric registry.

pub mod calculators;
pub mod registry;
pub mod relevance;

pub use calculators::*;
pub use registry::{Metric, MetricContext, MetricRegistry};
pub use relevance::{
    reconstruct_item, resolve, row_relevance, RelevanceSource, RowRelevance,
    DEFAULT_TOKEN_THRESHOLD, SUCCESS_TOKEN_THRESHOLD,
};
