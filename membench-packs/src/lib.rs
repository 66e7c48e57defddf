//! Benchmark packs: versioned, sealed prompt/scoring/relevance
//! definitions, one per benchmark.

pub mod code;
pub mod locomo;
pub mod longmemeval;
pub mod prompt;
pub mod registry;

pub use code::{CodeRetrievalPack, CodeScoring};
pub use locomo::LocomoPack;
pub use longmemeval::LongMemEvalPack;
pub use registry::PackRegistry;
