//! Well-known metadata keys.
//!
//! Item and result metadata are free-form JSON maps; these constants pin
//! the key spellings shared between loaders, packs, and metrics.

pub const QUESTION_TYPE: &str = "questionType";
pub const CATEGORY: &str = "category";
pub const IS_ABSTENTION: &str = "isAbstention";

/// Explicit qrels channels, in resolution order.
pub const RELEVANT_IDS: &str = "relevantIds";
pub const RELEVANT_CHUNK_IDS: &str = "relevantChunkIds";
pub const GROUND_TRUTH_IDS: &str = "groundTruthIds";
pub const QRELS: &str = "qrels";

pub const GROUND_TRUTH: &str = "groundTruth";
pub const GOLD_SNIPPETS: &str = "goldSnippets";
pub const DEPENDENCY_FILES: &str = "dependencyFiles";
pub const MODIFIED_FILES: &str = "modifiedFiles";
pub const GROUND_TRUTH_FILES: &str = "groundTruthFiles";

pub const DIALOG_IDS: &str = "dialogIds";
pub const CORPUS_ID: &str = "corpusId";
pub const EVIDENCE_IDS: &str = "evidenceIds";

pub const TELEMETRY: &str = "telemetry";
pub const POLICY: &str = "policy";

/// Chunk-level location keys used by code-retrieval providers.
pub const FILEPATH: &str = "filepath";
pub const FILE: &str = "file";
pub const START_LINE: &str = "startLine";
pub const END_LINE: &str = "endLine";
