//! apo-similarity
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Stage 12 (§4.6): detects near-duplicate content across jobs sharing a
//! `batch_id`, combining a character-shingle Jaccard score with an optional
//! cosine embedding score into a hybrid similarity used for a non-blocking
//! alert.

mod batch;
mod checker;
mod stage;

pub use batch::{BatchEntry, BatchMemory, BatchMemoryRegistry, DEFAULT_CAPACITY};
pub use checker::{SimilarityChecker, CHAR_WEIGHT, DUPLICATE_THRESHOLD, SEM_WEIGHT, SHINGLE_SIZE};
pub use stage::SimilarityStage;
