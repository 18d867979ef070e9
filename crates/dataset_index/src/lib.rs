//! Indexing and auditing of captured datasets.
//!
//! - Locate every label of every run under a captures root
//! - Summarize alignment, missing files, empty labels and orphan images per run
//! - Grade a summary against thresholds

pub mod capture;
pub mod types;
pub mod validation;

pub use capture::{find_runs, index_runs, load_label, summarize_root, summarize_runs};
pub use types::*;
pub use validation::{summarize_root_with_thresholds, summarize_with_thresholds, validate_summary};
