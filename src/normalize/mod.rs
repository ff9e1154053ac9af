//! Robust normalization of orthogroup counts.
//!
//! - **trimmed**: trimmed mean / standard deviation estimators
//! - **zscore**: standardized deviates, per vector or per orthogroup row

pub mod trimmed;
pub mod zscore;

pub use trimmed::{
    retained_count, trimmed_per_tail, trimmed_stats, validate_fraction,
    TrimmedStats, MAX_FRACTION,
};
pub use zscore::{row_mean_over, row_profile, standardize};
