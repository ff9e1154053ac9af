//! Orthogroup expansion/contraction analysis.
//!
//! Finds gene families (orthogroups) that are unusually large or small in a
//! set of target organisms compared with the remaining organisms, and helps
//! follow them up with protein domain annotation.
//!
//! # Overview
//!
//! - **data**: Orthogroup tables, target partitions, FASTA sequences
//! - **normalize**: Trimmed mean / standard deviation and standardized deviates
//! - **detect**: Ranking of expanded and contracted orthogroups, reports
//! - **config**: YAML run configuration
//! - **extract**: Per-orthogroup FASTA files for reported outliers
//! - **annotate**: Submission of member sequences to InterProScan
//! - **summarize**: Aggregation of cached annotation results
//! - **mapping**: Correspondence between orthogroups of two clustering runs
//!
//! # Example
//!
//! ```no_run
//! use orthoscan::prelude::*;
//!
//! let table = OrthogroupTable::from_tsv("Orthogroups.tsv", TableFormat::Members).unwrap();
//! let config = OutlierConfig::new(20, 0.25, vec!["Aurpu".into(), "Cap6580".into()]);
//! let result = detect_outliers(&table, &config).unwrap();
//!
//! result.report().to_json("outliers.json").unwrap();
//! result.to_tsv("outliers.normalized.tsv").unwrap();
//! ```

pub mod annotate;
pub mod config;
pub mod data;
pub mod detect;
pub mod error;
pub mod extract;
pub mod mapping;
pub mod normalize;
pub mod summarize;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::annotate::{
        members_from_report, members_from_table, submit_all, AnnotationRecord, AnnotationService,
        AnnotationStatus, InterProClient, OrthogroupMembers, SubmitOptions, SubmitSummary,
    };
    pub use crate::config::RunConfig;
    pub use crate::data::{
        parse_target_list, FastaRecord, GroupPartition, OrthogroupTable, SequenceIndex, TableFormat,
    };
    pub use crate::detect::{
        detect_outliers, DeviateRecord, OutlierConfig, OutlierReport, OutlierResult, ReportEntry,
        ScoreMethod,
    };
    pub use crate::error::{OrthoError, Result};
    pub use crate::extract::{write_outlier_fasta, ExtractSummary};
    pub use crate::mapping::{map_orthogroups, OrthogroupMapping};
    pub use crate::normalize::{trimmed_stats, TrimmedStats};
    pub use crate::summarize::{summarize_pattern, OrthogroupSummary};
}
