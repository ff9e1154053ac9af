//! Expansion / contraction detection and its reports.

pub mod outliers;
pub mod report;

pub use outliers::{detect_outliers, detect_with_partition, validate, OutlierConfig, OutlierResult, ScoreMethod};
pub use report::{DeviateRecord, MemberCount, OutlierReport, ReportEntry, ReportParameters, SourceOrganism};
