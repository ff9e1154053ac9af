//! Aggregation of cached annotation results by orthogroup.

pub mod aggregate;
pub mod matches;

pub use aggregate::{
    expand_input, load_matches, summarize_group, summarize_matches, summarize_pattern,
    write_summaries, FeatureSummary, GoSummary, OrthogroupSummary, ResultGroup, SkipNotice,
};
pub use matches::{parse_matches, GoTerm, Match};
