//! Data structures for orthogroup analysis.

pub mod fasta;
mod partition;
mod table;

pub use fasta::{parse_fasta, read_fasta, write_fasta, FastaRecord, SequenceIndex};
pub use partition::{parse_target_list, GroupPartition};
pub use table::{short_label, OrthogroupTable, TableFormat, DERIVED_COLUMNS};
