//! Per-orthogroup FASTA files for reported outliers.

use crate::data::{write_fasta, SequenceIndex};
use crate::detect::{OutlierReport, ReportEntry};
use crate::error::{OrthoError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Counts from one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractSummary {
    /// FASTA files written.
    pub files: Vec<PathBuf>,
    /// Sequences written across all files.
    pub n_sequences: usize,
    /// Member identifiers not found in the sequence index.
    pub missing: Vec<String>,
}

/// Output file name for an orthogroup: `<prefix>_e<OG>.fa` for expanded,
/// `<prefix>_r<OG>.fa` for contracted.
pub fn outlier_file_name(prefix: &str, expanded: bool, orthogroup: &str) -> String {
    let tag = if expanded { 'e' } else { 'r' };
    format!("{}_{}{}.fa", prefix, tag, orthogroup)
}

/// Write the member sequences of the reported orthogroups.
///
/// `limit` caps the number of orthogroups taken from each list. Members
/// missing from `index` are logged and listed in the summary.
pub fn write_outlier_fasta(
    report: &OutlierReport,
    index: &SequenceIndex,
    out_dir: &Path,
    prefix: &str,
    limit: Option<usize>,
) -> Result<ExtractSummary> {
    let has_sequences = report
        .expanded
        .iter()
        .chain(&report.contracted)
        .any(|e| e.members.iter().any(|m| !m.sequences.is_empty()));
    if !has_sequences {
        return Err(OrthoError::InvalidArgument(
            "report carries no member sequences; rerun outliers on an OrthoFinder members table"
                .to_string(),
        ));
    }

    std::fs::create_dir_all(out_dir)?;
    let mut summary = ExtractSummary::default();
    let n = limit.unwrap_or(usize::MAX);

    for (expanded, entries) in [(true, &report.expanded), (false, &report.contracted)] {
        for entry in entries.iter().take(n) {
            let path = out_dir.join(outlier_file_name(prefix, expanded, &entry.record.orthogroup));
            let written = write_entry(entry, index, &path, &mut summary.missing)?;
            log::info!("{} sequences written to {}", written, path.display());
            summary.n_sequences += written;
            summary.files.push(path);
        }
    }

    if !summary.missing.is_empty() {
        log::warn!("{} member sequences not found in the FASTA input", summary.missing.len());
    }
    Ok(summary)
}

fn write_entry(
    entry: &ReportEntry,
    index: &SequenceIndex,
    path: &Path,
    missing: &mut Vec<String>,
) -> Result<usize> {
    let mut records = Vec::new();
    for (_, id) in entry.sequences() {
        match index.get(id) {
            Some(seq) => records.push((id, seq)),
            None => {
                log::debug!("{}: sequence {} not found", entry.record.orthogroup, id);
                missing.push(id.to_string());
            }
        }
    }
    write_fasta(path, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FastaRecord, OrthogroupTable, TableFormat};
    use crate::detect::{detect_outliers, OutlierConfig};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn report() -> OutlierReport {
        let text = "Orthogroup\tA_x\tB_x\n\
                    OG0\ta1, a2\tb1\n\
                    OG1\ta3\tb2, b3, b4\n\
                    OG2\ta4\tb5\n";
        let table = OrthogroupTable::from_reader(Cursor::new(text), TableFormat::Members).unwrap();
        detect_outliers(&table, &OutlierConfig::new(1, 0.0, vec!["A".into()]))
            .unwrap()
            .report()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(outlier_file_name("cold", true, "OG0000568"), "cold_eOG0000568.fa");
        assert_eq!(outlier_file_name("cold", false, "OG1"), "cold_rOG1.fa");
    }

    #[test]
    fn test_write_outlier_fasta() {
        let mut index = SequenceIndex::new();
        index.extend(["a1", "a2", "a3", "b1", "b2", "b3"].iter().map(|id| FastaRecord {
            id: id.to_string(),
            description: String::new(),
            seq: "MKV".to_string(),
        }));

        let dir = tempdir().unwrap();
        let summary = write_outlier_fasta(&report(), &index, dir.path(), "out", None).unwrap();
        assert_eq!(summary.files.len(), 2);
        assert!(dir.path().join("out_eOG0.fa").exists());
        assert!(dir.path().join("out_rOG1.fa").exists());
        assert_eq!(summary.n_sequences, 3 + 3);
        assert_eq!(summary.missing, vec!["b4".to_string()]);
    }

    #[test]
    fn test_counts_only_report_rejected() {
        let table = OrthogroupTable::from_rows(
            vec!["OG0".into(), "OG1".into()],
            vec!["A".into(), "B".into()],
            &[vec![1, 2], vec![2, 1]],
        )
        .unwrap();
        let report = detect_outliers(&table, &OutlierConfig::new(1, 0.0, vec!["A".into()]))
            .unwrap()
            .report();
        let dir = tempdir().unwrap();
        let err = write_outlier_fasta(&report, &SequenceIndex::new(), dir.path(), "x", None).unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
