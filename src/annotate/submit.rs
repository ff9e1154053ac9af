//! Batch submission of orthogroup sequences with cached per-sequence results.

use crate::annotate::service::AnnotationService;
use crate::data::{OrthogroupTable, SequenceIndex};
use crate::detect::OutlierReport;
use crate::error::{OrthoError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome recorded for one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    Finished,
    Failed,
}

/// Cached result of annotating one sequence of an orthogroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub orthogroup: String,
    pub sequence_id: String,
    pub status: AnnotationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Error description for failed submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Raw service response for finished submissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl AnnotationRecord {
    /// Write the record as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a record written by [`AnnotationRecord::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let unreadable = |reason: String| OrthoError::UnreadableResult {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(unreadable("file is empty".to_string()));
        }
        serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))
    }
}

/// Sequences of one orthogroup to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrthogroupMembers {
    pub orthogroup: String,
    pub sequence_ids: Vec<String>,
}

/// Options for a submission run.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Do not resubmit sequences whose result file already exists.
    pub skip_existing: bool,
}

/// Counts from a submission run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSummary {
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Member identifiers with no sequence in the FASTA input.
    pub missing: Vec<String>,
}

impl std::fmt::Display for SubmitSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Submitted: {}", self.submitted)?;
        writeln!(f, "Skipped (cached): {}", self.skipped)?;
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Missing sequences: {}", self.missing.len())?;
        Ok(())
    }
}

/// Replace characters that are unsafe in file names.
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') { c } else { '_' })
        .collect()
}

/// Result file for one sequence: `<dir>/<orthogroup>_<sequence>.json`.
pub fn result_path(out_dir: &Path, orthogroup: &str, sequence_id: &str) -> PathBuf {
    out_dir.join(format!("{}_{}.json", sanitize_id(orthogroup), sanitize_id(sequence_id)))
}

/// Read a list of orthogroup identifiers, one per line; blank lines and
/// lines starting with `#` are skipped.
pub fn read_orthogroup_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut ids = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        ids.push(line.to_string());
    }
    Ok(ids)
}

/// Member sequences of the selected orthogroups of an OrthoFinder table.
pub fn members_from_table(table: &OrthogroupTable, ids: &[String]) -> Result<Vec<OrthogroupMembers>> {
    if !table.has_members() {
        return Err(OrthoError::InvalidArgument(
            "orthogroup table has no member sequences".to_string(),
        ));
    }
    ids.iter()
        .map(|id| {
            let row = table.find_orthogroup(id).ok_or_else(|| {
                OrthoError::InvalidArgument(format!("orthogroup '{}' not in table", id))
            })?;
            let sequence_ids = (0..table.n_organisms())
                .flat_map(|col| table.members(row, col).iter().cloned())
                .collect();
            Ok(OrthogroupMembers {
                orthogroup: id.clone(),
                sequence_ids,
            })
        })
        .collect()
}

/// Member sequences of the expanded and contracted orthogroups of a report.
pub fn members_from_report(report: &OutlierReport) -> Vec<OrthogroupMembers> {
    report
        .expanded
        .iter()
        .chain(&report.contracted)
        .map(|entry| OrthogroupMembers {
            orthogroup: entry.record.orthogroup.clone(),
            sequence_ids: entry.sequences().map(|(_, id)| id.to_string()).collect(),
        })
        .collect()
}

/// Submit every member sequence of one orthogroup and cache each response.
///
/// A failed call is persisted as a [`AnnotationStatus::Failed`] record and
/// counted; it does not stop the run. Only local I/O errors are returned.
pub fn submit_orthogroup<S: AnnotationService + ?Sized>(
    service: &S,
    group: &OrthogroupMembers,
    index: &SequenceIndex,
    out_dir: &Path,
    options: &SubmitOptions,
    summary: &mut SubmitSummary,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;
    for sequence_id in &group.sequence_ids {
        let path = result_path(out_dir, &group.orthogroup, sequence_id);
        if options.skip_existing && path.exists() {
            log::debug!("{} already processed, skipping", path.display());
            summary.skipped += 1;
            continue;
        }
        let Some(sequence) = index.get(sequence_id) else {
            log::warn!("{}: no sequence for {}", group.orthogroup, sequence_id);
            summary.missing.push(sequence_id.clone());
            continue;
        };

        let record = match service.annotate(sequence_id, sequence) {
            Ok(submission) => {
                summary.submitted += 1;
                AnnotationRecord {
                    orthogroup: group.orthogroup.clone(),
                    sequence_id: sequence_id.clone(),
                    status: AnnotationStatus::Finished,
                    job_id: submission.job_id,
                    message: None,
                    content: Some(submission.content),
                }
            }
            Err(e) => {
                log::warn!("{} annotation of {} failed: {}", service.name(), sequence_id, e);
                summary.failed += 1;
                AnnotationRecord {
                    orthogroup: group.orthogroup.clone(),
                    sequence_id: sequence_id.clone(),
                    status: AnnotationStatus::Failed,
                    job_id: None,
                    message: Some(e.to_string()),
                    content: None,
                }
            }
        };
        record.save(&path)?;
    }
    Ok(())
}

/// Submit all orthogroups in order.
pub fn submit_all<S: AnnotationService + ?Sized>(
    service: &S,
    groups: &[OrthogroupMembers],
    index: &SequenceIndex,
    out_dir: &Path,
    options: &SubmitOptions,
) -> Result<SubmitSummary> {
    let mut summary = SubmitSummary::default();
    for (i, group) in groups.iter().enumerate() {
        log::info!(
            "[{}/{}] {}: {} sequences",
            i + 1,
            groups.len(),
            group.orthogroup,
            group.sequence_ids.len()
        );
        submit_orthogroup(service, group, index, out_dir, options, &mut summary)?;
    }
    Ok(summary)
}
