//! Expanded / contracted orthogroup detection.
//!
//! Orthogroup counts are summed over the target and non-target organisms.
//! Each summed vector is standardized against its own trimmed mean and
//! standard deviation across all orthogroups, and the difference of the two
//! deviates ranks the orthogroups: large positive scores are expanded in the
//! target organisms, large negative scores contracted.

use crate::data::{GroupPartition, OrthogroupTable, DERIVED_COLUMNS};
use crate::detect::report::{
    DeviateRecord, MemberCount, OutlierReport, ReportEntry, ReportParameters, SourceOrganism,
};
use crate::error::{OrthoError, Result};
use crate::normalize::{retained_count, row_mean_over, row_profile, standardize, validate_fraction, TrimmedStats};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// How per-group deviates are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    /// Standardize the per-group count sums across orthogroups.
    #[default]
    GroupSum,
    /// Standardize each orthogroup across organisms, then average the
    /// organism deviates within each group.
    RowProfile,
}

impl ScoreMethod {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GroupSum => "group_sum",
            Self::RowProfile => "row_profile",
        }
    }
}

/// Parameters of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Number of orthogroups reported at each end of the ranking.
    pub ntop: usize,
    /// Total trim fraction for the robust statistics, in [0, 0.5).
    pub fraction: f64,
    /// Target organism names (identifiers or short labels).
    pub target: Vec<String>,
    #[serde(default)]
    pub method: ScoreMethod,
}

impl OutlierConfig {
    pub fn new(ntop: usize, fraction: f64, target: Vec<String>) -> Self {
        Self {
            ntop,
            fraction,
            target,
            method: ScoreMethod::default(),
        }
    }

    /// Set the scoring method.
    pub fn with_method(mut self, method: ScoreMethod) -> Self {
        self.method = method;
        self
    }
}

/// Everything computed by a detection run.
#[derive(Debug, Clone)]
pub struct OutlierResult {
    /// One record per orthogroup, in input order.
    pub records: Vec<DeviateRecord>,
    /// Record indices sorted by score descending, ties by identifier ascending.
    pub ranked: Vec<usize>,
    /// Trimmed statistics of the target sums (group-sum scoring).
    pub target_stats: Option<TrimmedStats>,
    /// Trimmed statistics of the non-target sums (group-sum scoring).
    pub non_target_stats: Option<TrimmedStats>,
    ntop: usize,
    fraction: f64,
    method: ScoreMethod,
    partition: GroupPartition,
    organism_ids: Vec<String>,
    organism_labels: Vec<String>,
    counts: Vec<Vec<u64>>,
    members: Vec<Vec<Vec<String>>>,
}

impl OutlierResult {
    /// Number of orthogroups scored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The `ntop` highest-scoring records, best first.
    pub fn expanded(&self) -> Vec<&DeviateRecord> {
        self.expanded_rows().into_iter().map(|i| &self.records[i]).collect()
    }

    /// The `ntop` lowest-scoring records, lowest first; ties by identifier ascending.
    ///
    /// The set is the tail of the descending ranking, so it never shares an
    /// orthogroup with [`OutlierResult::expanded`] while `2 * ntop <= len`.
    pub fn contracted(&self) -> Vec<&DeviateRecord> {
        self.contracted_rows().into_iter().map(|i| &self.records[i]).collect()
    }

    fn expanded_rows(&self) -> Vec<usize> {
        self.ranked.iter().take(self.ntop).copied().collect()
    }

    fn contracted_rows(&self) -> Vec<usize> {
        let start = self.ranked.len().saturating_sub(self.ntop);
        let mut tail = self.ranked[start..].to_vec();
        tail.sort_by(|&a, &b| compare_ascending(&self.records[a], &self.records[b]));
        tail
    }

    /// Look up a record by orthogroup identifier.
    pub fn get(&self, orthogroup: &str) -> Option<&DeviateRecord> {
        self.records.iter().find(|r| r.orthogroup == orthogroup)
    }

    /// Build the structured top/bottom report.
    pub fn report(&self) -> OutlierReport {
        let source_data = self
            .organism_ids
            .iter()
            .zip(&self.organism_labels)
            .enumerate()
            .map(|(col, (id, label))| SourceOrganism {
                label: label.clone(),
                id: id.clone(),
                target: self.partition.target().contains(&col),
            })
            .collect();

        OutlierReport {
            source_data,
            parameters: ReportParameters {
                ntop: self.ntop,
                fraction: self.fraction,
                method: self.method,
                n_orthogroups: self.records.len(),
            },
            target_stats: self.target_stats,
            non_target_stats: self.non_target_stats,
            expanded: self.expanded_rows().into_iter().map(|row| self.entry(row)).collect(),
            contracted: self.contracted_rows().into_iter().map(|row| self.entry(row)).collect(),
        }
    }

    fn entry(&self, row: usize) -> ReportEntry {
        let members = self.organism_labels
            .iter()
            .enumerate()
            .map(|(col, label)| MemberCount {
                organism: label.clone(),
                count: self.counts[row][col],
                sequences: self
                    .members
                    .get(row)
                    .map(|cells| cells[col].clone())
                    .unwrap_or_default(),
            })
            .collect();
        ReportEntry {
            record: self.records[row].clone(),
            members,
        }
    }

    /// Write every orthogroup: raw organism counts followed by the derived columns.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_tsv(BufWriter::new(file))
    }

    /// Write the normalized table to any writer. See [`OutlierResult::to_tsv`].
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);

        let mut header = vec!["Orthogroup".to_string()];
        header.extend(self.organism_ids.iter().cloned());
        header.extend(DERIVED_COLUMNS.iter().map(|s| s.to_string()));
        wtr.write_record(&header)?;

        for (row, r) in self.records.iter().enumerate() {
            let mut fields = Vec::with_capacity(header.len());
            fields.push(r.orthogroup.clone());
            fields.extend(self.counts[row].iter().map(|c| c.to_string()));
            fields.push(r.target_count.to_string());
            fields.push(r.non_target_count.to_string());
            fields.push(format!("{:.6}", r.target_z));
            fields.push(format!("{:.6}", r.non_target_z));
            fields.push(format!("{:.6}", r.score));
            wtr.write_record(&fields)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn compare_descending(a: &DeviateRecord, b: &DeviateRecord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.orthogroup.cmp(&b.orthogroup))
}

fn compare_ascending(a: &DeviateRecord, b: &DeviateRecord) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.orthogroup.cmp(&b.orthogroup))
}

/// Check the run parameters against the table before computing anything.
pub fn validate(table: &OrthogroupTable, config: &OutlierConfig) -> Result<GroupPartition> {
    let n = table.n_orthogroups();
    if config.ntop == 0 {
        return Err(OrthoError::InvalidArgument("ntop must be positive".to_string()));
    }
    if config.ntop > n {
        return Err(OrthoError::InvalidArgument(format!(
            "ntop ({}) exceeds the number of orthogroups ({})",
            config.ntop, n
        )));
    }
    validate_fraction(config.fraction)?;

    let partition = GroupPartition::from_names(table, &config.target)?;

    // the trimmed sample is the orthogroup vector (group sums) or an
    // organism row (row profile)
    let sample = match config.method {
        ScoreMethod::GroupSum => n,
        ScoreMethod::RowProfile => table.n_organisms(),
    };
    if retained_count(sample, config.fraction) == 0 {
        return Err(OrthoError::InvalidArgument(format!(
            "trim fraction {} removes all {} observations",
            config.fraction, sample
        )));
    }
    Ok(partition)
}

/// Rank orthogroups by expansion in the target organisms.
///
/// All parameters are validated before any statistic is computed.
///
/// # Errors
/// `InvalidArgument` for `ntop` outside `1..=n_orthogroups`, a fraction
/// outside [0, 0.5), or a target list that is empty, names an unknown
/// organism, or covers every organism.
pub fn detect_outliers(table: &OrthogroupTable, config: &OutlierConfig) -> Result<OutlierResult> {
    let partition = validate(table, config)?;
    detect_with_partition(table, config, partition)
}

/// Rank orthogroups for an already resolved partition.
pub fn detect_with_partition(
    table: &OrthogroupTable,
    config: &OutlierConfig,
    partition: GroupPartition,
) -> Result<OutlierResult> {
    log::info!(
        "Scoring {} orthogroups ({} target / {} non-target organisms, method {})",
        table.n_orthogroups(),
        partition.target().len(),
        partition.non_target().len(),
        config.method.name()
    );
    let target_sums = table.group_sums(partition.target())?;
    let non_target_sums = table.group_sums(partition.non_target())?;

    let (target_z, non_target_z, target_stats, non_target_stats) = match config.method {
        ScoreMethod::GroupSum => {
            let t: Vec<f64> = target_sums.iter().map(|&c| c as f64).collect();
            let nt: Vec<f64> = non_target_sums.iter().map(|&c| c as f64).collect();
            let (tz, ts) = standardize(&t, config.fraction)?;
            let (ntz, nts) = standardize(&nt, config.fraction)?;
            if ts.is_degenerate() {
                log::warn!("Target counts have zero trimmed standard deviation, target deviates set to 0");
            }
            if nts.is_degenerate() {
                log::warn!(
                    "Non-target counts have zero trimmed standard deviation, non-target deviates set to 0"
                );
            }
            (tz, ntz, Some(ts), Some(nts))
        }
        ScoreMethod::RowProfile => {
            let z = row_profile(table, config.fraction)?;
            let tz = (0..table.n_orthogroups())
                .map(|row| row_mean_over(&z, row, partition.target()))
                .collect();
            let ntz = (0..table.n_orthogroups())
                .map(|row| row_mean_over(&z, row, partition.non_target()))
                .collect();
            (tz, ntz, None, None)
        }
    };

    let records: Vec<DeviateRecord> = table
        .orthogroup_ids()
        .iter()
        .enumerate()
        .map(|(row, id)| DeviateRecord {
            orthogroup: id.clone(),
            target_count: target_sums[row],
            non_target_count: non_target_sums[row],
            target_z: target_z[row],
            non_target_z: non_target_z[row],
            score: target_z[row] - non_target_z[row],
        })
        .collect();

    let mut ranked: Vec<usize> = (0..records.len()).collect();
    ranked.sort_by(|&a, &b| compare_descending(&records[a], &records[b]));

    let counts = (0..table.n_orthogroups()).map(|row| table.row_dense(row)).collect();
    let members = if table.has_members() {
        (0..table.n_orthogroups())
            .map(|row| {
                (0..table.n_organisms())
                    .map(|col| table.members(row, col).to_vec())
                    .collect()
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(OutlierResult {
        records,
        ranked,
        target_stats,
        non_target_stats,
        ntop: config.ntop,
        fraction: config.fraction,
        method: config.method,
        partition,
        organism_ids: table.organism_ids().to_vec(),
        organism_labels: table.organism_labels(),
        counts,
        members,
    })
}
