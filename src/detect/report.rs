//! Ranked expansion/contraction report.

use crate::detect::ScoreMethod;
use crate::error::Result;
use crate::normalize::TrimmedStats;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Deviates and combined score for one orthogroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviateRecord {
    /// Orthogroup identifier.
    pub orthogroup: String,
    /// Summed count over the target organisms.
    pub target_count: u64,
    /// Summed count over the non-target organisms.
    pub non_target_count: u64,
    /// Standardized deviate of the target group.
    pub target_z: f64,
    /// Standardized deviate of the non-target group.
    pub non_target_z: f64,
    /// Ranking score, `target_z - non_target_z`.
    pub score: f64,
}

/// Count (and, when known, member sequences) of one organism in an orthogroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCount {
    /// Short organism label.
    pub organism: String,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequences: Vec<String>,
}

/// A reported orthogroup with its per-organism breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub record: DeviateRecord,
    pub members: Vec<MemberCount>,
}

impl ReportEntry {
    /// All member sequences, grouped by organism label.
    pub fn sequences(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.members
            .iter()
            .flat_map(|m| m.sequences.iter().map(move |s| (m.organism.as_str(), s.as_str())))
    }
}

/// Organism column of the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOrganism {
    /// Short label (identifier up to the first underscore).
    pub label: String,
    /// Full column identifier, usually the proteome file name.
    pub id: String,
    /// Whether the organism is in the target group.
    pub target: bool,
}

/// Run parameters echoed into the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportParameters {
    pub ntop: usize,
    pub fraction: f64,
    pub method: ScoreMethod,
    pub n_orthogroups: usize,
}

/// Structured report: the top and bottom ranked orthogroups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub source_data: Vec<SourceOrganism>,
    pub parameters: ReportParameters,
    /// Trimmed statistics of the target count vector (group-sum scoring only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_stats: Option<TrimmedStats>,
    /// Trimmed statistics of the non-target count vector (group-sum scoring only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_target_stats: Option<TrimmedStats>,
    /// Highest scores first.
    pub expanded: Vec<ReportEntry>,
    /// Lowest scores first.
    pub contracted: Vec<ReportEntry>,
}

impl OutlierReport {
    /// Serialize as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as JSON.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a report written by [`OutlierReport::to_json`].
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Target organism labels.
    pub fn target_labels(&self) -> Vec<&str> {
        self.source_data
            .iter()
            .filter(|o| o.target)
            .map(|o| o.label.as_str())
            .collect()
    }
}

impl std::fmt::Display for OutlierReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Source Data:")?;
        for organism in &self.source_data {
            let mark = if organism.target { "*" } else { " " };
            writeln!(f, "{} {}\t{}", mark, organism.label, organism.id)?;
        }

        let targets = self.target_labels().join(",");
        writeln!(f)?;
        writeln!(
            f,
            "Method {}, trim fraction {}, {} orthogroups",
            self.parameters.method.name(),
            self.parameters.fraction,
            self.parameters.n_orthogroups
        )?;
        writeln!(f)?;
        writeln!(f, "{} most expanded in {}", self.expanded.len(), targets)?;
        for entry in &self.expanded {
            write_entry(f, entry)?;
        }
        writeln!(f)?;
        writeln!(f, "{} most contracted in {}", self.contracted.len(), targets)?;
        for entry in &self.contracted {
            write_entry(f, entry)?;
        }
        Ok(())
    }
}

fn write_entry(f: &mut std::fmt::Formatter<'_>, entry: &ReportEntry) -> std::fmt::Result {
    let r = &entry.record;
    writeln!(f)?;
    writeln!(
        f,
        "Orthogroup {}\tscore {:.3}\ttarget {} (z {:.3})\tnon-target {} (z {:.3})",
        r.orthogroup, r.score, r.target_count, r.target_z, r.non_target_count, r.non_target_z
    )?;
    for m in &entry.members {
        if m.sequences.is_empty() {
            writeln!(f, "\t{}: {}", m.organism, m.count)?;
        } else {
            writeln!(f, "\t{}: {}\t{}", m.organism, m.count, m.sequences.join(", "))?;
        }
    }
    Ok(())
}
