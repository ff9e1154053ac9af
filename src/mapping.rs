//! Mapping orthogroups between two clustering runs.
//!
//! Every member sequence of the old run is indexed to its orthogroup; each
//! new orthogroup is then described by how its members distribute over the
//! old orthogroups.

use crate::data::OrthogroupTable;
use crate::error::{OrthoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default share of members the best old orthogroup must hold.
pub const DEFAULT_WARN_THRESHOLD: f64 = 0.90;

/// Label used for members absent from the old run.
pub const UNKNOWN: &str = "unknown";

/// Where the members of one new orthogroup came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthogroupMapping {
    pub orthogroup: String,
    /// Member sequences in the new orthogroup.
    pub total: usize,
    /// (old orthogroup or `unknown`, members), largest first, ties by name.
    pub sources: Vec<(String, usize)>,
}

impl OrthogroupMapping {
    /// Fraction of members contributed by the largest source.
    pub fn best_fraction(&self) -> f64 {
        match self.sources.first() {
            Some((_, n)) if self.total > 0 => *n as f64 / self.total as f64,
            _ => 0.0,
        }
    }
}

/// Map every orthogroup of `new` onto the orthogroups of `old`.
pub fn map_orthogroups(old: &OrthogroupTable, new: &OrthogroupTable) -> Result<Vec<OrthogroupMapping>> {
    if !old.has_members() || !new.has_members() {
        return Err(OrthoError::InvalidArgument(
            "orthogroup mapping needs member tables from both runs".to_string(),
        ));
    }

    let mut index: HashMap<&str, &str> = HashMap::new();
    for (row, og) in old.orthogroup_ids().iter().enumerate() {
        for col in 0..old.n_organisms() {
            for seq in old.members(row, col) {
                index.insert(seq.as_str(), og.as_str());
            }
        }
    }
    log::info!("{} sequences indexed from {} old orthogroups", index.len(), old.n_orthogroups());

    let mappings = new
        .orthogroup_ids()
        .iter()
        .enumerate()
        .map(|(row, og)| {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            let mut total = 0;
            for col in 0..new.n_organisms() {
                for seq in new.members(row, col) {
                    total += 1;
                    let source = index.get(seq.as_str()).copied().unwrap_or(UNKNOWN);
                    *counts.entry(source).or_default() += 1;
                }
            }
            let mut sources: Vec<(String, usize)> =
                counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            OrthogroupMapping {
                orthogroup: og.clone(),
                total,
                sources,
            }
        })
        .collect();
    Ok(mappings)
}

/// Mappings whose best source holds less than `threshold` of the members.
pub fn mapping_warnings(mappings: &[OrthogroupMapping], threshold: f64) -> Vec<&OrthogroupMapping> {
    mappings
        .iter()
        .filter(|m| m.total > 0 && m.best_fraction() < threshold)
        .collect()
}

/// One output line: `new_og:count<TAB>old_og:count(pct%)...`.
pub fn format_mapping(mapping: &OrthogroupMapping) -> String {
    let mut line = format!("{}:{}", mapping.orthogroup, mapping.total);
    for (source, n) in &mapping.sources {
        let pct = *n as f64 / mapping.total as f64 * 100.0;
        line.push_str(&format!("\t{}:{}({:.1}%)", source, n, pct));
    }
    line
}

/// Write all mappings with a header line.
pub fn write_mappings<P: AsRef<Path>>(mappings: &[OrthogroupMapping], path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "new_og:count\told_og:count(pct) ...")?;
    for mapping in mappings {
        writeln!(writer, "{}", format_mapping(mapping))?;
    }
    writer.flush()?;
    Ok(())
}
