//! Target / non-target partition of organism columns.

use crate::data::OrthogroupTable;
use crate::error::{OrthoError, Result};

/// Two disjoint, non-empty sets of organism columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPartition {
    target: Vec<usize>,
    non_target: Vec<usize>,
}

impl GroupPartition {
    /// Partition the table's organisms: the named organisms form the target
    /// group, every remaining column the non-target group.
    ///
    /// Names are resolved with [`OrthogroupTable::find_organism`]. Duplicate
    /// names collapse to one column.
    pub fn from_names<S: AsRef<str>>(table: &OrthogroupTable, names: &[S]) -> Result<Self> {
        let mut target = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let col = table.find_organism(name)?;
            if !target.contains(&col) {
                target.push(col);
            }
        }
        target.sort_unstable();
        Self::from_columns(table.n_organisms(), target)
    }

    /// Partition from explicit target column indices.
    pub fn from_columns(n_organisms: usize, mut target: Vec<usize>) -> Result<Self> {
        target.sort_unstable();
        target.dedup();
        if target.is_empty() {
            return Err(OrthoError::InvalidArgument(
                "target group is empty".to_string(),
            ));
        }
        if let Some(&col) = target.iter().find(|&&c| c >= n_organisms) {
            return Err(OrthoError::InvalidArgument(format!(
                "target column {} out of bounds",
                col
            )));
        }
        let non_target: Vec<usize> = (0..n_organisms).filter(|c| !target.contains(c)).collect();
        if non_target.is_empty() {
            return Err(OrthoError::InvalidArgument(
                "target group contains every organism, no non-target group remains".to_string(),
            ));
        }
        Ok(Self { target, non_target })
    }

    /// Target organism columns, ascending.
    pub fn target(&self) -> &[usize] {
        &self.target
    }

    /// Non-target organism columns, ascending.
    pub fn non_target(&self) -> &[usize] {
        &self.non_target
    }

    /// The same partition with the roles exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            target: self.non_target.clone(),
            non_target: self.target.clone(),
        }
    }
}

/// Split a comma-delimited target list.
pub fn parse_target_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
