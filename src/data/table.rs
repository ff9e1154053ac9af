//! Orthogroup-by-organism count table with sparse storage.

use crate::error::{OrthoError, Result};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Trailing derived columns of a normalized dump; raw organism columns
/// precede them.
pub const DERIVED_COLUMNS: [&str; 5] = [
    "target_count",
    "non_target_count",
    "target_z",
    "non_target_z",
    "score",
];

/// Layout of the cells in an orthogroup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// Every cell is a non-negative integer count.
    #[default]
    Counts,
    /// Every cell is a comma separated list of member sequence identifiers
    /// (OrthoFinder `Orthogroups.tsv`); the count is the list length.
    Members,
}

/// Orthogroup counts across organisms.
///
/// Rows are orthogroups, columns are organisms (proteome files). Counts are
/// stored in CSR format; most orthogroups are absent from most organisms.
/// When loaded from an OrthoFinder table the member sequence identifiers of
/// every cell are kept as well.
#[derive(Debug, Clone)]
pub struct OrthogroupTable {
    /// Sparse matrix in CSR format (orthogroups × organisms)
    data: CsMat<u64>,
    /// Orthogroup identifiers (row names)
    orthogroup_ids: Vec<String>,
    /// Organism identifiers (column names)
    organism_ids: Vec<String>,
    /// Member sequences, `members[row][col]`; empty for count tables
    members: Vec<Vec<Vec<String>>>,
}

impl OrthogroupTable {
    /// Create a new table from a sparse matrix and identifiers.
    pub fn new(
        data: CsMat<u64>,
        orthogroup_ids: Vec<String>,
        organism_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != orthogroup_ids.len() {
            return Err(OrthoError::InputFormat(format!(
                "{} orthogroup identifiers for {} rows",
                orthogroup_ids.len(),
                nrows
            )));
        }
        if ncols != organism_ids.len() {
            return Err(OrthoError::InputFormat(format!(
                "{} organism identifiers for {} columns",
                organism_ids.len(),
                ncols
            )));
        }
        Ok(Self {
            data,
            orthogroup_ids,
            organism_ids,
            members: Vec::new(),
        })
    }

    /// Build a table from dense rows of counts. Short rows are padded with zeros.
    pub fn from_rows(
        orthogroup_ids: Vec<String>,
        organism_ids: Vec<String>,
        rows: &[Vec<u64>],
    ) -> Result<Self> {
        let mut tri_mat = TriMat::new((rows.len(), organism_ids.len()));
        for (row, counts) in rows.iter().enumerate() {
            if counts.len() > organism_ids.len() {
                return Err(OrthoError::InputFormat(format!(
                    "row {} has {} counts but only {} organisms",
                    row,
                    counts.len(),
                    organism_ids.len()
                )));
            }
            for (col, &value) in counts.iter().enumerate() {
                if value > 0 {
                    tri_mat.add_triplet(row, col, value);
                }
            }
        }
        Self::new(tri_mat.to_csr(), orthogroup_ids, organism_ids)
    }

    /// Load a table from a tab-delimited file.
    ///
    /// Expected layout:
    /// - First row: header, first field names the orthogroup column, the rest
    ///   are organism identifiers
    /// - Subsequent rows: orthogroup identifier followed by one cell per organism;
    ///   missing trailing cells count as zero
    pub fn from_tsv<P: AsRef<Path>>(path: P, format: TableFormat) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), format)
    }

    /// Load a table from any buffered reader. See [`OrthogroupTable::from_tsv`].
    pub fn from_reader<R: BufRead>(reader: R, format: TableFormat) -> Result<Self> {
        parse_table(reader, format, false)
    }

    /// Reload the raw counts from a normalized dump written by
    /// [`crate::detect::OutlierResult::to_tsv`]. The trailing derived columns
    /// are ignored.
    pub fn from_normalized_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        parse_table(BufReader::new(file), TableFormat::Counts, true)
    }

    /// Write the counts as a tab-delimited table.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "Orthogroup")?;
        for organism in &self.organism_ids {
            write!(writer, "\t{}", organism)?;
        }
        writeln!(writer)?;

        for (row, orthogroup) in self.orthogroup_ids.iter().enumerate() {
            write!(writer, "{}", orthogroup)?;
            for col in 0..self.n_organisms() {
                write!(writer, "\t{}", self.get(row, col))?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Get the count at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data.get(row, col).copied().unwrap_or(0)
    }

    /// Number of orthogroups (rows).
    #[inline]
    pub fn n_orthogroups(&self) -> usize {
        self.data.rows()
    }

    /// Number of organisms (columns).
    #[inline]
    pub fn n_organisms(&self) -> usize {
        self.data.cols()
    }

    /// Orthogroup identifiers.
    #[inline]
    pub fn orthogroup_ids(&self) -> &[String] {
        &self.orthogroup_ids
    }

    /// Organism identifiers, in column order.
    #[inline]
    pub fn organism_ids(&self) -> &[String] {
        &self.organism_ids
    }

    /// Short organism labels: each identifier up to its first underscore.
    pub fn organism_labels(&self) -> Vec<String> {
        self.organism_ids.iter().map(|id| short_label(id).to_string()).collect()
    }

    /// Whether member sequence identifiers were loaded.
    pub fn has_members(&self) -> bool {
        !self.members.is_empty()
    }

    /// Member sequences of one cell; empty when the table holds counts only.
    pub fn members(&self, row: usize, col: usize) -> &[String] {
        self.members
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dense counts for one orthogroup.
    pub fn row_dense(&self, row: usize) -> Vec<u64> {
        let mut dense = vec![0u64; self.n_organisms()];
        if let Some(row_vec) = self.data.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Per-orthogroup sum of counts over the given organism columns.
    ///
    /// # Errors
    /// `InputFormat` when a sum does not fit in a `u64`.
    pub fn group_sums(&self, columns: &[usize]) -> Result<Vec<u64>> {
        let wanted: HashSet<usize> = columns.iter().copied().collect();
        (0..self.n_orthogroups())
            .into_par_iter()
            .map(|row| -> Result<u64> {
                let Some(v) = self.data.outer_view(row) else {
                    return Ok(0);
                };
                v.iter()
                    .filter(|(col, _)| wanted.contains(col))
                    .try_fold(0u64, |acc, (_, &val)| acc.checked_add(val))
                    .ok_or_else(|| {
                        OrthoError::InputFormat(format!(
                            "counts of orthogroup '{}' overflow when summed",
                            self.orthogroup_ids[row]
                        ))
                    })
            })
            .collect()
    }

    /// Resolve an organism name to its column.
    ///
    /// An exact identifier match wins; otherwise the name must match exactly
    /// one short label.
    pub fn find_organism(&self, name: &str) -> Result<usize> {
        if let Some(col) = self.organism_ids.iter().position(|id| id == name) {
            return Ok(col);
        }
        let matches: Vec<usize> = self
            .organism_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| short_label(id) == name)
            .map(|(col, _)| col)
            .collect();
        match matches.as_slice() {
            [col] => Ok(*col),
            [] => Err(OrthoError::UnknownOrganism(name.to_string())),
            _ => Err(OrthoError::InvalidArgument(format!(
                "organism '{}' matches {} columns",
                name,
                matches.len()
            ))),
        }
    }

    /// Row index of an orthogroup identifier.
    pub fn find_orthogroup(&self, id: &str) -> Option<usize> {
        self.orthogroup_ids.iter().position(|og| og == id)
    }
}

/// Organism identifier up to its first underscore.
pub fn short_label(id: &str) -> &str {
    id.split('_').next().unwrap_or(id)
}

/// Split an OrthoFinder cell into sequence identifiers.
fn split_members(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_table<R: BufRead>(
    reader: R,
    format: TableFormat,
    normalized: bool,
) -> Result<OrthogroupTable> {
    let mut lines = reader.lines();

    let header_line = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => return Err(OrthoError::InputFormat("empty orthogroup table".to_string())),
        }
    };
    let header: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
    let mut organism_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
    if normalized {
        let n = organism_ids.len();
        if n < DERIVED_COLUMNS.len() || organism_ids[n - DERIVED_COLUMNS.len()..] != DERIVED_COLUMNS {
            return Err(OrthoError::InputFormat(format!(
                "normalized table must end with the columns {}",
                DERIVED_COLUMNS.join(", ")
            )));
        }
        organism_ids.truncate(n - DERIVED_COLUMNS.len());
    }
    if organism_ids.is_empty() {
        return Err(OrthoError::InputFormat(
            "header must name at least one organism column".to_string(),
        ));
    }
    if organism_ids.iter().any(String::is_empty) {
        return Err(OrthoError::InputFormat(
            "header contains an empty organism identifier".to_string(),
        ));
    }
    let mut columns: HashSet<&str> = HashSet::new();
    if let Some(dup) = organism_ids.iter().find(|id| !columns.insert(id.as_str())) {
        return Err(OrthoError::InputFormat(format!(
            "duplicate organism identifier '{}' in header",
            dup
        )));
    }
    let n_organisms = organism_ids.len();
    let n_header = header.len() - 1;

    let mut triplets: Vec<(usize, usize, u64)> = Vec::new();
    let mut orthogroup_ids: Vec<String> = Vec::new();
    let mut members: Vec<Vec<Vec<String>>> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for line_result in lines {
        let line = line_result?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let row_idx = orthogroup_ids.len();
        let fields: Vec<&str> = line.split('\t').collect();
        let orthogroup = fields[0].trim().to_string();
        if orthogroup.is_empty() {
            return Err(OrthoError::InputFormat(format!(
                "row {} has an empty orthogroup identifier",
                row_idx
            )));
        }
        if !seen.insert(orthogroup.clone()) {
            return Err(OrthoError::InputFormat(format!(
                "duplicate orthogroup identifier '{}'",
                orthogroup
            )));
        }
        if fields.len() - 1 > n_header {
            return Err(OrthoError::InputFormat(format!(
                "orthogroup '{}' has {} cells but the header has {} organisms",
                orthogroup,
                fields.len() - 1,
                n_header
            )));
        }

        let mut row_members = if format == TableFormat::Members {
            vec![Vec::new(); n_organisms]
        } else {
            Vec::new()
        };
        for (col_idx, cell) in fields[1..].iter().take(n_organisms).enumerate() {
            let value = match format {
                TableFormat::Counts => {
                    let cell = cell.trim();
                    if cell.is_empty() {
                        0
                    } else {
                        cell.parse::<u64>().map_err(|_| OrthoError::InvalidCount {
                            value: cell.to_string(),
                            row: row_idx,
                            col: col_idx,
                        })?
                    }
                }
                TableFormat::Members => {
                    let seqs = split_members(cell);
                    let n = seqs.len() as u64;
                    row_members[col_idx] = seqs;
                    n
                }
            };
            if value > 0 {
                triplets.push((row_idx, col_idx, value));
            }
        }

        orthogroup_ids.push(orthogroup);
        if format == TableFormat::Members {
            members.push(row_members);
        }
    }

    let n_orthogroups = orthogroup_ids.len();
    if n_orthogroups == 0 {
        return Err(OrthoError::InputFormat("no orthogroups in table".to_string()));
    }

    let mut tri_mat = TriMat::new((n_orthogroups, n_organisms));
    for (row, col, val) in triplets {
        tri_mat.add_triplet(row, col, val);
    }

    let mut table = OrthogroupTable::new(tri_mat.to_csr(), orthogroup_ids, organism_ids)?;
    table.members = members;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn create_test_table() -> OrthogroupTable {
        // 3 orthogroups × 4 organisms
        OrthogroupTable::from_rows(
            vec!["OG1".into(), "OG2".into(), "OG3".into()],
            vec!["Aurpu_v1.aa".into(), "Cap_1.aa".into(), "Hor_w.aa".into(), "Neu_c.aa".into()],
            &[vec![10, 10, 1, 1], vec![1, 1, 10, 10], vec![5, 5, 5, 5]],
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions() {
        let table = create_test_table();
        assert_eq!(table.n_orthogroups(), 3);
        assert_eq!(table.n_organisms(), 4);
        assert!(!table.has_members());
    }

    #[test]
    fn test_group_sums() {
        let table = create_test_table();
        assert_eq!(table.group_sums(&[0, 1]).unwrap(), vec![20, 2, 10]);
        assert_eq!(table.group_sums(&[2, 3]).unwrap(), vec![2, 20, 10]);
    }

    #[test]
    fn test_group_sum_overflow_rejected() {
        let big = 1u64 << 63;
        let table = OrthogroupTable::from_rows(
            vec!["OG1".into()],
            vec!["A".into(), "B".into(), "C".into()],
            &[vec![big, big, 1]],
        )
        .unwrap();
        let err = table.group_sums(&[0, 1]).unwrap_err();
        assert!(err.is_input_format());
        assert_eq!(table.group_sums(&[0, 2]).unwrap(), vec![big + 1]);
    }

    #[test]
    fn test_duplicate_organism_rejected() {
        let text = "Orthogroup\tA\tA\tB\nOG1\t1\t2\t3\n";
        let err = OrthogroupTable::from_reader(Cursor::new(text), TableFormat::Counts).unwrap_err();
        assert!(err.is_input_format());
    }

    #[test]
    fn test_normalized_reload_keeps_organism_named_like_derived_column() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "Orthogroup\tA\ttarget_count\tB\ttarget_count\tnon_target_count\ttarget_z\tnon_target_z\tscore\n\
             OG1\t1\t2\t3\t4\t3\t0.5\t-0.5\t1.0\n",
        )
        .unwrap();
        let table = OrthogroupTable::from_normalized_tsv(temp_file.path()).unwrap();
        assert_eq!(table.organism_ids(), &["A", "target_count", "B"]);
        assert_eq!(table.row_dense(0), vec![1, 2, 3]);

        let plain = NamedTempFile::new().unwrap();
        std::fs::write(plain.path(), "Orthogroup\tA\tB\nOG1\t1\t2\n").unwrap();
        assert!(OrthogroupTable::from_normalized_tsv(plain.path()).unwrap_err().is_input_format());
    }

    #[test]
    fn test_parse_counts_missing_cells_are_zero() {
        let text = "Orthogroup\tA\tB\tC\nOG1\t3\t4\nOG2\t\t1\t2\n";
        let table = OrthogroupTable::from_reader(Cursor::new(text), TableFormat::Counts).unwrap();
        assert_eq!(table.row_dense(0), vec![3, 4, 0]);
        assert_eq!(table.row_dense(1), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_members() {
        let text = "Orthogroup\tAurpu_var.aa\tCap6580_1.aa\n\
                    OG0000000\tjgi|A|1, jgi|A|2\tjgi|C|9\n\
                    OG0000001\t\tjgi|C|3\n\
                    OG0000002\tjgi|A|7\n";
        let table = OrthogroupTable::from_reader(Cursor::new(text), TableFormat::Members).unwrap();
        assert!(table.has_members());
        assert_eq!(table.row_dense(0), vec![2, 1]);
        assert_eq!(table.row_dense(1), vec![0, 1]);
        assert_eq!(table.row_dense(2), vec![1, 0]);
        assert_eq!(table.members(0, 0), &["jgi|A|1", "jgi|A|2"]);
        assert!(table.members(2, 1).is_empty());
        assert_eq!(table.organism_labels(), vec!["Aurpu", "Cap6580"]);
    }

    #[test]
    fn test_non_numeric_count_rejected() {
        let text = "Orthogroup\tA\tB\nOG1\t3\tx\n";
        let err = OrthogroupTable::from_reader(Cursor::new(text), TableFormat::Counts).unwrap_err();
        assert!(err.is_input_format());
    }

    #[test]
    fn test_empty_and_headerless_rejected() {
        let err = OrthogroupTable::from_reader(Cursor::new(""), TableFormat::Counts).unwrap_err();
        assert!(err.is_input_format());

        let err =
            OrthogroupTable::from_reader(Cursor::new("Orthogroup\n"), TableFormat::Counts).unwrap_err();
        assert!(err.is_input_format());

        let err = OrthogroupTable::from_reader(Cursor::new("Orthogroup\tA\tB\n"), TableFormat::Counts)
            .unwrap_err();
        assert!(err.is_input_format());
    }

    #[test]
    fn test_extra_cells_rejected() {
        let text = "Orthogroup\tA\nOG1\t1\t2\n";
        let err = OrthogroupTable::from_reader(Cursor::new(text), TableFormat::Counts).unwrap_err();
        assert!(err.is_input_format());
    }

    #[test]
    fn test_find_organism() {
        let table = create_test_table();
        assert_eq!(table.find_organism("Cap_1.aa").unwrap(), 1);
        assert_eq!(table.find_organism("Hor").unwrap(), 2);
        assert!(table.find_organism("Xyz").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_tsv_roundtrip() {
        let table = create_test_table();

        let temp_file = NamedTempFile::new().unwrap();
        table.to_tsv(temp_file.path()).unwrap();

        let loaded = OrthogroupTable::from_tsv(temp_file.path(), TableFormat::Counts).unwrap();
        assert_eq!(loaded.orthogroup_ids(), table.orthogroup_ids());
        assert_eq!(loaded.organism_ids(), table.organism_ids());
        for row in 0..table.n_orthogroups() {
            assert_eq!(loaded.row_dense(row), table.row_dense(row));
        }
    }
}
