//! Standardized deviates from trimmed statistics.

use crate::data::OrthogroupTable;
use crate::error::Result;
use crate::normalize::trimmed::{trimmed_stats, validate_fraction, TrimmedStats};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Standardize every value against the trimmed statistics of the whole vector.
///
/// Returns the deviates and the statistics used. A zero trimmed standard
/// deviation yields all-zero deviates.
pub fn standardize(values: &[f64], fraction: f64) -> Result<(Vec<f64>, TrimmedStats)> {
    let stats = trimmed_stats(values, fraction)?;
    let z = values.iter().map(|&v| stats.deviate(v)).collect();
    Ok((z, stats))
}

/// Normalize each orthogroup across organisms.
///
/// Every row is centered and scaled by its own trimmed mean and standard
/// deviation; a row whose trimmed standard deviation is zero is scaled by 1
/// so that it keeps its centered values.
pub fn row_profile(table: &OrthogroupTable, fraction: f64) -> Result<DMatrix<f64>> {
    validate_fraction(fraction)?;
    let n_rows = table.n_orthogroups();
    let n_cols = table.n_organisms();

    let rows: Vec<Vec<f64>> = (0..n_rows)
        .into_par_iter()
        .map(|row| -> Result<Vec<f64>> {
            let values: Vec<f64> = table.row_dense(row).into_iter().map(|c| c as f64).collect();
            let stats = trimmed_stats(&values, fraction)?;
            let scale = if stats.is_degenerate() { 1.0 } else { stats.std_dev };
            Ok(values.iter().map(|v| (v - stats.mean) / scale).collect())
        })
        .collect::<Result<Vec<_>>>()?;

    let mut z = DMatrix::zeros(n_rows, n_cols);
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            z[(i, j)] = v;
        }
    }
    Ok(z)
}

/// Mean of a matrix row over the given columns.
pub fn row_mean_over(z: &DMatrix<f64>, row: usize, columns: &[usize]) -> f64 {
    if columns.is_empty() {
        return 0.0;
    }
    columns.iter().map(|&c| z[(row, c)]).sum::<f64>() / columns.len() as f64
}
