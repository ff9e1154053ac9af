//! YAML run configuration for the outlier detector.

use crate::data::{OrthogroupTable, TableFormat};
use crate::detect::{detect_outliers, OutlierConfig, OutlierResult, ScoreMethod};
use crate::error::{OrthoError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inputs, parameters and destinations of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Orthogroup table.
    pub orthogroup: PathBuf,
    #[serde(default)]
    pub format: TableFormat,
    pub ntop: usize,
    pub fraction: f64,
    /// Target organism names.
    pub target: Vec<String>,
    #[serde(default)]
    pub method: ScoreMethod,
    /// Destination of the structured report.
    pub json: PathBuf,
    /// Destination of the full normalized table.
    pub tsv: PathBuf,
}

impl RunConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(OrthoError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(OrthoError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Detection parameters.
    pub fn outlier_config(&self) -> OutlierConfig {
        OutlierConfig::new(self.ntop, self.fraction, self.target.clone()).with_method(self.method)
    }

    /// A template configuration.
    pub fn example() -> Self {
        Self {
            orthogroup: PathBuf::from("Orthogroups.tsv"),
            format: TableFormat::Members,
            ntop: 20,
            fraction: 0.25,
            target: vec!["Aurpu".to_string(), "Cap6580".to_string()],
            method: ScoreMethod::GroupSum,
            json: PathBuf::from("outliers.json"),
            tsv: PathBuf::from("outliers.normalized.tsv"),
        }
    }
}

/// Load the table, detect outliers, then write both artifacts.
///
/// Nothing is written unless loading, validation and scoring all succeed.
pub fn run(config: &RunConfig) -> Result<OutlierResult> {
    let table = OrthogroupTable::from_tsv(&config.orthogroup, config.format)?;
    log::info!(
        "Loaded {} orthogroups x {} organisms from {}",
        table.n_orthogroups(),
        table.n_organisms(),
        config.orthogroup.display()
    );

    let result = detect_outliers(&table, &config.outlier_config())?;
    write_outputs(&result, &config.json, &config.tsv)?;
    Ok(result)
}

/// Render both artifacts in memory, write them next to their destinations,
/// and move them into place only once both writes succeeded. Existing files
/// at the destinations are left alone on failure.
pub fn write_outputs(result: &OutlierResult, json: &Path, tsv: &Path) -> Result<()> {
    let mut report = result.report().to_json_string()?;
    report.push('\n');
    let mut table = Vec::new();
    result.write_tsv(&mut table)?;

    let json_tmp = staging_path(json);
    let tsv_tmp = staging_path(tsv);
    let staged = std::fs::write(&json_tmp, report).and_then(|_| std::fs::write(&tsv_tmp, table));
    if let Err(e) = staged {
        let _ = std::fs::remove_file(&json_tmp);
        let _ = std::fs::remove_file(&tsv_tmp);
        return Err(e.into());
    }

    log::info!("Writing report to {}", json.display());
    log::info!("Writing normalized table to {}", tsv.display());
    std::fs::rename(&json_tmp, json)
        .and_then(|_| std::fs::rename(&tsv_tmp, tsv))
        .map_err(|e| {
            let _ = std::fs::remove_file(&json_tmp);
            let _ = std::fs::remove_file(&tsv_tmp);
            OrthoError::from(e)
        })
}

/// Hidden sibling of `path` used while an output is being written.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_roundtrip() {
        let config = RunConfig::example();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("format: members"));
        assert_eq!(RunConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_defaults() {
        let yaml = "orthogroup: og.tsv\nntop: 5\nfraction: 0.1\ntarget: [A]\njson: r.json\ntsv: r.tsv\n";
        let config = RunConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.format, TableFormat::Counts);
        assert_eq!(config.method, ScoreMethod::GroupSum);
    }

    #[test]
    fn test_failed_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("og.tsv");
        std::fs::write(&table, "Orthogroup\tA\tB\nOG1\t1\t2\nOG2\t3\t4\n").unwrap();
        let config = RunConfig {
            orthogroup: table,
            format: TableFormat::Counts,
            ntop: 1,
            fraction: 0.0,
            target: vec!["Missing".into()],
            method: ScoreMethod::GroupSum,
            json: dir.path().join("r.json"),
            tsv: dir.path().join("r.tsv"),
        };
        assert!(run(&config).unwrap_err().is_invalid_argument());
        assert!(!config.json.exists());
        assert!(!config.tsv.exists());
    }

    #[test]
    fn test_failed_write_keeps_existing_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("og.tsv");
        std::fs::write(&table, "Orthogroup\tA\tB\nOG1\t1\t2\nOG2\t3\t4\n").unwrap();
        let json = dir.path().join("r.json");
        std::fs::write(&json, "previous report").unwrap();

        let config = RunConfig {
            orthogroup: table,
            format: TableFormat::Counts,
            ntop: 1,
            fraction: 0.0,
            target: vec!["A".into()],
            method: ScoreMethod::GroupSum,
            json: json.clone(),
            tsv: dir.path().join("missing").join("r.tsv"),
        };
        assert!(run(&config).is_err());
        assert_eq!(std::fs::read_to_string(&json).unwrap(), "previous report");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let config = RunConfig {
            tsv: dir.path().join("r.tsv"),
            ..config
        };
        run(&config).unwrap();
        assert!(std::fs::read_to_string(&json).unwrap().contains("\"expanded\""));
        assert!(config.tsv.exists());
    }
}
