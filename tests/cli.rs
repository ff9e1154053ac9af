//! Exit status and output contract of the `orthoscan outliers` command.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_table(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("counts.tsv");
    std::fs::write(&path, body).unwrap();
    path
}

fn counts_table(dir: &Path) -> PathBuf {
    write_table(
        dir,
        "Orthogroup\tT1_genome\tT2_genome\tN1_genome\tN2_genome\n\
         OG1\t10\t10\t1\t1\n\
         OG2\t1\t1\t10\t10\n\
         OG3\t5\t5\t5\t5\n",
    )
}

fn run_outliers(table: &Path, target: &str, dir: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_orthoscan"))
        .arg("outliers")
        .arg("-g")
        .arg(table)
        .args(["-n", "1", "-f", "0", "-t", target])
        .arg("-j")
        .arg(dir.path().join("out.json"))
        .arg("-v")
        .arg(dir.path().join("out.tsv"))
        .output()
        .unwrap()
}

#[test]
fn test_success_writes_both_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let table = counts_table(dir.path());

    let output = run_outliers(&table, "T1,T2", &dir);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("out.json").exists());
    assert!(dir.path().join("out.tsv").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("most expanded"));
    assert!(stdout.contains("OG1"));
}

#[test]
fn test_unknown_target_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let table = counts_table(dir.path());

    let output = run_outliers(&table, "T1,Nope", &dir);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("Nope"));
    assert!(!dir.path().join("out.json").exists());
    assert!(!dir.path().join("out.tsv").exists());
}

#[test]
fn test_non_numeric_cell_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_table(dir.path(), "Orthogroup\tT1_a\tN1_a\nOG1\t3\tmany\nOG2\t1\t2\n");

    let output = run_outliers(&table, "T1", &dir);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("many"));
    assert!(!dir.path().join("out.json").exists());
    assert!(!dir.path().join("out.tsv").exists());
}
