//! Per-orthogroup aggregation of cached annotation results.

use crate::annotate::{AnnotationRecord, AnnotationStatus};
use crate::error::{OrthoError, Result};
use crate::summarize::matches::{parse_matches, GoTerm, Match};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Result files belonging to one orthogroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultGroup {
    pub orthogroup: String,
    pub files: Vec<PathBuf>,
}

/// Expand a glob pattern into result files grouped by orthogroup.
///
/// The orthogroup is the one recorded in each result file; for unreadable
/// files it falls back to the file name up to its first underscore. Groups
/// keep the order in which their first file was matched.
pub fn expand_input(pattern: &str) -> Result<Vec<ResultGroup>> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for entry in glob::glob(pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("cannot read {}: {}", e.path().display(), e.error());
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let orthogroup = match AnnotationRecord::load(&path) {
            Ok(record) => record.orthogroup,
            Err(_) => name.split('_').next().unwrap_or(name).to_string(),
        };
        match position.get(&orthogroup) {
            Some(&i) => groups[i].files.push(path),
            None => {
                position.insert(orthogroup.clone(), groups.len());
                groups.push(ResultGroup {
                    orthogroup,
                    files: vec![path],
                });
            }
        }
    }
    Ok(groups)
}

/// Score distribution of one annotated feature across an orthogroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub accession: String,
    pub description: String,
    pub library: String,
    pub interpro: Option<String>,
    /// Number of matches.
    pub hits: usize,
    /// Number of distinct sequences matched.
    pub sequences: usize,
    /// Smallest e-value.
    pub low: f64,
    /// Largest e-value.
    pub high: f64,
    /// Geometric mean of the positive e-values; 0 when none is positive.
    pub mean: f64,
}

/// How often a GO term occurs across an orthogroup's matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoSummary {
    pub term: GoTerm,
    /// Number of distinct sequences carrying the term.
    pub sequences: usize,
}

/// A result file left out of the aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipNotice {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one orthogroup's annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthogroupSummary {
    pub orthogroup: String,
    /// Result files considered.
    pub n_files: usize,
    /// Distinct sequences with at least one match.
    pub n_annotated: usize,
    pub n_matches: usize,
    pub features: Vec<FeatureSummary>,
    pub go_terms: Vec<GoSummary>,
    pub skipped: Vec<SkipNotice>,
}

/// Group matches by feature accession and summarize their scores.
///
/// Features are ordered by hit count descending, then accession.
pub fn summarize_matches(matches: &[Match]) -> (Vec<FeatureSummary>, Vec<GoSummary>) {
    struct Acc<'a> {
        first: &'a Match,
        hits: usize,
        queries: BTreeSet<&'a str>,
        low: f64,
        high: f64,
        log_sum: f64,
        n_positive: usize,
    }

    let mut by_accession: BTreeMap<&str, Acc> = BTreeMap::new();
    let mut go: BTreeMap<&GoTerm, BTreeSet<&str>> = BTreeMap::new();

    for m in matches {
        let acc = by_accession.entry(m.accession.as_str()).or_insert_with(|| Acc {
            first: m,
            hits: 0,
            queries: BTreeSet::new(),
            low: f64::INFINITY,
            high: f64::NEG_INFINITY,
            log_sum: 0.0,
            n_positive: 0,
        });
        acc.hits += 1;
        acc.queries.insert(m.query.as_str());
        acc.low = acc.low.min(m.evalue);
        acc.high = acc.high.max(m.evalue);
        if m.evalue > 0.0 {
            acc.log_sum += m.evalue.ln();
            acc.n_positive += 1;
        }
        for term in &m.go {
            go.entry(term).or_default().insert(m.query.as_str());
        }
    }

    let mut features: Vec<FeatureSummary> = by_accession
        .into_iter()
        .map(|(accession, acc)| FeatureSummary {
            accession: accession.to_string(),
            description: acc.first.description.clone(),
            library: acc.first.library.clone(),
            interpro: acc.first.interpro.clone(),
            hits: acc.hits,
            sequences: acc.queries.len(),
            low: acc.low,
            high: acc.high,
            mean: if acc.n_positive > 0 {
                (acc.log_sum / acc.n_positive as f64).exp()
            } else {
                0.0
            },
        })
        .collect();
    features.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.accession.cmp(&b.accession)));

    let mut go_terms: Vec<GoSummary> = go
        .into_iter()
        .map(|(term, queries)| GoSummary {
            term: term.clone(),
            sequences: queries.len(),
        })
        .collect();
    go_terms.sort_by(|a, b| b.sequences.cmp(&a.sequences).then_with(|| a.term.cmp(&b.term)));

    (features, go_terms)
}

/// Load the matches of one cached result file.
///
/// Empty, corrupt, failed, or unparsable files yield `UnreadableResult`.
pub fn load_matches(path: &Path) -> Result<Vec<Match>> {
    let record = AnnotationRecord::load(path)?;
    let unreadable = |reason: String| OrthoError::UnreadableResult {
        path: path.display().to_string(),
        reason,
    };
    if record.status == AnnotationStatus::Failed {
        return Err(unreadable(format!(
            "annotation failed: {}",
            record.message.unwrap_or_default()
        )));
    }
    let content = record
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| unreadable("no result content".to_string()))?;
    parse_matches(&content, &record.sequence_id).map_err(|e| unreadable(e.to_string()))
}

/// Summarize one orthogroup, skipping unreadable result files.
pub fn summarize_group(group: &ResultGroup) -> OrthogroupSummary {
    let mut matches = Vec::new();
    let mut skipped = Vec::new();

    for path in &group.files {
        match load_matches(path) {
            Ok(found) => matches.extend(found),
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                let reason = match e {
                    OrthoError::UnreadableResult { reason, .. } => reason,
                    other => other.to_string(),
                };
                skipped.push(SkipNotice {
                    path: path.clone(),
                    reason,
                });
            }
        }
    }

    let n_annotated = matches.iter().map(|m| m.query.as_str()).collect::<BTreeSet<_>>().len();
    let (features, go_terms) = summarize_matches(&matches);
    OrthogroupSummary {
        orthogroup: group.orthogroup.clone(),
        n_files: group.files.len(),
        n_annotated,
        n_matches: matches.len(),
        features,
        go_terms,
        skipped,
    }
}

/// Summarize every orthogroup matched by `pattern`.
pub fn summarize_pattern(pattern: &str) -> Result<Vec<OrthogroupSummary>> {
    let groups = expand_input(pattern)?;
    log::info!("{} orthogroups matched by {}", groups.len(), pattern);
    Ok(groups.iter().map(summarize_group).collect())
}

/// Write the text summaries to a file.
pub fn write_summaries<P: AsRef<Path>>(summaries: &[OrthogroupSummary], path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for summary in summaries {
        write!(writer, "{}", summary)?;
    }
    writer.flush()?;
    Ok(())
}

impl std::fmt::Display for OrthogroupSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Orthogroup: {}", self.orthogroup)?;
        writeln!(f, "\tResult files: {}", self.n_files)?;
        writeln!(f, "\tAnnotated sequences: {}", self.n_annotated)?;
        writeln!(f, "\tMatches: {}", self.n_matches)?;
        for skip in &self.skipped {
            writeln!(f, "\tskipped {}: {}", skip.path.display(), skip.reason)?;
        }
        for feat in &self.features {
            writeln!(f)?;
            writeln!(f, "\tFeature: {}: {}", feat.accession, feat.description)?;
            if let Some(ipr) = &feat.interpro {
                writeln!(f, "\tInterPro:\t{}", ipr)?;
            }
            writeln!(f, "\tLibrary:\t{}", feat.library)?;
            writeln!(f, "\tNumber of hits:\t{} ({} sequences)", feat.hits, feat.sequences)?;
            writeln!(f, "\tLow score:\t{:.2e}", feat.low)?;
            writeln!(f, "\tHigh score:\t{:.2e}", feat.high)?;
            writeln!(f, "\tMean score:\t{:.2e}", feat.mean)?;
        }
        if !self.go_terms.is_empty() {
            writeln!(f)?;
            writeln!(f, "\tGO terms:")?;
            for go in &self.go_terms {
                writeln!(
                    f,
                    "\t{}\t{}\t{}\t{}",
                    go.term.id, go.term.category, go.sequences, go.term.description
                )?;
            }
        }
        writeln!(f)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::result_path;
    use crate::summarize::matches::tests::SAMPLE;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn m(accession: &str, query: &str, evalue: f64) -> Match {
        Match {
            accession: accession.to_string(),
            description: format!("{} domain", accession),
            query: query.to_string(),
            library: "PFAM".to_string(),
            evalue,
            query_pos: None,
            subject_pos: None,
            bounds: None,
            interpro: None,
            go: vec![],
        }
    }

    #[test]
    fn test_summarize_matches() {
        let matches = vec![
            m("PF1", "s1", 1e-10),
            m("PF1", "s2", 1e-20),
            m("PF1", "s2", 1e-30),
            m("PF2", "s1", 0.0),
        ];
        let (features, _) = summarize_matches(&matches);
        assert_eq!(features.len(), 2);

        let pf1 = &features[0];
        assert_eq!(pf1.accession, "PF1");
        assert_eq!(pf1.hits, 3);
        assert_eq!(pf1.sequences, 2);
        assert_eq!(pf1.low, 1e-30);
        assert_eq!(pf1.high, 1e-10);
        assert_relative_eq!(pf1.mean, 1e-20, max_relative = 1e-9);

        let pf2 = &features[1];
        assert_eq!(pf2.mean, 0.0);
    }

    fn save(dir: &Path, name: &str, record: &AnnotationRecord) -> PathBuf {
        let path = dir.join(name);
        record.save(&path).unwrap();
        path
    }

    #[test]
    fn test_groups_by_recorded_orthogroup() {
        let dir = tempdir().unwrap();
        for (og, seq) in [("HOG_1", "a"), ("HOG_2", "b"), ("HOG_1", "c")] {
            let record = AnnotationRecord {
                orthogroup: og.into(),
                sequence_id: seq.into(),
                status: AnnotationStatus::Finished,
                job_id: None,
                message: None,
                content: Some(SAMPLE.to_string()),
            };
            record.save(result_path(dir.path(), og, seq)).unwrap();
        }
        std::fs::write(dir.path().join("OG7_x.json"), "").unwrap();

        let pattern = format!("{}/*.json", dir.path().display());
        let groups = expand_input(&pattern).unwrap();
        let found: Vec<(&str, usize)> = groups.iter().map(|g| (g.orthogroup.as_str(), g.files.len())).collect();
        assert_eq!(found, vec![("HOG_1", 2), ("HOG_2", 1), ("OG7", 1)]);
    }

    #[test]
    fn test_group_tolerates_bad_files() {
        let dir = tempdir().unwrap();
        save(
            dir.path(),
            "OG0000001_s1.json",
            &AnnotationRecord {
                orthogroup: "OG0000001".into(),
                sequence_id: "s1".into(),
                status: AnnotationStatus::Finished,
                job_id: Some("j1".into()),
                message: None,
                content: Some(SAMPLE.to_string()),
            },
        );
        save(
            dir.path(),
            "OG0000001_s2.json",
            &AnnotationRecord {
                orthogroup: "OG0000001".into(),
                sequence_id: "s2".into(),
                status: AnnotationStatus::Failed,
                job_id: None,
                message: Some("timeout".into()),
                content: None,
            },
        );
        std::fs::write(dir.path().join("OG0000001_s3.json"), "").unwrap();
        std::fs::write(dir.path().join("OG0000002_s4.json"), "not json").unwrap();

        let pattern = format!("{}/*.json", dir.path().display());
        let summaries = summarize_pattern(&pattern).unwrap();
        assert_eq!(summaries.len(), 2);

        let og1 = &summaries[0];
        assert_eq!(og1.orthogroup, "OG0000001");
        assert_eq!(og1.n_files, 3);
        assert_eq!(og1.skipped.len(), 2);
        assert_eq!(og1.n_matches, 3);
        assert_eq!(og1.n_annotated, 1);
        assert_eq!(og1.go_terms.len(), 1);

        let og2 = &summaries[1];
        assert_eq!(og2.skipped.len(), 1);
        assert!(og2.features.is_empty());

        let out = dir.path().join("summary.txt");
        write_summaries(&summaries, &out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("Feature: PF00069: Pkinase - Protein kinase domain"));
        assert!(text.contains("skipped"));
    }
}
