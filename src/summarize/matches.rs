//! Signature matches extracted from InterProScan JSON results.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GO term attached to an InterPro entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GoTerm {
    pub id: String,
    pub category: String,
    pub description: String,
}

/// One signature match on a query sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Member database accession (e.g. PF00069).
    pub accession: String,
    /// Signature name, with its description appended when present.
    pub description: String,
    /// Query sequence identifier.
    pub query: String,
    /// Member database (PFAM, CDD, PROSITE_PATTERNS, ...).
    pub library: String,
    /// E-value of the first location; 0 for pattern matches.
    pub evalue: f64,
    /// Start and end on the query.
    pub query_pos: Option<(u64, u64)>,
    /// Start and end on the signature model.
    pub subject_pos: Option<(u64, u64)>,
    /// Model bounds, or the pattern level for PROSITE patterns.
    pub bounds: Option<String>,
    /// InterPro entry accession (IPRxxxxxx).
    pub interpro: Option<String>,
    pub go: Vec<GoTerm>,
}

fn text(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) if s != "None" && !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn position(loc: &Value, start: &str, end: &str) -> Option<(u64, u64)> {
    Some((loc.get(start)?.as_u64()?, loc.get(end)?.as_u64()?))
}

/// Parse every signature match in an InterProScan JSON document.
///
/// `default_query` names the query when the result carries no cross
/// reference. Unknown member databases are parsed like Pfam.
pub fn parse_matches(content: &str, default_query: &str) -> Result<Vec<Match>> {
    let doc: Value = serde_json::from_str(content)?;
    let mut all = Vec::new();

    let results = doc.get("results").and_then(Value::as_array).cloned().unwrap_or_default();
    for result in &results {
        let query = result
            .get("xref")
            .and_then(|x| x.get(0))
            .and_then(|x| text(x, "id"))
            .unwrap_or_else(|| default_query.to_string());

        let hits = result.get("matches").and_then(Value::as_array).cloned().unwrap_or_default();
        for hit in &hits {
            let Some(signature) = hit.get("signature") else {
                continue;
            };
            let Some(accession) = text(signature, "accession") else {
                continue;
            };
            let mut description = text(signature, "name").unwrap_or_else(|| accession.clone());
            if let Some(desc) = text(signature, "description") {
                description.push_str(" - ");
                description.push_str(&desc);
            }
            let library = signature
                .get("signatureLibraryRelease")
                .and_then(|r| text(r, "library"))
                .unwrap_or_else(|| "UNKNOWN".to_string());

            let null = Value::Null;
            let loc = hit
                .get("locations")
                .and_then(|l| l.get(0))
                .unwrap_or(&null);
            let location_evalue = loc
                .get("evalue")
                .and_then(Value::as_f64)
                .or_else(|| hit.get("evalue").and_then(Value::as_f64))
                .unwrap_or(1.0);

            let (evalue, subject_pos, bounds) = match library.as_str() {
                "PFAM" | "NCBIFAM" | "PIRSF" | "SMART" => (
                    location_evalue,
                    position(loc, "hmmStart", "hmmEnd"),
                    text(loc, "hmmBounds"),
                ),
                "CDD" => (location_evalue, None, None),
                "PROSITE_PATTERNS" => (0.0, None, text(loc, "level")),
                other => {
                    log::debug!("parsing {} match {} with the generic parser", other, accession);
                    (
                        location_evalue,
                        position(loc, "hmmStart", "hmmEnd"),
                        text(loc, "hmmBounds"),
                    )
                }
            };

            let entry = signature.get("entry").filter(|e| !e.is_null());
            let interpro = entry.and_then(|e| text(e, "accession"));
            let go = entry
                .and_then(|e| e.get("goXRefs"))
                .and_then(Value::as_array)
                .map(|terms| {
                    terms
                        .iter()
                        .filter_map(|g| {
                            Some(GoTerm {
                                id: text(g, "id")?,
                                category: text(g, "category").unwrap_or_default(),
                                description: text(g, "name").unwrap_or_default(),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            all.push(Match {
                accession,
                description,
                query: query.clone(),
                library,
                evalue,
                query_pos: position(loc, "start", "end"),
                subject_pos,
                bounds,
                interpro,
                go,
            });
        }
    }
    Ok(all)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"{
      "interproscan-version": "5.66-98.0",
      "results": [{
        "xref": [{"id": "jgi|Cap|100", "name": "jgi|Cap|100"}],
        "matches": [
          {
            "signature": {
              "accession": "PF00069", "name": "Pkinase", "description": "Protein kinase domain",
              "signatureLibraryRelease": {"library": "PFAM", "version": "36.0"},
              "entry": {"accession": "IPR000719", "name": "Prot_kinase_dom",
                        "goXRefs": [{"id": "GO:0004672", "category": "MOLECULAR_FUNCTION",
                                     "name": "protein kinase activity"}]}
            },
            "locations": [{"start": 10, "end": 250, "hmmStart": 1, "hmmEnd": 264,
                           "hmmBounds": "COMPLETE", "evalue": 1.2e-40}]
          },
          {
            "signature": {
              "accession": "cd00180", "name": "PKc", "description": null,
              "signatureLibraryRelease": {"library": "CDD", "version": "3.20"},
              "entry": null
            },
            "locations": [{"start": 12, "end": 240, "evalue": 3.0e-30}]
          },
          {
            "signature": {
              "accession": "PS00108", "name": "PROTEIN_KINASE_ST", "description": "None",
              "signatureLibraryRelease": {"library": "PROSITE_PATTERNS", "version": "2023_05"},
              "entry": null
            },
            "locations": [{"start": 130, "end": 142, "level": "STRONG"}]
          }
        ]
      }]
    }"#;

    #[test]
    fn test_parse_libraries() {
        let matches = parse_matches(SAMPLE, "fallback").unwrap();
        assert_eq!(matches.len(), 3);

        let pfam = &matches[0];
        assert_eq!(pfam.query, "jgi|Cap|100");
        assert_eq!(pfam.description, "Pkinase - Protein kinase domain");
        assert_eq!(pfam.evalue, 1.2e-40);
        assert_eq!(pfam.subject_pos, Some((1, 264)));
        assert_eq!(pfam.bounds.as_deref(), Some("COMPLETE"));
        assert_eq!(pfam.interpro.as_deref(), Some("IPR000719"));
        assert_eq!(pfam.go[0].id, "GO:0004672");

        let cdd = &matches[1];
        assert_eq!(cdd.description, "PKc");
        assert_eq!(cdd.subject_pos, None);
        assert_eq!(cdd.interpro, None);

        let prosite = &matches[2];
        assert_eq!(prosite.evalue, 0.0);
        assert_eq!(prosite.bounds.as_deref(), Some("STRONG"));
        assert_eq!(prosite.query_pos, Some((130, 142)));
    }

    #[test]
    fn test_missing_xref_uses_default_query() {
        let doc = r#"{"results": [{"matches": [{"signature": {"accession": "X1",
            "signatureLibraryRelease": {"library": "GENE3D"}}, "locations": [{"evalue": 0.5}]}]}]}"#;
        let matches = parse_matches(doc, "seq9").unwrap();
        assert_eq!(matches[0].query, "seq9");
        assert_eq!(matches[0].library, "GENE3D");
        assert_eq!(matches[0].evalue, 0.5);
    }

    #[test]
    fn test_not_json() {
        assert!(parse_matches("<html>busy</html>", "q").is_err());
    }
}
