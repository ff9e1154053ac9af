//! Protein FASTA reading and writing.

use crate::error::{OrthoError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Residues per line when writing.
const LINE_WIDTH: usize = 60;

/// A FASTA record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Identifier: header text after '>' up to the first whitespace.
    pub id: String,
    /// Rest of the header line, if any.
    pub description: String,
    /// Concatenated sequence lines.
    pub seq: String,
}

/// Read every record of a FASTA file.
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>> {
    let file = File::open(path.as_ref())?;
    parse_fasta(BufReader::new(file))
}

/// Parse FASTA records from a buffered reader.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current: Option<FastaRecord> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('>') {
            if let Some(done) = current.take() {
                records.push(done);
            }
            let header = header.trim();
            let (id, description) = match header.split_once(char::is_whitespace) {
                Some((id, rest)) => (id.to_string(), rest.trim().to_string()),
                None => (header.to_string(), String::new()),
            };
            if id.is_empty() {
                return Err(OrthoError::InputFormat(format!(
                    "empty FASTA identifier at line {}",
                    line_no + 1
                )));
            }
            current = Some(FastaRecord {
                id,
                description,
                seq: String::new(),
            });
        } else {
            match current.as_mut() {
                Some(rec) => rec.seq.extend(line.chars().filter(|c| !c.is_whitespace())),
                None => {
                    return Err(OrthoError::InputFormat(format!(
                        "sequence data before first FASTA header at line {}",
                        line_no + 1
                    )))
                }
            }
        }
    }
    if let Some(done) = current {
        records.push(done);
    }
    Ok(records)
}

/// Sequences indexed by identifier, loaded from one or more FASTA files.
#[derive(Debug, Clone, Default)]
pub struct SequenceIndex {
    sequences: HashMap<String, String>,
}

impl SequenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every record of a FASTA file; later files override duplicates.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let records = read_fasta(path.as_ref())?;
        let n = records.len();
        self.extend(records);
        log::debug!("{} sequences read from {}", n, path.as_ref().display());
        Ok(n)
    }

    /// Load every FASTA file in `paths`; directories are scanned one level
    /// deep for `.fa`, `.faa`, `.fasta` and `.aa` files.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut index = Self::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                let mut files: Vec<_> = std::fs::read_dir(path)?
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| {
                        p.extension()
                            .and_then(|e| e.to_str())
                            .map(|e| matches!(e, "fa" | "faa" | "fasta" | "aa"))
                            .unwrap_or(false)
                    })
                    .collect();
                files.sort();
                for file in files {
                    index.add_file(file)?;
                }
            } else {
                index.add_file(path)?;
            }
        }
        Ok(index)
    }

    pub fn extend<I: IntoIterator<Item = FastaRecord>>(&mut self, records: I) {
        for rec in records {
            self.sequences.insert(rec.id, rec.seq);
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.sequences.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Write one record, wrapping the sequence.
pub fn write_record<W: Write>(writer: &mut W, id: &str, seq: &str) -> Result<()> {
    writeln!(writer, ">{}", id)?;
    let bytes = seq.as_bytes();
    for chunk in bytes.chunks(LINE_WIDTH) {
        writer.write_all(chunk)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Write records to a new FASTA file.
pub fn write_fasta<'a, P, I>(path: P, records: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut n = 0;
    for (id, seq) in records {
        write_record(&mut writer, id, seq)?;
        n += 1;
    }
    writer.flush()?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_parse_multiline() {
        let text = ">jgi|A|1 some protein\nMKV\nLLA\n\n>jgi|A|2\nMSTP\n";
        let records = parse_fasta(Cursor::new(text)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "jgi|A|1");
        assert_eq!(records[0].description, "some protein");
        assert_eq!(records[0].seq, "MKVLLA");
        assert_eq!(records[1].seq, "MSTP");
    }

    #[test]
    fn test_sequence_before_header() {
        let err = parse_fasta(Cursor::new("MKV\n>a\nM\n")).unwrap_err();
        assert!(err.is_input_format());
    }

    #[test]
    fn test_index_from_directory() {
        let dir = tempdir().unwrap();
        let seq = "M".repeat(130);
        write_fasta(dir.path().join("a.faa"), [("s1", seq.as_str())]).unwrap();
        write_fasta(dir.path().join("b.fa"), [("s2", "MKL")]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), ">s3\nAAA\n").unwrap();

        let index = SequenceIndex::from_paths(&[dir.path()]).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("s1"), Some(seq.as_str()));
        assert!(index.get("s3").is_none());

        let text = std::fs::read_to_string(dir.path().join("a.faa")).unwrap();
        assert_eq!(text.lines().count(), 4);
    }
}
