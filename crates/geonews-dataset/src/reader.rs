//! Source dataset loading
//!
//! Reads the news CSV into [`SourceRecord`]s. The file is decoded with the
//! first configured encoding that succeeds and its delimiter is sniffed
//! from a leading sample. Records are numbered from 1 in file order.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use geonews_core::{SourceRecord, UNKNOWN_OUTLET};

use crate::encoding::{decode_first, TextEncoding};
use crate::{DatasetError, Result};

/// Characters inspected when sniffing the delimiter
const SNIFF_SAMPLE_CHARS: usize = 1024;

/// Candidate delimiters in tie-break order
const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Header names accepted for the outlet column
const OUTLET_COLUMNS: [&str; 2] = ["medio", "outlet"];

/// Header names accepted for the text column
const TEXT_COLUMNS: [&str; 2] = ["texto", "text"];

/// A decoded source dataset
#[derive(Debug, Clone)]
pub struct SourceDataset {
    pub path: PathBuf,
    pub encoding: TextEncoding,
    pub delimiter: u8,
    pub headers: Vec<String>,
    pub records: Vec<SourceRecord>,
}

impl SourceDataset {
    /// Load a dataset, trying `encodings` in order
    pub fn load(path: impl AsRef<Path>, encodings: &[TextEncoding]) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|e| DatasetError::io(path, e))?;
        let (content, encoding) = decode_first(path, &bytes, encodings)?;
        debug!(path = %path.display(), %encoding, "Decoded source dataset");

        let mut dataset = Self::parse(&content)?;
        dataset.path = path.to_path_buf();
        dataset.encoding = encoding;

        info!(
            path = %path.display(),
            %encoding,
            delimiter = %(dataset.delimiter as char).escape_default(),
            records = dataset.records.len(),
            "Loaded source dataset"
        );
        Ok(dataset)
    }

    /// Load with encoding names as they appear in configuration
    pub fn load_with_names(path: impl AsRef<Path>, encodings: &[String]) -> Result<Self> {
        let encodings = encodings
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<TextEncoding>>>()?;
        Self::load(path, &encodings)
    }

    /// Parse already-decoded CSV content
    pub fn parse(content: &str) -> Result<Self> {
        let delimiter = sniff_delimiter(content);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let text_idx = column_index(&headers, &TEXT_COLUMNS).ok_or_else(|| {
            DatasetError::MissingColumn {
                column: TEXT_COLUMNS[0].to_string(),
                found: headers.clone(),
            }
        })?;
        let outlet_idx = column_index(&headers, &OUTLET_COLUMNS);

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            records.push(to_record(&row, i as u64 + 1, text_idx, outlet_idx));
        }

        Ok(Self {
            path: PathBuf::new(),
            encoding: TextEncoding::Utf8,
            delimiter,
            headers,
            records,
        })
    }

    /// Records strictly after the given checkpoint
    pub fn pending(&self, checkpoint: u64) -> impl Iterator<Item = &SourceRecord> {
        self.records.iter().filter(move |r| r.sequence > checkpoint)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn column_index(headers: &[String], names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
}

fn to_record(
    row: &StringRecord,
    sequence: u64,
    text_idx: usize,
    outlet_idx: Option<usize>,
) -> SourceRecord {
    let outlet = outlet_idx
        .and_then(|i| row.get(i))
        .map(str::trim)
        .unwrap_or(UNKNOWN_OUTLET);
    let text = row.get(text_idx).map(str::trim).unwrap_or_default();
    SourceRecord::new(outlet, text, sequence)
}

// ============================================================================
// Delimiter Sniffing
// ============================================================================

/// Guess the field delimiter from the leading sample of `content`
///
/// A candidate qualifies when it occurs on the header line and the same
/// number of times (outside quotes) on every other complete sample line.
/// The qualifying candidate with the most header occurrences wins; with
/// none, the comma is assumed.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: String = content.chars().take(SNIFF_SAMPLE_CHARS).collect();
    let truncated = content.chars().nth(SNIFF_SAMPLE_CHARS).is_some();

    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if truncated && lines.len() > 1 {
        lines.pop();
    }

    let Some((header, rest)) = lines.split_first() else {
        return b',';
    };

    let mut best: Option<(char, usize)> = None;
    for candidate in DELIMITER_CANDIDATES {
        let count = count_unquoted(header, candidate);
        if count == 0 {
            continue;
        }
        if !rest.iter().all(|line| count_unquoted(line, candidate) == count) {
            continue;
        }
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((candidate, count));
        }
    }

    best.map_or(b',', |(c, _)| c as u8)
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sniff_comma() {
        assert_eq!(sniff_delimiter("medio,texto\nRPP,\"Choque, en Lima\"\n"), b',');
    }

    #[test]
    fn test_sniff_semicolon() {
        let content =
            "medio;texto\nRPP;Choque en Av. Arequipa, Lima\nLa República;Marcha en Cusco\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_tab_and_pipe() {
        assert_eq!(sniff_delimiter("medio\ttexto\nRPP\tIncendio\n"), b'\t');
        assert_eq!(sniff_delimiter("medio|texto\nRPP|Incendio\n"), b'|');
    }

    #[test]
    fn test_sniff_inconsistent_falls_back_to_comma() {
        assert_eq!(sniff_delimiter("medio;texto\nRPP;a;b\n"), b',');
        assert_eq!(sniff_delimiter("texto\nsolo una columna\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_parse_records() {
        let content = "medio,texto\n  RPP , Choque en Lima \nCanal N,\n";
        let dataset = SourceDataset::parse(content).unwrap();

        assert_eq!(dataset.headers, vec!["medio", "texto"]);
        assert_eq!(
            dataset.records,
            vec![
                SourceRecord::new("RPP", "Choque en Lima", 1),
                SourceRecord::new("Canal N", "", 2),
            ]
        );
        assert!(dataset.records[1].is_blank());
    }

    #[test]
    fn test_parse_missing_outlet_column() {
        let dataset = SourceDataset::parse("texto\nIncendio en Ate\n").unwrap();
        assert_eq!(dataset.records[0].outlet, UNKNOWN_OUTLET);
    }

    #[test]
    fn test_parse_english_aliases() {
        let dataset = SourceDataset::parse("outlet;text\nRPP;Marcha en Puno\n").unwrap();
        assert_eq!(dataset.delimiter, b';');
        assert_eq!(dataset.records[0], SourceRecord::new("RPP", "Marcha en Puno", 1));
    }

    #[test]
    fn test_parse_missing_text_column() {
        let err = SourceDataset::parse("medio,titulo\nRPP,algo\n").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { ref column, .. } if column == "texto"));
    }

    #[test]
    fn test_pending_after_checkpoint() {
        let dataset = SourceDataset::parse("medio,texto\nA,uno\nB,dos\nC,tres\n").unwrap();
        let pending: Vec<u64> = dataset.pending(2).map(|r| r.sequence).collect();
        assert_eq!(pending, vec![3]);
        assert_eq!(dataset.pending(0).count(), 3);
    }

    #[test]
    fn test_load_windows_1252_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"medio;texto\nRPP;Accidente en Jir\xf3n Ica\n").unwrap();

        let dataset = SourceDataset::load_with_names(
            file.path(),
            &["utf-8".to_string(), "windows-1252".to_string(), "latin-1".to_string()],
        )
        .unwrap();

        assert_eq!(dataset.encoding, TextEncoding::Windows1252);
        assert_eq!(dataset.records[0].text, "Accidente en Jirón Ica");
    }

    #[test]
    fn test_load_missing_file() {
        let err =
            SourceDataset::load("/nonexistent/fuente.csv", &[TextEncoding::Utf8]).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }
}
