//! Generic delimited-text parser with encoding and delimiter auto-detection.
//!
//! Converts a byte stream into [`RawRow`]s keyed by the file's own header
//! strings. No worker-specific logic here: header resolution to internal
//! column keys happens in [`crate::validation::RuleSet::resolve_headers`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// One data record of the input file: an ordered mapping column → cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
    /// 1-indexed file line the record starts on, when parsed from a file.
    line: Option<usize>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Insert or replace a cell, keeping the original position on replace.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Cell value if present and not blank.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.cells.iter().any(|(k, _)| k == column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Rename every column through `rename`, keeping cell order.
    pub fn map_keys<F>(self, mut rename: F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        let mut out = RawRow {
            line: self.line,
            ..RawRow::default()
        };
        for (k, v) in self.cells {
            out.insert(rename(&k), v);
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed data rows, in file order
    pub rows: Vec<RawRow>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers as written in the file
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    if decoded.contains('\u{0}') {
        return Err(CsvError::Encoding(format!(
            "content decoded as {} contains NUL bytes, is this a binary file?",
            encoding
        )));
    }

    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse a file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_str(&content, delimiter, encoding)
}

/// Parse already-decoded text with an explicit delimiter.
///
/// Quoted cells (including embedded delimiters and doubled quotes) follow
/// RFC 4180. Blank lines are skipped. Short lines are padded with empty
/// cells; surplus cells are dropped. Every row remembers the file line it
/// starts on, so multi-line cells and skipped lines keep reports accurate.
/// Cells are kept as written; only headers are trimmed.
pub fn parse_str(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    if !delimiter.is_ascii() {
        return Err(CsvError::parse(1, format!("unsupported delimiter '{}'", delimiter)));
    }

    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        if let Some(position) = record.position() {
            row = row.with_line(record_line(content.as_bytes(), position));
        }
        rows.push(row);
    }

    Ok(ParseResult {
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// File line a record starts on.
///
/// The reader positions a record where it started scanning, which is before
/// any blank lines it skipped on the way.
fn record_line(content: &[u8], position: &csv::Position) -> usize {
    let start = usize::try_from(position.byte())
        .unwrap_or(content.len())
        .min(content.len());
    let skipped = content[start..]
        .iter()
        .take_while(|b| matches!(b, b'\n' | b'\r'))
        .filter(|b| **b == b'\n')
        .count();
    position.line() as usize + skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str, delimiter: char) -> ParseResult {
        parse_str(csv, delimiter, "utf-8".to_string()).unwrap()
    }

    #[test]
    fn test_simple_csv() {
        let result = parse("name;age\nAlice;30\nBob;25", ';');

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("name"), Some("Alice"));
        assert_eq!(result.rows[0].get("age"), Some("30"));
        assert_eq!(result.rows[1].get("name"), Some("Bob"));
        assert_eq!(result.headers, vec!["name", "age"]);
    }

    #[test]
    fn test_quoted_values_keep_embedded_delimiter() {
        let result = parse("name,tags\nAlice,\"night shift, forklift\"", ',');

        assert_eq!(result.rows[0].get("tags"), Some("night shift, forklift"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let result = parse("a,b\n1,2\n\n,\n3,4\n", ',');
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_rows_carry_file_lines() {
        let result = parse(
            "name,title\n\nAda,\"Shift\nLead\"\n\nGrace,Admiral\n",
            ',',
        );

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].line(), Some(3));
        assert_eq!(result.rows[0].get("title"), Some("Shift\nLead"));
        assert_eq!(result.rows[1].line(), Some(6));
    }

    #[test]
    fn test_crlf_lines() {
        let result = parse("name\r\nAda\r\n\r\nGrace\r\n", ',');

        assert_eq!(result.rows[0].line(), Some(2));
        assert_eq!(result.rows[1].line(), Some(4));
    }

    #[test]
    fn test_cells_keep_surrounding_spaces() {
        let result = parse(" name , phone \n Ada ,  +331 \n", ',');

        assert_eq!(result.headers, vec!["name", "phone"]);
        assert_eq!(result.rows[0].get("phone"), Some("  +331 "));
        assert_eq!(result.rows[0].non_empty("name"), Some("Ada"));
    }

    #[test]
    fn test_map_keys_keeps_line() {
        let row: RawRow = [("a", "1")].into_iter().collect();
        let renamed = row.with_line(7).map_keys(|k| k.to_uppercase());

        assert_eq!(renamed.line(), Some(7));
        assert_eq!(renamed.get("A"), Some("1"));
    }

    #[test]
    fn test_missing_values_padded() {
        let result = parse("a;b;c\n1;;3\n4", ';');

        assert_eq!(result.rows[0].get("b"), Some(""));
        assert_eq!(result.rows[1].get("a"), Some("4"));
        assert_eq!(result.rows[1].get("c"), Some(""));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let result = parse("a;b\n1;2;3;4", ';');

        assert_eq!(result.rows[0].len(), 2);
        assert_eq!(result.rows[0].get("b"), Some("2"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let result = parse("\u{feff}First Name,Phone\nAda,+331", ',');
        assert_eq!(result.headers[0], "First Name");
    }

    #[test]
    fn test_empty_csv_error() {
        let result = parse_str("  \n", ',', "utf-8".to_string());
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto(b"name;age\nAlice;30\nBob;25").unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_raw_row_insert_replaces_in_place() {
        let mut row: RawRow = [("a", "1"), ("b", "2")].into_iter().collect();
        row.insert("a", "3");

        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some("3"));
        assert_eq!(row.non_empty("missing"), None);
    }
}
