//! Plain comma-separated text parsing.
//!
//! Known limitation: there is no quoting support. Lines are split on
//! newlines and then on every literal comma, so a comma inside a value
//! shifts the remaining columns and an embedded newline starts a new row.
//! Exports produced by this crate never quote, so they round-trip.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::warn;

/// What to do with a data line whose token count differs from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    /// Missing trailing fields become `""`, surplus fields are ignored.
    PadMissing,
    /// Rows that do not line up with the header are dropped.
    DropMismatched,
}

/// Header plus data rows, all values trimmed and untyped.
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl ParsedCsv {
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Column index of an exactly matching header.
    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header_index(name).is_some()
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows as header → value mappings, in source order.
    pub fn rows(&self) -> Vec<HashMap<String, String>> {
        self.records
            .iter()
            .map(|rec| {
                self.headers
                    .iter()
                    .zip(rec.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect()
            })
            .collect()
    }

    /// Deserialize every row against the header row.
    pub fn deserialize<'a, T>(&'a self) -> impl Iterator<Item = Result<T, csv::Error>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        self.records
            .iter()
            .map(move |rec| rec.deserialize(Some(&self.headers)))
    }
}

/// Parse header + data lines.
///
/// Blank lines are ignored. Input with fewer than two non-blank lines
/// yields an empty result.
pub fn parse_csv(text: &str, policy: RowPolicy) -> ParsedCsv {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return ParsedCsv::default();
    }
    let joined = lines.join("\n");

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(joined.as_bytes());

    let headers = match rdr.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!(error = %e, "Unreadable CSV header row");
            return ParsedCsv::default();
        }
    };
    let width = headers.len();

    let mut records = Vec::with_capacity(lines.len() - 1);
    let mut dropped = 0usize;
    for result in rdr.records() {
        let mut rec = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable CSV line");
                dropped += 1;
                continue;
            }
        };
        match policy {
            RowPolicy::PadMissing => {
                while rec.len() < width {
                    rec.push_field("");
                }
                rec.truncate(width);
            }
            RowPolicy::DropMismatched => {
                if rec.len() != width {
                    dropped += 1;
                    continue;
                }
            }
        }
        records.push(rec);
    }
    if dropped > 0 {
        warn!(dropped, "Dropped CSV rows that did not match the header");
    }

    ParsedCsv { headers, records }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_headers_and_values() {
        let parsed = parse_csv(" Name , Value \n a , 1 \n", RowPolicy::PadMissing);
        assert_eq!(parsed.headers().iter().collect::<Vec<_>>(), vec!["Name", "Value"]);
        assert_eq!(parsed.rows()[0]["Name"], "a");
        assert_eq!(parsed.rows()[0]["Value"], "1");
    }

    #[test]
    fn skips_blank_lines() {
        let parsed = parse_csv("A,B\n\n1,2\n   \n3,4\n", RowPolicy::PadMissing);
        assert_eq!(parsed.len(), 2);
        assert_eq!(&parsed.records()[1][0], "3");
    }

    #[test]
    fn fewer_than_two_lines_is_empty() {
        assert!(parse_csv("", RowPolicy::PadMissing).is_empty());
        assert!(parse_csv("A,B\n", RowPolicy::PadMissing).is_empty());
        assert!(parse_csv("A,B\n  \n", RowPolicy::PadMissing).headers().is_empty());
    }

    #[test]
    fn pad_missing_fills_trailing_fields() {
        let parsed = parse_csv("A,B,C\n1\n1,2,3,4\n", RowPolicy::PadMissing);
        let rows = parsed.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["B"], "");
        assert_eq!(rows[0]["C"], "");
        assert_eq!(parsed.records()[1].len(), 3);
    }

    #[test]
    fn drop_mismatched_discards_short_and_long_rows() {
        let parsed = parse_csv("A,B\n1\n1,2\n1,2,3\n", RowPolicy::DropMismatched);
        assert_eq!(parsed.len(), 1);
        assert_eq!(&parsed.records()[0][1], "2");
    }

    #[test]
    fn quotes_are_not_special() {
        let parsed = parse_csv("A,B\n\"x,y\",z\n", RowPolicy::PadMissing);
        let rows = parsed.rows();
        assert_eq!(rows[0]["A"], "\"x");
        assert_eq!(rows[0]["B"], "y\"");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let parsed = parse_csv("A,B\r\n1,2\r\n", RowPolicy::DropMismatched);
        assert_eq!(parsed.len(), 1);
        assert_eq!(&parsed.records()[0][1], "2");
    }
}
