//! Dataset record I/O.
//!
//! One record per line, comma-separated: the complex expression, its ground
//! truth, an optional verification flag, and any trailing metadata columns
//! carried through untouched. Lines starting with `#` are comments; blank
//! lines are skipped. Expressions never contain commas, so no quoting is
//! needed.

use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::expr::Expression;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Record {
    pub complex: String,
    pub ground_truth: String,
    pub verified: bool,
    /// Extra columns preserved verbatim on rewrite.
    pub extra: Vec<String>,
}

impl Record {
    pub fn new(complex: impl Into<String>, ground_truth: impl Into<String>) -> Self {
        Self {
            complex: complex.into(),
            ground_truth: ground_truth.into(),
            verified: false,
            extra: Vec::new(),
        }
    }

    /// Term count of the complex expression, used for bucketing. Records
    /// whose complex side no longer parses sort last.
    pub fn term_count(&self) -> usize {
        Expression::parse(&self.complex)
            .map(|e| e.term_count())
            .unwrap_or(usize::MAX)
    }

    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{},{},{}",
            self.complex,
            self.ground_truth,
            if self.verified { "1" } else { "0" }
        );
        for col in &self.extra {
            line.push(',');
            line.push_str(col);
        }
        line
    }
}

/// Parses one dataset line. Comments and blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Record>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut fields = line.split(',');
    let complex = fields.next().unwrap_or_default().trim();
    let ground_truth = fields.next().map(str::trim).ok_or_else(|| Error::Parse {
        expr: line.to_string(),
        reason: "expected at least two comma-separated fields".to_string(),
    })?;
    if complex.is_empty() || ground_truth.is_empty() {
        return Err(Error::Parse {
            expr: line.to_string(),
            reason: "empty expression field".to_string(),
        });
    }
    let verified = matches!(
        fields.next().map(str::trim),
        Some("1") | Some("true") | Some("True")
    );
    let extra = fields.map(|f| f.trim().to_string()).collect();
    Ok(Some(Record {
        complex: complex.to_string(),
        ground_truth: ground_truth.to_string(),
        verified,
        extra,
    }))
}

pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        if let Some(record) = parse_line(&line?)? {
            records.push(record);
        }
    }
    Ok(records)
}

pub fn write_records<W: Write>(writer: &mut W, records: &[Record]) -> Result<()> {
    writeln!(writer, "#complex,groundtruth,verified")?;
    for record in records {
        writeln!(writer, "{}", record.to_line())?;
    }
    Ok(())
}

/// Stable sort by complex-side term count, ascending.
pub fn sort_by_term_count(records: &mut [Record]) {
    records.sort_by_key(Record::term_count);
}

/// Writes records sorted and bucketed: each run of equal term counts is
/// preceded by a `#N-terms` header.
pub fn write_sorted<W: Write>(writer: &mut W, records: &[Record]) -> Result<()> {
    let mut sorted = records.to_vec();
    sort_by_term_count(&mut sorted);
    writeln!(writer, "#complex,groundtruth,verified")?;
    let mut current = None;
    for record in &sorted {
        let n = record.term_count();
        if current != Some(n) {
            writeln!(writer, "#{}-terms", n)?;
            current = Some(n);
        }
        writeln!(writer, "{}", record.to_line())?;
    }
    Ok(())
}
