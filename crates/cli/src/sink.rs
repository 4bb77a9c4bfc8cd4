//! Destinations for per-polygon results

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use gridzonal_algorithms::statistics::CompleteTable;
use gridzonal_core::PolygonId;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// One persisted row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub grade_id: PolygonId,
    pub value: f64,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub category: String,
}

impl ResultRecord {
    /// Records for every polygon of `table`, all stamped with the same date
    pub fn from_table(table: &CompleteTable, date: DateTime<Utc>, category: &str) -> Vec<Self> {
        table
            .iter()
            .map(|(id, value)| ResultRecord {
                grade_id: id.clone(),
                value: *value,
                date,
                category: category.to_string(),
            })
            .collect()
    }
}

/// Receives the records of a finished run
pub trait ResultSink {
    fn write(&mut self, records: &[ResultRecord]) -> Result<()>;
}

fn csv_field(text: &str) -> String {
    if text.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn write_csv<W: Write>(mut out: W, records: &[ResultRecord]) -> Result<()> {
    writeln!(out, "grade_id,value,date,type")?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{}",
            csv_field(&record.grade_id.to_string()),
            record.value,
            record.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            csv_field(&record.category)
        )?;
    }
    out.flush()?;
    Ok(())
}

/// CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for CsvSink {
    fn write(&mut self, records: &[ResultRecord]) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        write_csv(BufWriter::new(file), records)
    }
}

/// One JSON object per line
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for JsonLinesSink {
    fn write(&mut self, records: &[ResultRecord]) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let mut out = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

/// CSV on standard output
#[derive(Debug, Clone, Default)]
pub struct StdoutSink;

impl ResultSink for StdoutSink {
    fn write(&mut self, records: &[ResultRecord]) -> Result<()> {
        write_csv(std::io::stdout().lock(), records)
    }
}
