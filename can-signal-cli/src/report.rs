//! Report generation
//!
//! Writes decoded signals as plain text lines or JSON lines to stdout or a file.

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use can_signal_decoder::{parse_timestamp, DecodedSignal};
use chrono::SecondsFormat;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One JSON report line
#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    signal: &'a str,
    value: f64,
    unit: &'a str,
    raw: i64,
}

/// Streams decoded signals in the selected output format
pub struct ReportWriter {
    out: Box<dyn Write>,
    format: OutputFormat,
    precision: usize,
    written: usize,
}

impl ReportWriter {
    pub fn new(out: Box<dyn Write>, format: OutputFormat, precision: usize) -> Self {
        Self {
            out,
            format,
            precision,
            written: 0,
        }
    }

    /// Open the report destination: the given file, or stdout when `None`
    pub fn open(path: Option<&Path>, format: OutputFormat, precision: usize) -> Result<Self> {
        let out: Box<dyn Write> = match path {
            Some(path) => {
                log::info!("Writing {:?} report to {:?}", format, path);
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {:?}", path))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        Ok(Self::new(out, format, precision))
    }

    pub fn write(&mut self, signal: &DecodedSignal) -> Result<()> {
        match self.format {
            OutputFormat::Txt => writeln!(
                self.out,
                "{}: {}: {:.*}",
                signal.timestamp, signal.name, self.precision, signal.value
            )?,
            OutputFormat::Json => {
                let record = JsonRecord {
                    timestamp: &signal.timestamp,
                    time: rfc3339_time(&signal.timestamp),
                    signal: &signal.name,
                    value: signal.value,
                    unit: &signal.unit,
                    raw: signal.raw_value,
                };
                serde_json::to_writer(&mut self.out, &record)?;
                writeln!(self.out)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Flush the destination and return the number of signals written
    pub fn finish(mut self) -> Result<usize> {
        self.out.flush().context("Failed to flush report output")?;
        Ok(self.written)
    }
}

/// RFC 3339 rendering of a candump timestamp, when it is epoch seconds
fn rfc3339_time(timestamp: &str) -> Option<String> {
    parse_timestamp(timestamp).map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
}
