//! JsonLinesSink - one JSON document per snapshot

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use contracts::{ContractError, MeasurementSnapshot, ResultsSink};
use serde::Serialize;
use tracing::{debug, instrument};

/// Where the lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonLinesTarget {
    Stdout,
    Stderr,
    /// Appended to a file
    File(PathBuf),
}

impl JsonLinesTarget {
    /// Parse from sink params (`target` = stdout | stderr | file, `path` for file)
    pub fn from_params(params: &HashMap<String, String>) -> io::Result<Self> {
        match params.get("target").map(String::as_str) {
            None | Some("stdout") => Ok(Self::Stdout),
            Some("stderr") => Ok(Self::Stderr),
            Some("file") => params
                .get("path")
                .map(|path| Self::File(PathBuf::from(path)))
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "target 'file' requires 'path'")
                }),
            Some(other) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown target '{other}'"),
            )),
        }
    }

    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(match self {
            Self::Stdout => Box::new(io::stdout()),
            Self::Stderr => Box::new(io::stderr()),
            Self::File(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
        })
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    published_at: String,
    #[serde(flatten)]
    snapshot: &'a MeasurementSnapshot,
}

/// Sink that writes snapshots as newline-delimited JSON
pub struct JsonLinesSink {
    name: String,
    target: JsonLinesTarget,
    writer: BufWriter<Box<dyn Write + Send>>,
    lines: u64,
}

impl JsonLinesSink {
    /// Create a new JsonLinesSink
    pub fn new(name: impl Into<String>, target: JsonLinesTarget) -> io::Result<Self> {
        let writer = BufWriter::new(target.open()?);
        Ok(Self {
            name: name.into(),
            target,
            writer,
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> io::Result<Self> {
        Self::new(name, JsonLinesTarget::from_params(params)?)
    }

    /// Lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    fn write_line(&mut self, snapshot: &MeasurementSnapshot) -> Result<(), ContractError> {
        let line = JsonLine {
            published_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            snapshot,
        };
        serde_json::to_writer(&mut self.writer, &line)
            .map_err(|e| ContractError::sink_render(&self.name, e.to_string()))?;
        self.writer.write_all(b"\n")?;
        // Each line is a complete result: make it visible right away
        self.writer.flush()?;
        self.lines += 1;
        Ok(())
    }
}

impl ResultsSink for JsonLinesSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "json_lines_sink_render",
        skip(self, snapshot),
        fields(sink = %self.name, sequence = snapshot.sequence)
    )]
    async fn render(&mut self, snapshot: &MeasurementSnapshot) -> Result<(), ContractError> {
        self.write_line(snapshot)
    }

    #[instrument(name = "json_lines_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer.flush()?;
        Ok(())
    }

    #[instrument(name = "json_lines_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer.flush()?;
        debug!(sink = %self.name, target = ?self.target, lines = self.lines, "JsonLinesSink closed");
        Ok(())
    }
}
