//! Log records and the aggregator that persists them
//!
//! Records are appended in drain order and never reordered. The default
//! [`OutputFormat::Json`] buffers the whole run and writes one pretty-printed
//! array when the crawl finishes; [`OutputFormat::JsonLines`] writes and
//! flushes each record as soon as it is appended.

use crate::crawl::collector::ObservedResponse;
use crate::error::{OutputError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Header map as observed on the wire; later duplicates replace earlier ones.
pub type HeaderMap = BTreeMap<String, String>;

/// Request half of a captured exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLog {
    /// HTTP method
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body, omitted when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

/// Response half of a captured exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseLog {
    /// Response URL
    pub url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text, omitted when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

/// One persisted entry: a single captured exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Key the response was captured under
    pub url: String,
    /// Always exactly one request
    pub requests: Vec<RequestLog>,
    /// Always exactly one response
    pub responses: Vec<ResponseLog>,
    /// Copy of the response body
    pub content: String,
}

impl LogRecord {
    /// Build a record from a drained response and its fetched body.
    ///
    /// Bodies that are not valid UTF-8 are converted lossily.
    pub fn from_exchange(key: &str, response: &ObservedResponse, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body).into_owned();

        Self {
            url: key.to_string(),
            requests: vec![RequestLog {
                method: response.method.clone(),
                url: response.url.clone(),
                headers: response.request_headers.clone(),
                body: String::new(),
            }],
            responses: vec![ResponseLog {
                url: response.url.clone(),
                status_code: response.status,
                headers: response.response_headers.clone(),
                body: text.clone(),
            }],
            content: text,
        }
    }
}

/// Output framing for the log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One pretty-printed JSON array written at the end of the run
    #[default]
    Json,
    /// One compact JSON object per line, flushed per record
    #[serde(rename = "jsonl")]
    JsonLines,
}

/// Append-only record sink
pub struct LogAggregator {
    sink: Box<dyn Write + Send>,
    format: OutputFormat,
    records: Vec<LogRecord>,
    written: usize,
}

impl std::fmt::Debug for LogAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogAggregator")
            .field("format", &self.format)
            .field("buffered", &self.records.len())
            .field("written", &self.written)
            .finish()
    }
}

impl LogAggregator {
    /// Aggregate into an arbitrary writer
    pub fn new(sink: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self {
            sink,
            format,
            records: Vec::new(),
            written: 0,
        }
    }

    /// Create (or truncate) `path` and aggregate into it
    pub fn create(path: &Path, format: OutputFormat) -> Result<Self> {
        let file = File::create(path).map_err(|source| OutputError::OpenFailed {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Opened log file {}", path.display());
        Ok(Self::new(Box::new(BufWriter::new(file)), format))
    }

    /// Aggregate in memory only; nothing is persisted
    pub fn discard() -> Self {
        Self::new(Box::new(std::io::sink()), OutputFormat::Json)
    }

    /// Append one record
    pub fn append(&mut self, record: LogRecord) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.records.push(record),
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.sink, &record)?;
                self.sink
                    .write_all(b"\n")
                    .and_then(|_| self.sink.flush())
                    .map_err(|e| OutputError::WriteFailed(e.to_string()))?;
                self.written += 1;
            }
        }
        Ok(())
    }

    /// Records buffered for the final document, in append order
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.records.len() + self.written
    }

    /// Whether nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Output framing in use
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Serialize buffered records and flush. Returns the record count.
    pub fn finish(mut self) -> Result<usize> {
        let total = self.len();

        if self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.sink, &self.records)?;
            self.sink
                .write_all(b"\n")
                .map_err(|e| OutputError::WriteFailed(e.to_string()))?;
        }
        self.sink
            .flush()
            .map_err(|e| OutputError::WriteFailed(e.to_string()))?;

        info!("Wrote {} log records", total);
        Ok(total)
    }
}
