use crate::{DataLog, RawLogEntry, Result, SinkError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

/// One line of a JSON-lines capture log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub session: Uuid,
    pub entry: String,
    #[serde(rename = "type")]
    pub type_string: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Base64 payload.
    pub data: String,
}

impl LogRecord {
    pub fn payload(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| SinkError::Encode(e.to_string()))
    }
}

/// File-backed data log writing one JSON object per record.
#[derive(Clone)]
pub struct JsonLinesLog {
    path: PathBuf,
    session: Uuid,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl JsonLinesLog {
    /// Open `path` for appending, creating it if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let session = Uuid::new_v4();
        info!(path = %path.display(), %session, "opened capture log");
        Ok(Self {
            path,
            session,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    fn write_record(&self, entry: &str, type_string: &str, payload: &[u8]) -> Result<()> {
        let record = LogRecord {
            session: self.session,
            entry: entry.to_string(),
            type_string: type_string.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            data: STANDARD.encode(payload),
        };
        let json = serde_json::to_string(&record).map_err(|e| SinkError::Encode(e.to_string()))?;
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }
}

impl DataLog for JsonLinesLog {
    fn raw_entry(&self, name: &str, type_string: &str) -> Result<Box<dyn RawLogEntry>> {
        Ok(Box::new(JsonLinesEntry {
            log: self.clone(),
            name: name.to_string(),
            type_string: type_string.to_string(),
            last: None,
        }))
    }
}

struct JsonLinesEntry {
    log: JsonLinesLog,
    name: String,
    type_string: String,
    last: Option<Vec<u8>>,
}

impl RawLogEntry for JsonLinesEntry {
    fn append(&mut self, payload: &[u8]) -> Result<()> {
        self.log.write_record(&self.name, &self.type_string, payload)?;
        self.last = Some(payload.to_vec());
        Ok(())
    }

    fn update(&mut self, payload: &[u8]) -> Result<()> {
        if self.last.as_deref() == Some(payload) {
            return Ok(());
        }
        self.append(payload)
    }
}

/// Read every record from a JSON-lines capture log. Blank lines are skipped.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<LogRecord>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord =
            serde_json::from_str(&line).map_err(|e| SinkError::Encode(e.to_string()))?;
        out.push(record);
    }
    Ok(out)
}
