//! In-process topic table and data log.

use crate::{DataLog, RawLogEntry, RawPublisher, Result, SinkError, TopicTable};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default, Clone)]
struct TopicState {
    type_string: String,
    value: Option<Vec<u8>>,
    publishes: u64,
}

/// Latest-value topic table shared by every publisher it hands out.
#[derive(Clone, Default)]
pub struct MemoryTopics {
    topics: Arc<Mutex<BTreeMap<String, TopicState>>>,
}

impl MemoryTopics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, TopicState>>> {
        self.topics.lock().map_err(|_| SinkError::Poisoned)
    }

    pub fn latest(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(name).and_then(|t| t.value.clone()))
    }

    pub fn publish_count(&self, name: &str) -> Result<u64> {
        Ok(self.lock()?.get(name).map(|t| t.publishes).unwrap_or(0))
    }

    pub fn type_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(name).map(|t| t.type_string.clone()))
    }

    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

impl TopicTable for MemoryTopics {
    fn raw_publisher(&self, name: &str, type_string: &str) -> Result<Box<dyn RawPublisher>> {
        self.lock()?
            .entry(name.to_string())
            .or_insert_with(|| TopicState {
                type_string: type_string.to_string(),
                ..TopicState::default()
            });
        Ok(Box::new(MemoryPublisher {
            table: self.clone(),
            name: name.to_string(),
        }))
    }
}

struct MemoryPublisher {
    table: MemoryTopics,
    name: String,
}

impl RawPublisher for MemoryPublisher {
    fn set(&mut self, payload: &[u8]) -> Result<()> {
        let mut topics = self.table.lock()?;
        let topic = topics.entry(self.name.clone()).or_default();
        topic.value = Some(payload.to_vec());
        topic.publishes += 1;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct EntryState {
    type_string: String,
    records: Vec<Vec<u8>>,
}

/// Append-only in-memory data log.
#[derive(Clone, Default)]
pub struct MemoryLog {
    entries: Arc<Mutex<BTreeMap<String, EntryState>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, EntryState>>> {
        self.entries.lock().map_err(|_| SinkError::Poisoned)
    }

    /// All records of one entry, oldest first.
    pub fn records(&self, name: &str) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .lock()?
            .get(name)
            .map(|e| e.records.clone())
            .unwrap_or_default())
    }

    pub fn type_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(name).map(|e| e.type_string.clone()))
    }
}

impl DataLog for MemoryLog {
    fn raw_entry(&self, name: &str, type_string: &str) -> Result<Box<dyn RawLogEntry>> {
        self.lock()?
            .entry(name.to_string())
            .or_insert_with(|| EntryState {
                type_string: type_string.to_string(),
                records: Vec::new(),
            });
        Ok(Box::new(MemoryEntry {
            log: self.clone(),
            name: name.to_string(),
        }))
    }
}

struct MemoryEntry {
    log: MemoryLog,
    name: String,
}

impl RawLogEntry for MemoryEntry {
    fn append(&mut self, payload: &[u8]) -> Result<()> {
        let mut entries = self.log.lock()?;
        entries
            .entry(self.name.clone())
            .or_default()
            .records
            .push(payload.to_vec());
        Ok(())
    }

    fn update(&mut self, payload: &[u8]) -> Result<()> {
        let mut entries = self.log.lock()?;
        let entry = entries.entry(self.name.clone()).or_default();
        if entry.records.last().map(Vec::as_slice) != Some(payload) {
            entry.records.push(payload.to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishers_share_table_state() {
        let table = MemoryTopics::new();
        let mut a = table.raw_publisher("/a", "raw").unwrap();
        a.set(&[1, 2]).unwrap();
        a.set(&[3]).unwrap();
        assert_eq!(table.latest("/a").unwrap(), Some(vec![3]));
        assert_eq!(table.publish_count("/a").unwrap(), 2);
        assert_eq!(table.latest("/missing").unwrap(), None);
        assert_eq!(table.names().unwrap(), vec!["/a".to_string()]);
    }

    #[test]
    fn update_skips_unchanged_values() {
        let log = MemoryLog::new();
        let mut entry = log.raw_entry("/snap", "raw").unwrap();
        entry.update(&[1]).unwrap();
        entry.update(&[1]).unwrap();
        entry.update(&[2]).unwrap();
        entry.append(&[2]).unwrap();
        assert_eq!(log.records("/snap").unwrap(), vec![vec![1], vec![2], vec![2]]);
        assert_eq!(log.type_string("/snap").unwrap().as_deref(), Some("raw"));
    }
}
