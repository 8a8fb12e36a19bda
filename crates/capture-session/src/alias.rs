//! CAN ID → display name tables, one per bus.
//!
//! Encoded once as a JSON array with one object per bus, keyed by the decimal
//! CAN ID: `[{"1":"FL","2":"FR"},{"1":"Arm"}]`.

use crate::{Result, SessionError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Aliases for the devices on one bus.
///
/// Inserting an ID twice keeps the last name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusAliases(BTreeMap<u32, String>);

impl BusAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, can_id: u32, name: impl Into<String>) -> Self {
        self.insert(can_id, name);
        self
    }

    /// Returns the name previously bound to `can_id`, if any.
    pub fn insert(&mut self, can_id: u32, name: impl Into<String>) -> Option<String> {
        self.0.insert(can_id, name.into())
    }

    pub fn get(&self, can_id: u32) -> Option<&str> {
        self.0.get(&can_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for BusAliases {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        let mut bus = BusAliases::new();
        for (id, name) in iter {
            bus.insert(id, name);
        }
        bus
    }
}

/// Ordered per-bus alias tables.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable(Vec<BusAliases>);

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bus(mut self, bus: BusAliases) -> Self {
        self.0.push(bus);
        self
    }

    pub fn push(&mut self, bus: BusAliases) {
        self.0.push(bus);
    }

    pub fn buses(&self) -> &[BusAliases] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// UTF-8 JSON payload. Names are escaped like any JSON string.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.0).map_err(|e| SessionError::Alias(e.to_string()))
    }
}

impl FromIterator<BusAliases> for AliasTable {
    fn from_iter<I: IntoIterator<Item = BusAliases>>(iter: I) -> Self {
        AliasTable(iter.into_iter().collect())
    }
}

/// Load an alias table from YAML (`.yml`/`.yaml`) or JSON.
///
/// Both formats hold a list of maps from CAN ID to name, one map per bus.
pub fn load_alias_file(path: impl AsRef<Path>) -> anyhow::Result<AliasTable> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading aliases: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .map(|ext| ext == "yml" || ext == "yaml")
        .unwrap_or(false);
    let table = if is_yaml {
        serde_yaml::from_str(&raw).with_context(|| format!("parsing yaml: {}", path.display()))?
    } else {
        serde_json::from_str(&raw).with_context(|| format!("parsing json: {}", path.display()))?
    };
    Ok(table)
}
