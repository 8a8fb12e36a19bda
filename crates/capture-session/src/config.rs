use crate::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use telemetry_sink::SinkTopics;

/// Default refresh period (50 Hz).
pub const DEFAULT_PERIOD_MS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub period_ms: u64,
    pub thread_name: String,
    #[serde(default)]
    pub topics: SinkTopics,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            thread_name: "URCL".to_string(),
            topics: SinkTopics::default(),
        }
    }
}

impl SessionConfig {
    /// Read a JSON config, falling back to defaults when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.period_ms == 0 {
            return Err(SessionError::Config("period_ms must be positive".into()));
        }
        if self.thread_name.is_empty() {
            return Err(SessionError::Config("thread_name must not be empty".into()));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}
