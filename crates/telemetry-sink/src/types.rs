use core::fmt;
use serde::{Deserialize, Serialize};

/// The three payloads produced by one refresh.
#[derive(Clone, Copy, Debug, Default)]
pub struct Payloads<'a> {
    pub persistent: &'a [u8],
    pub periodic: &'a [u8],
    pub aliases: &'a [u8],
}

/// Name and type string of one raw topic or log entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TopicSpec {
    pub name: String,
    pub type_string: String,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>, type_string: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_string: type_string.into(),
        }
    }
}

/// Where each payload is published. Defaults match the names AdvantageScope
/// expects for revision 2 captures.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SinkTopics {
    pub persistent: TopicSpec,
    pub periodic: TopicSpec,
    pub aliases: TopicSpec,
}

impl Default for SinkTopics {
    fn default() -> Self {
        Self {
            persistent: TopicSpec::new("/URCL/Raw/Persistent", "URCLr2_persistent"),
            periodic: TopicSpec::new("/URCL/Raw/Periodic", "URCLr2_periodic"),
            aliases: TopicSpec::new("/URCL/Raw/Aliases", "URCLr2_aliases"),
        }
    }
}

/// Destination chosen when a session starts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    LiveTopic,
    LogEntry,
    ExternalPull,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SinkKind::LiveTopic => "live_topic",
            SinkKind::LogEntry => "log_entry",
            SinkKind::ExternalPull => "external_pull",
        };
        f.write_str(s)
    }
}
