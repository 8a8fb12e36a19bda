use crate::{DataLog, Payloads, RawLogEntry, Result, SinkKind, SinkTopics, TelemetrySink};
use tracing::debug;

/// Writes the persistent snapshot with update semantics, the periodic batch
/// with append semantics, and the alias table once.
pub struct LogEntrySink {
    persistent: Box<dyn RawLogEntry>,
    periodic: Box<dyn RawLogEntry>,
    aliases: Box<dyn RawLogEntry>,
    aliases_written: bool,
}

impl LogEntrySink {
    pub fn new(log: &dyn DataLog, topics: &SinkTopics) -> Result<Self> {
        debug!(
            persistent = %topics.persistent.name,
            periodic = %topics.periodic.name,
            "opening log entries"
        );
        Ok(Self {
            persistent: log.raw_entry(&topics.persistent.name, &topics.persistent.type_string)?,
            periodic: log.raw_entry(&topics.periodic.name, &topics.periodic.type_string)?,
            aliases: log.raw_entry(&topics.aliases.name, &topics.aliases.type_string)?,
            aliases_written: false,
        })
    }

    /// Write the alias table ahead of the first delivery.
    pub fn write_aliases(&mut self, aliases: &[u8]) -> Result<()> {
        self.aliases.update(aliases)?;
        self.aliases_written = true;
        Ok(())
    }
}

impl TelemetrySink for LogEntrySink {
    fn kind(&self) -> SinkKind {
        SinkKind::LogEntry
    }

    fn deliver(&mut self, payloads: &Payloads<'_>) -> Result<()> {
        if !self.aliases_written {
            self.write_aliases(payloads.aliases)?;
        }
        self.persistent.update(payloads.persistent)?;
        self.periodic.append(payloads.periodic)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryLog;

    #[test]
    fn persistent_updates_and_periodic_appends() {
        let log = MemoryLog::new();
        let mut sink = LogEntrySink::new(&log, &SinkTopics::default()).unwrap();
        let ticks: [(&[u8], &[u8]); 3] = [(&[1], &[10]), (&[1], &[11]), (&[2], &[12])];
        for (persistent, periodic) in ticks {
            sink.deliver(&Payloads {
                persistent,
                periodic,
                aliases: br#"[{"1":"FL"}]"#,
            })
            .unwrap();
        }

        assert_eq!(
            log.records("/URCL/Raw/Persistent").unwrap(),
            vec![vec![1], vec![2]]
        );
        assert_eq!(
            log.records("/URCL/Raw/Periodic").unwrap(),
            vec![vec![10], vec![11], vec![12]]
        );
        assert_eq!(
            log.records("/URCL/Raw/Aliases").unwrap(),
            vec![br#"[{"1":"FL"}]"#.to_vec()]
        );
    }

    #[test]
    fn aliases_written_up_front_are_not_repeated() {
        let log = MemoryLog::new();
        let mut sink = LogEntrySink::new(&log, &SinkTopics::default()).unwrap();
        sink.write_aliases(b"[]").unwrap();
        sink.deliver(&Payloads {
            persistent: &[],
            periodic: &[],
            aliases: b"[]",
        })
        .unwrap();
        assert_eq!(log.records("/URCL/Raw/Aliases").unwrap().len(), 1);
    }
}
