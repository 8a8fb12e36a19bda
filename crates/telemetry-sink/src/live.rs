use crate::{Payloads, RawPublisher, Result, SinkKind, SinkTopics, TelemetrySink, TopicTable};
use tracing::debug;

/// Publishes every payload to its own topic on every delivery.
pub struct LiveTopicSink {
    persistent: Box<dyn RawPublisher>,
    periodic: Box<dyn RawPublisher>,
    aliases: Box<dyn RawPublisher>,
}

impl LiveTopicSink {
    pub fn new(table: &dyn TopicTable, topics: &SinkTopics) -> Result<Self> {
        debug!(
            persistent = %topics.persistent.name,
            periodic = %topics.periodic.name,
            aliases = %topics.aliases.name,
            "opening live topics"
        );
        Ok(Self {
            persistent: table
                .raw_publisher(&topics.persistent.name, &topics.persistent.type_string)?,
            periodic: table.raw_publisher(&topics.periodic.name, &topics.periodic.type_string)?,
            aliases: table.raw_publisher(&topics.aliases.name, &topics.aliases.type_string)?,
        })
    }
}

impl TelemetrySink for LiveTopicSink {
    fn kind(&self) -> SinkKind {
        SinkKind::LiveTopic
    }

    fn deliver(&mut self, payloads: &Payloads<'_>) -> Result<()> {
        self.persistent.set(payloads.persistent)?;
        self.periodic.set(payloads.periodic)?;
        self.aliases.set(payloads.aliases)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTopics;

    #[test]
    fn every_delivery_overwrites_all_topics() {
        let table = MemoryTopics::new();
        let topics = SinkTopics::default();
        let mut sink = LiveTopicSink::new(&table, &topics).unwrap();

        for tick in 0..3u8 {
            sink.deliver(&Payloads {
                persistent: &[tick],
                periodic: &[tick, tick],
                aliases: b"[]",
            })
            .unwrap();
        }

        assert_eq!(table.latest("/URCL/Raw/Persistent").unwrap(), Some(vec![2]));
        assert_eq!(table.latest("/URCL/Raw/Periodic").unwrap(), Some(vec![2, 2]));
        assert_eq!(table.latest("/URCL/Raw/Aliases").unwrap(), Some(b"[]".to_vec()));
        assert_eq!(table.publish_count("/URCL/Raw/Aliases").unwrap(), 3);
        assert_eq!(
            table.type_string("/URCL/Raw/Periodic").unwrap().as_deref(),
            Some("URCLr2_periodic")
        );
    }
}
