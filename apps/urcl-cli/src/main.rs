use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use capture_driver::records::{self, PeriodicRecord, PersistentRecord};
use capture_driver::{SimDriver, SimHandle};
use capture_session::{self as session, AliasTable, Destination, SessionConfig};
use telemetry_sink::{JsonLinesLog, MemoryTopics, SinkTopics};

#[derive(Parser, Debug)]
#[command(
    name = "urcl",
    version,
    about = "Motor-controller CAN capture republisher",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SinkArg {
    Live,
    Log,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a push session on the simulated driver with synthetic traffic
    Run {
        /// Destination for refreshed payloads
        #[arg(long, value_enum, default_value_t = SinkArg::Live)]
        sink: SinkArg,
        /// JSON-lines log path (log sink only)
        #[arg(long, default_value = "urcl.jsonl")]
        log_file: String,
        /// Alias file (YAML or JSON list of id->name maps)
        #[arg(long)]
        aliases: Option<String>,
        /// Session config JSON (defaults when absent)
        #[arg(long)]
        config: Option<String>,
        /// How long to capture
        #[arg(long, default_value_t = 1000u64)]
        duration_ms: u64,
        /// Number of simulated motor controllers
        #[arg(long, default_value_t = 4u8)]
        devices: u8,
    },
    /// Start in external mode and pull payloads on our own schedule
    Pull {
        /// Number of pulls
        #[arg(long, default_value_t = 10u32)]
        count: u32,
        /// Milliseconds between pulls
        #[arg(long, default_value_t = 20u64)]
        interval_ms: u64,
        /// Alias file (YAML or JSON)
        #[arg(long)]
        aliases: Option<String>,
        /// Number of simulated motor controllers
        #[arg(long, default_value_t = 4u8)]
        devices: u8,
    },
    /// Encode an alias file and print the payload
    Aliases {
        /// Alias file (YAML or JSON)
        #[arg(long)]
        file: String,
    },
    /// Decode a JSON-lines capture log
    Inspect {
        /// Log file written by `run --sink log`
        #[arg(long)]
        file: String,
        /// Emit decoded records as JSON lines
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            sink,
            log_file,
            aliases,
            config,
            duration_ms,
            devices,
        } => run(
            sink,
            &log_file,
            aliases.as_deref(),
            config.as_deref(),
            duration_ms,
            devices,
        ),
        Commands::Pull {
            count,
            interval_ms,
            aliases,
            devices,
        } => pull(count, interval_ms, aliases.as_deref(), devices),
        Commands::Aliases { file } => aliases_cmd(&file),
        Commands::Inspect { file, json } => inspect(&file, json),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_aliases(path: Option<&str>) -> Result<AliasTable> {
    match path {
        Some(p) => session::load_alias_file(p),
        None => Ok(AliasTable::new()),
    }
}

/// Queue one round of synthetic traffic: firmware replies on the first round,
/// one status frame per device every round.
fn feed(handle: &SimHandle, devices: u8, round: u32) -> Result<()> {
    for device in 1..=devices.min(63) {
        if round == 0 {
            handle.push_firmware(device, &[1, 24, 0, 3, 0, 0])?;
        }
        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&round.to_le_bytes());
        data[4] = device;
        if !handle.push_periodic(device, 0, &data)? {
            warn!(device, "periodic queue full, frame dropped");
        }
    }
    Ok(())
}

fn run(
    sink: SinkArg,
    log_file: &str,
    aliases: Option<&str>,
    config: Option<&str>,
    duration_ms: u64,
    devices: u8,
) -> Result<()> {
    let config = match config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let aliases = load_aliases(aliases)?;
    let driver = SimDriver::new()?;
    let handle = driver.handle();

    let topics = MemoryTopics::new();
    let log;
    let destination = match sink {
        SinkArg::Live => Destination::LiveTopic(&topics),
        SinkArg::Log => {
            log = JsonLinesLog::create(log_file)?;
            Destination::LogEntry(&log)
        }
    };
    let capture =
        session::process_guard().start_with_config(driver, &aliases, destination, &config)?;

    let started = Instant::now();
    let deadline = Duration::from_millis(duration_ms);
    let mut round = 0u32;
    while started.elapsed() < deadline {
        feed(&handle, devices, round)?;
        round += 1;
        thread::sleep(config.period());
    }

    let metrics = capture.metrics().clone();
    let ticks = capture.stop()?;
    info!(ticks, rounds = round, "capture finished");
    println!("ticks: {ticks}");

    if sink == SinkArg::Live {
        let names = &config.topics;
        for topic in [&names.persistent, &names.periodic, &names.aliases] {
            let latest = topics.latest(&topic.name)?.unwrap_or_default();
            println!(
                "{}\tbytes={}\tpublishes={}",
                topic.name,
                latest.len(),
                topics.publish_count(&topic.name)?
            );
        }
    } else {
        println!("log: {log_file}");
    }

    print!("{}", metrics.encode_text());
    Ok(())
}

fn pull(count: u32, interval_ms: u64, aliases: Option<&str>, devices: u8) -> Result<()> {
    let aliases = load_aliases(aliases)?;
    let driver = SimDriver::new()?;
    let handle = driver.handle();
    let mut accessor = session::start_external_with_aliases(driver, &aliases)?;

    for round in 0..count {
        feed(&handle, devices, round)?;
        thread::sleep(Duration::from_millis(interval_ms));
        let snapshot = accessor.pull()?;
        println!(
            "pull {round}\tpersistent={}\tperiodic={}\taliases={}",
            snapshot.persistent.len(),
            snapshot.periodic.len(),
            snapshot.aliases.len()
        );
    }
    Ok(())
}

fn aliases_cmd(file: &str) -> Result<()> {
    let table = session::load_alias_file(file)?;
    let bytes = table.encode()?;
    println!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Decoded {
    Persistent { records: Vec<PersistentRecord> },
    Periodic { records: Vec<PeriodicRecord> },
    Aliases { text: String },
    Raw { len: usize },
}

#[derive(Serialize)]
struct InspectLine<'a> {
    entry: &'a str,
    timestamp: String,
    #[serde(flatten)]
    decoded: Decoded,
}

fn decode_entry(type_string: &str, payload: &[u8]) -> Result<Decoded> {
    let topics = SinkTopics::default();
    let decoded = if type_string == topics.persistent.type_string {
        Decoded::Persistent {
            records: records::decode_persistent(payload)?,
        }
    } else if type_string == topics.periodic.type_string {
        Decoded::Periodic {
            records: records::decode_periodic(payload)?,
        }
    } else if type_string == topics.aliases.type_string {
        Decoded::Aliases {
            text: String::from_utf8_lossy(payload).into_owned(),
        }
    } else {
        Decoded::Raw { len: payload.len() }
    };
    Ok(decoded)
}

fn inspect(file: &str, json: bool) -> Result<()> {
    for record in telemetry_sink::read_records(file)? {
        let payload = record.payload()?;
        let decoded = decode_entry(&record.type_string, &payload)?;
        let timestamp = record
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_default();
        if json {
            let line = InspectLine {
                entry: &record.entry,
                timestamp,
                decoded,
            };
            println!("{}", serde_json::to_string(&line)?);
            continue;
        }
        match decoded {
            Decoded::Persistent { records } => {
                println!("{timestamp}\t{}\t{} records", record.entry, records.len());
                for r in records {
                    println!("  0x{:04X}\t{}", r.short_id, hex(&r.data));
                }
            }
            Decoded::Periodic { records } => {
                println!("{timestamp}\t{}\t{} records", record.entry, records.len());
                for r in records {
                    println!("  {}ms\t0x{:04X}\t{}", r.timestamp_ms, r.short_id, hex(&r.data));
                }
            }
            Decoded::Aliases { text } => println!("{timestamp}\t{}\t{text}", record.entry),
            Decoded::Raw { len } => println!("{timestamp}\t{}\t{len} bytes", record.entry),
        }
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::new();
    for b in bytes {
        let _ = core::fmt::Write::write_fmt(&mut out, format_args!("{:02X} ", b));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_defaults() {
        let cli = Cli::try_parse_from(["urcl", "run"]).unwrap();
        match cli.command {
            Commands::Run {
                sink, duration_ms, ..
            } => {
                assert_eq!(sink, SinkArg::Live);
                assert_eq!(duration_ms, 1000);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_entries_decode_as_raw() {
        let decoded = decode_entry("other", &[1, 2, 3]).unwrap();
        assert!(matches!(decoded, Decoded::Raw { len: 3 }));
    }

    #[test]
    fn periodic_entries_decode_records() {
        let rec = PeriodicRecord {
            timestamp_ms: 40,
            short_id: 0xB801,
            data: [0; 8],
        };
        let decoded = decode_entry("URCLr2_periodic", &rec.encode()).unwrap();
        match decoded {
            Decoded::Periodic { records } => assert_eq!(records, vec![rec]),
            _ => panic!("expected periodic records"),
        }
    }

    #[test]
    fn hex_formats_bytes() {
        assert_eq!(hex(&[0x0A, 0xFF]), "0A FF");
    }
}
