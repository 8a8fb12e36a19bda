use crate::{Result, SessionError};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Fixed-rate periodic task on a dedicated thread.
///
/// Ticks never overlap. A tick that overruns its slot skips the missed slots
/// instead of firing them back to back. Non-fatal tick errors are logged and
/// the schedule continues; a fatal error ends the thread and is returned by
/// [`Ticker::stop`].
pub struct Ticker {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<Result<u64>>>,
}

impl Ticker {
    pub fn spawn<F>(name: &str, period: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(SessionError::Config("tick period must be positive".into()));
        }
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let mut ticks = 0u64;
                let mut next = Instant::now() + period;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    match tick() {
                        Ok(()) => {}
                        Err(e) if e.is_fatal() => {
                            error!(ticker = %thread_name, error = %e, "tick failed, stopping");
                            return Err(e);
                        }
                        Err(e) => warn!(ticker = %thread_name, error = %e, "tick failed"),
                    }
                    ticks += 1;

                    next += period;
                    let now = Instant::now();
                    if next <= now {
                        let behind = now.duration_since(next).as_nanos();
                        let skipped = slots_behind(behind, period.as_nanos());
                        debug!(ticker = %thread_name, skipped, "tick overran its period");
                        next = period
                            .checked_mul(skipped)
                            .and_then(|jump| next.checked_add(jump))
                            .unwrap_or(now + period);
                    }
                }
                Ok(ticks)
            })
            .map_err(|e| SessionError::Ticker(e.to_string()))?;
        debug!(ticker = name, period_ms = period.as_millis() as u64, "ticker started");
        Ok(Self {
            name: name.to_string(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the thread has exited, e.g. after a fatal tick error.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(true)
    }

    /// Stop the schedule and wait for the running tick to finish. Returns the
    /// number of ticks run, or the fatal error that ended the schedule.
    pub fn stop(mut self) -> Result<u64> {
        self.shutdown()
    }

    /// Let the schedule run for the rest of the process.
    pub fn detach(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            std::mem::forget(tx);
        }
        self.handle.take();
    }

    fn shutdown(&mut self) -> Result<u64> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| SessionError::Ticker(format!("{} panicked", self.name)))?,
            None => Ok(0),
        }
    }
}

/// Whole periods to skip so the next deadline lands in the future.
fn slots_behind(behind_ns: u128, period_ns: u128) -> u32 {
    u32::try_from(behind_ns / period_ns.max(1))
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
