use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use log::{info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Events emitted by a [`HealthMonitor`] as it watches an adapter's
/// heartbeat.
#[derive(Clone, Debug)]
pub enum HealthEvent {
    /// The heartbeat succeeded after one or more failures.
    Recovered { after_failures: u32 },
    /// The heartbeat has failed `consecutive_failures` times in a row.
    Stalled { consecutive_failures: u32 },
    /// A heartbeat failure triggered a recovery attempt, which this event
    /// reports the outcome of.
    RecoveryAttempted { succeeded: bool },
    /// The adapter's availability bit flipped.
    AvailabilityChanged { available: bool },
}

/// Periodic heartbeat monitor. Calls a user-supplied probe (typically
/// `GetManagedObjects` against the adapter's proxy) on a fixed cadence,
/// backing off exponentially while it keeps failing, and reports state
/// transitions on an mpsc channel.
pub struct HealthMonitor {
    heartbeat_interval: Duration,
    max_backoff: Duration,
    stall_threshold: u32,
}

impl HealthMonitor {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            heartbeat_interval,
            max_backoff: Duration::from_secs(60),
            stall_threshold: 3,
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_stall_threshold(mut self, stall_threshold: u32) -> Self {
        self.stall_threshold = stall_threshold;
        self
    }

    /// Runs the heartbeat loop until `probe` is no longer needed. `probe` is
    /// invoked fresh on every tick since each heartbeat should be an
    /// independent IPC call, not a retried future.
    pub async fn run<F, Fut, E>(&self, probe: F, events: mpsc::Sender<HealthEvent>)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.heartbeat_interval,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        let mut consecutive_failures: u32 = 0;
        let mut last_available = true;

        loop {
            let started = Instant::now();
            match probe().await {
                Ok(()) => {
                    if consecutive_failures > 0 {
                        info!(
                            "heartbeat recovered after {} failures",
                            consecutive_failures
                        );
                        let _ = events
                            .send(HealthEvent::Recovered {
                                after_failures: consecutive_failures,
                            })
                            .await;
                    }
                    if !last_available {
                        last_available = true;
                        let _ = events
                            .send(HealthEvent::AvailabilityChanged { available: true })
                            .await;
                    }
                    consecutive_failures = 0;
                    backoff.reset();
                    let elapsed = started.elapsed();
                    let remaining = self.heartbeat_interval.saturating_sub(elapsed);
                    tokio::time::sleep(remaining).await;
                }
                Err(err) => {
                    consecutive_failures += 1;
                    warn!("heartbeat failed ({}): {}", consecutive_failures, err);
                    if last_available && consecutive_failures >= self.stall_threshold {
                        last_available = false;
                        let _ = events
                            .send(HealthEvent::AvailabilityChanged { available: false })
                            .await;
                    }
                    if consecutive_failures >= self.stall_threshold {
                        let _ = events
                            .send(HealthEvent::Stalled {
                                consecutive_failures,
                            })
                            .await;
                    }
                    let wait = backoff.next_backoff().unwrap_or(self.max_backoff);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn reports_stalled_after_threshold() {
        let monitor = HealthMonitor::new(Duration::from_millis(1))
            .with_max_backoff(Duration::from_millis(2))
            .with_stall_threshold(2);
        let (tx, mut rx) = mpsc::channel(16);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let handle = tokio::spawn(async move {
            monitor
                .run(
                    move || {
                        let calls = calls_clone.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Err::<(), String>("adapter unreachable".to_string())
                        }
                    },
                    tx,
                )
                .await;
        });

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open");
        assert!(matches!(event, HealthEvent::AvailabilityChanged { available: false }));

        handle.abort();
    }
}
