use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::ClassicError;

/// Checks whether a Bluetooth address is reachable before attempting connectionless SDP.
/// Abstracted behind a trait so tests can substitute a fake without spawning `l2ping`.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self, mac: &str) -> bool;
}

/// Pings via the system's `l2ping` (from `bluez-utils`), the same tool BlueZ's own tooling uses
/// for L2CAP echo reachability checks.
pub struct L2Ping;

#[async_trait]
impl Pinger for L2Ping {
    async fn ping(&self, mac: &str) -> bool {
        let Ok(output) = Command::new("l2ping")
            .args(["-c", "1", "-t", "1", mac])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        else {
            return false;
        };
        output.success()
    }
}

/// Runs up to `attempts` pings (default 3, capped to an overall `budget` of 13s), returning as
/// soon as one succeeds.
pub async fn check_reachable(
    pinger: &dyn Pinger,
    mac: &str,
    attempts: u32,
    budget: Duration,
) -> Result<(), ClassicError> {
    let outcome = timeout(budget, async {
        for _ in 0..attempts {
            if pinger.ping(mac).await {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    if outcome {
        Ok(())
    } else {
        Err(ClassicError::Unreachable { attempts })
    }
}

pub const DEFAULT_PING_ATTEMPTS: u32 = 3;
pub const DEFAULT_PING_BUDGET: Duration = Duration::from_secs(13);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyPinger {
        succeed_on: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Pinger for FlakyPinger {
        async fn ping(&self, _mac: &str) -> bool {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            n >= self.succeed_on
        }
    }

    #[tokio::test]
    async fn succeeds_once_pinger_responds() {
        let pinger = FlakyPinger { succeed_on: 2, calls: AtomicU32::new(0) };
        let result = check_reachable(&pinger, "aa:bb:cc:dd:ee:ff", 3, Duration::from_secs(1)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn fails_after_exhausting_attempts() {
        let pinger = FlakyPinger { succeed_on: 99, calls: AtomicU32::new(0) };
        let result = check_reachable(&pinger, "aa:bb:cc:dd:ee:ff", 3, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ClassicError::Unreachable { attempts: 3 })));
    }
}
