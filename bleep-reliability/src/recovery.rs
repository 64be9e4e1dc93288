use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use log::{info, warn};

/// Which stage of the staged recovery pipeline produced a given attempt.
/// Stages escalate in order; a caller walks the list and stops at the
/// first one that reports success.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecoveryStage {
    DisconnectReconnect,
    RecreateProxy,
    PowerCycleAdapter,
    ResetController,
    RestartDaemon,
}

impl RecoveryStage {
    pub const ALL: [RecoveryStage; 5] = [
        RecoveryStage::DisconnectReconnect,
        RecoveryStage::RecreateProxy,
        RecoveryStage::PowerCycleAdapter,
        RecoveryStage::ResetController,
        RecoveryStage::RestartDaemon,
    ];

    fn backoff(self) -> ExponentialBackoff {
        let (initial, max, max_elapsed) = match self {
            RecoveryStage::DisconnectReconnect => {
                (Duration::from_millis(200), Duration::from_secs(2), Duration::from_secs(10))
            }
            RecoveryStage::RecreateProxy => {
                (Duration::from_millis(500), Duration::from_secs(5), Duration::from_secs(20))
            }
            RecoveryStage::PowerCycleAdapter => {
                (Duration::from_secs(1), Duration::from_secs(10), Duration::from_secs(30))
            }
            RecoveryStage::ResetController => {
                (Duration::from_secs(2), Duration::from_secs(15), Duration::from_secs(45))
            }
            RecoveryStage::RestartDaemon => {
                (Duration::from_secs(5), Duration::from_secs(30), Duration::from_secs(90))
            }
        };
        ExponentialBackoff {
            initial_interval: initial,
            max_interval: max,
            max_elapsed_time: Some(max_elapsed),
            ..ExponentialBackoff::default()
        }
    }
}

/// What the pipeline was trying to preserve across a recovery attempt.
/// Carried so that after a `RecreateProxy` or deeper stage the caller knows
/// which characteristics it needs to re-subscribe to.
#[derive(Clone, Debug, Default)]
pub struct RecoveryIntent {
    pub adapter_path: String,
    pub device_path: Option<String>,
    pub subscribed_characteristics: Vec<String>,
}

/// One attempt's outcome within the staged pipeline.
#[derive(Clone, Debug)]
pub struct RecoveryOutcome {
    pub stage: RecoveryStage,
    pub succeeded: bool,
    pub attempts: u32,
}

/// Runs `action` for a single recovery stage with that stage's own backoff,
/// retrying until `action` succeeds or the stage's `max_elapsed_time` is
/// exhausted.
pub async fn run_stage<F, Fut, T, E>(
    stage: RecoveryStage,
    intent: &RecoveryIntent,
    mut action: F,
) -> (RecoveryOutcome, Option<T>)
where
    F: FnMut(&RecoveryIntent) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut backoff = stage.backoff();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match action(intent).await {
            Ok(value) => {
                info!("recovery stage {:?} succeeded after {} attempt(s)", stage, attempts);
                return (
                    RecoveryOutcome {
                        stage,
                        succeeded: true,
                        attempts,
                    },
                    Some(value),
                );
            }
            Err(err) => {
                warn!("recovery stage {:?} attempt {} failed: {}", stage, attempts, err);
                match backoff.next_backoff() {
                    Some(wait) => tokio::time::sleep(wait).await,
                    None => {
                        return (
                            RecoveryOutcome {
                                stage,
                                succeeded: false,
                                attempts,
                            },
                            None,
                        );
                    }
                }
            }
        }
    }
}

/// Walks `RecoveryStage::ALL` in order, invoking `dispatch` for each until
/// one succeeds or the list is exhausted. `dispatch` is responsible for
/// performing the stage-specific action (BlueZ calls, daemon restart, etc.)
/// and returning whether it worked; this function only owns the escalation
/// order and per-stage backoff/retry policy.
pub async fn escalate<F, Fut>(
    intent: &RecoveryIntent,
    mut dispatch: F,
) -> Vec<RecoveryOutcome>
where
    F: FnMut(RecoveryStage, &RecoveryIntent) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let mut outcomes = Vec::new();
    for stage in RecoveryStage::ALL {
        let (outcome, _) = run_stage(stage, intent, |intent| dispatch(stage, intent)).await;
        let succeeded = outcome.succeeded;
        outcomes.push(outcome);
        if succeeded {
            break;
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn stage_succeeds_on_first_try() {
        let intent = RecoveryIntent::default();
        let (outcome, value) = run_stage(
            RecoveryStage::DisconnectReconnect,
            &intent,
            |_| async { Ok::<_, String>(7) },
        )
        .await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn escalation_stops_at_first_success() {
        let intent = RecoveryIntent::default();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let outcomes = escalate(&intent, move |stage, _| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if stage == RecoveryStage::RecreateProxy {
                    Ok(())
                } else {
                    Err("still broken".to_string())
                }
            }
        })
        .await;
        assert_eq!(outcomes.last().unwrap().stage, RecoveryStage::RecreateProxy);
        assert!(outcomes.last().unwrap().succeeded);
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
