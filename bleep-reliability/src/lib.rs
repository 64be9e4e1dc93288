//! Timeout budgets, latency/error metrics, heartbeat health monitoring, and
//! staged recovery for every IPC call BLEEP makes against BlueZ. Every other
//! crate in the workspace routes its D-Bus calls through
//! [`with_timeout`]/[`with_timeout_duration`] rather than calling
//! `tokio::time::timeout` directly, so that latency and failure data ends up
//! in one [`MetricsRegistry`].

mod error;
mod health;
mod metrics;
mod recovery;
mod timeouts;

pub use error::ReliabilityError;
pub use health::{HealthEvent, HealthMonitor};
pub use metrics::{MetricIssue, MetricsRegistry, MetricsSnapshot, Outcome};
pub use recovery::{escalate, run_stage, RecoveryIntent, RecoveryOutcome, RecoveryStage};
pub use timeouts::{with_timeout, with_timeout_duration, OperationKind};
