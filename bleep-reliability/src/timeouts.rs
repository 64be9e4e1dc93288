use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::time::Duration;

use crate::metrics::{MetricsRegistry, Outcome};
use crate::ReliabilityError;

/// The kind of IPC operation being timed. Each kind carries its own default
/// budget; everything not listed falls back to [`OperationKind::Default`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OperationKind {
    Connect,
    Disconnect,
    Pair,
    GetProperty,
    SetProperty,
    Read,
    Write,
    NotifyStart,
    NotifyStop,
    Default,
}

impl OperationKind {
    /// The default timeout budget for this operation kind.
    pub const fn default_timeout(self) -> Duration {
        match self {
            Self::Connect => Duration::from_secs(15),
            Self::Disconnect => Duration::from_secs(5),
            Self::Pair => Duration::from_secs(30),
            Self::GetProperty => Duration::from_secs(5),
            Self::SetProperty => Duration::from_secs(5),
            Self::Read => Duration::from_secs(10),
            Self::Write => Duration::from_secs(10),
            Self::NotifyStart => Duration::from_secs(5),
            Self::NotifyStop => Duration::from_secs(5),
            Self::Default => Duration::from_secs(10),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Pair => "pair",
            Self::GetProperty => "get-property",
            Self::SetProperty => "set-property",
            Self::Read => "read",
            Self::Write => "write",
            Self::NotifyStart => "notify-start",
            Self::NotifyStop => "notify-stop",
            Self::Default => "default",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs `future` under the default timeout budget for `kind`, recording a
/// latency/error sample into `metrics` regardless of outcome.
///
/// This is the uniform entry point every IPC call in the workspace should
/// be wrapped in.
pub async fn with_timeout<F, T, E>(
    metrics: &MetricsRegistry,
    kind: OperationKind,
    future: F,
) -> Result<T, ReliabilityError>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    with_timeout_duration(metrics, kind, kind.default_timeout(), future).await
}

/// As [`with_timeout`], but with an explicit budget instead of the kind's
/// default. Useful for the adapter's `ServicesResolving` cap, which is
/// configurable separately from the GATT per-call timeouts.
pub async fn with_timeout_duration<F, T, E>(
    metrics: &MetricsRegistry,
    kind: OperationKind,
    budget: Duration,
    future: F,
) -> Result<T, ReliabilityError>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let start = tokio::time::Instant::now();
    let outcome = tokio::time::timeout(budget, future).await;
    let elapsed = start.elapsed();
    match outcome {
        Ok(Ok(value)) => {
            metrics.record(kind, elapsed, Outcome::Success);
            Ok(value)
        }
        Ok(Err(err)) => {
            metrics.record(kind, elapsed, Outcome::Error);
            Err(ReliabilityError::Operation {
                kind,
                source: Box::new(err),
            })
        }
        Err(_) => {
            metrics.record(kind, elapsed, Outcome::Timeout);
            Err(ReliabilityError::OperationTimeout { kind, budget })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_match_spec() {
        assert_eq!(OperationKind::Connect.default_timeout(), Duration::from_secs(15));
        assert_eq!(OperationKind::Disconnect.default_timeout(), Duration::from_secs(5));
        assert_eq!(OperationKind::Pair.default_timeout(), Duration::from_secs(30));
        assert_eq!(OperationKind::GetProperty.default_timeout(), Duration::from_secs(5));
        assert_eq!(OperationKind::SetProperty.default_timeout(), Duration::from_secs(5));
        assert_eq!(OperationKind::Read.default_timeout(), Duration::from_secs(10));
        assert_eq!(OperationKind::Write.default_timeout(), Duration::from_secs(10));
        assert_eq!(OperationKind::NotifyStart.default_timeout(), Duration::from_secs(5));
        assert_eq!(OperationKind::NotifyStop.default_timeout(), Duration::from_secs(5));
        assert_eq!(OperationKind::Default.default_timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn successful_future_is_recorded() {
        let metrics = MetricsRegistry::new();
        let result: Result<u32, std::convert::Infallible> =
            with_timeout(&metrics, OperationKind::Read, async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(metrics.snapshot(OperationKind::Read).unwrap().sample_count, 1);
    }

    #[tokio::test]
    async fn slow_future_times_out() {
        let metrics = MetricsRegistry::new();
        let result: Result<(), std::convert::Infallible> = with_timeout_duration(
            &metrics,
            OperationKind::Read,
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(ReliabilityError::OperationTimeout { kind: OperationKind::Read, .. })
        ));
    }
}
