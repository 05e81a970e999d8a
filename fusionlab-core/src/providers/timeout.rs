//! Deadline wrapper for slow providers.
//!
//! Each prediction runs on its own worker thread and reports back over a
//! bounded channel. When the deadline passes first the caller gets
//! `ProviderError::Timeout`; the worker finishes in the background and its
//! result is dropped. Whether a bar times out depends on wall-clock speed, so
//! runs using this wrapper are only reproducible when no deadline is hit.

use super::{ProviderError, SignalContext, SignalProvider};
use crate::domain::{Signal, SourceId};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct TimeoutProvider<P> {
    inner: Arc<P>,
    timeout: Duration,
}

impl<P: SignalProvider + 'static> TimeoutProvider<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<P: SignalProvider + 'static> SignalProvider for TimeoutProvider<P> {
    fn source(&self) -> SourceId {
        self.inner.source()
    }

    fn lookback(&self) -> usize {
        self.inner.lookback()
    }

    fn predict(&self, ctx: &SignalContext) -> Result<Signal, ProviderError> {
        let (tx, rx) = bounded(1);
        let inner = Arc::clone(&self.inner);
        let worker_ctx = ctx.clone();
        let spawned = thread::Builder::new()
            .name(format!("provider-{}", self.source()))
            .spawn(move || {
                // Receiver may be gone after a timeout.
                let _ = tx.send(inner.predict(&worker_ctx));
            });
        if let Err(e) = spawned {
            return Err(ProviderError::Failed {
                source_id: self.source(),
                message: format!("could not spawn worker: {e}"),
            });
        }

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ProviderError::Timeout {
                source_id: self.source(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(ProviderError::Failed {
                source_id: self.source(),
                message: "worker exited without a result".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Action;
    use crate::providers::context_from_closes;

    struct Sleepy(Duration);

    impl SignalProvider for Sleepy {
        fn source(&self) -> SourceId {
            SourceId::model()
        }

        fn predict(&self, _ctx: &SignalContext) -> Result<Signal, ProviderError> {
            thread::sleep(self.0);
            Ok(Signal::buy(self.source(), 0.9))
        }
    }

    struct Panicky;

    impl SignalProvider for Panicky {
        fn source(&self) -> SourceId {
            SourceId::sentiment()
        }

        fn predict(&self, _ctx: &SignalContext) -> Result<Signal, ProviderError> {
            panic!("provider bug");
        }
    }

    #[test]
    fn fast_provider_passes_through() {
        let provider = TimeoutProvider::new(Sleepy(Duration::ZERO), Duration::from_secs(5));
        let signal = provider.predict(&context_from_closes(&[1.0])).unwrap();
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn slow_provider_times_out() {
        let provider = TimeoutProvider::new(Sleepy(Duration::from_millis(500)), Duration::from_millis(10));
        let err = provider.predict(&context_from_closes(&[1.0])).unwrap_err();
        assert_eq!(
            err,
            ProviderError::Timeout {
                source_id: SourceId::model(),
                timeout_ms: 10
            }
        );
    }

    #[test]
    fn panicking_provider_fails() {
        let provider = TimeoutProvider::new(Panicky, Duration::from_secs(5));
        let err = provider.predict(&context_from_closes(&[1.0])).unwrap_err();
        assert!(matches!(err, ProviderError::Failed { .. }));
    }
}
