//! Coalescing scheduler for the version probe.
//!
//! Tab-visibility events and periodic timers can fire version checks in
//! rapid bursts; the backend only needs to see one. `DebouncedProbe` holds
//! the first caller for a fixed quiescence window, runs the probe once, and
//! hands the shared outcome to every caller that arrived in the meantime.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{watch, Mutex};

/// Outcome of a version probe against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionProbe {
    /// Remote token matches the stored one; no refresh needed.
    Current,
    /// Remote token differs; a full fetch is required.
    Stale,
    /// The probe could not reach the backend.
    Unreachable,
}

pub(crate) struct DebouncedProbe {
    window: Duration,
    /// Present while a probe round is in flight; late callers subscribe here.
    slot: Mutex<Option<watch::Receiver<Option<VersionProbe>>>>,
}

impl DebouncedProbe {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slot: Mutex::new(None),
        }
    }

    /// Run `probe` after the quiescence window, or join the round already
    /// in flight. Exactly one probe executes per round; every caller gets
    /// the same outcome.
    pub async fn run<F>(&self, probe: F) -> VersionProbe
    where
        F: Future<Output = VersionProbe>,
    {
        let tx = {
            let mut slot = self.slot.lock().await;
            if let Some(rx) = slot.as_ref() {
                let mut rx = rx.clone();
                drop(slot);
                return match rx.wait_for(|outcome| outcome.is_some()).await {
                    Ok(outcome) => (*outcome).unwrap_or(VersionProbe::Unreachable),
                    // Leader dropped without completing; treat as unreachable
                    Err(_) => VersionProbe::Unreachable,
                };
            }
            let (tx, rx) = watch::channel(None);
            *slot = Some(rx);
            tx
        };

        tokio::time::sleep(self.window).await;
        let outcome = probe.await;

        *self.slot.lock().await = None;
        let _ = tx.send(Some(outcome));
        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_single_probe() {
        let debounce = Arc::new(DebouncedProbe::new(Duration::from_secs(1)));
        let probes = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let debounce = Arc::clone(&debounce);
            let probes = Arc::clone(&probes);
            handles.push(tokio::spawn(async move {
                debounce
                    .run(async move {
                        probes.fetch_add(1, Ordering::SeqCst);
                        VersionProbe::Stale
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.expect("join"), VersionProbe::Stale);
        }
        assert_eq!(probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rounds_after_completion_probe_again() {
        let debounce = DebouncedProbe::new(Duration::from_millis(10));
        let probes = AtomicUsize::new(0);

        for expected in [VersionProbe::Current, VersionProbe::Stale] {
            let outcome = debounce
                .run(async {
                    probes.fetch_add(1, Ordering::SeqCst);
                    expected
                })
                .await;
            assert_eq!(outcome, expected);
        }
        assert_eq!(probes.load(Ordering::SeqCst), 2);
    }
}
