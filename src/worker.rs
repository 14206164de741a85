// File: worker.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::ProbeError;
use crate::http::{ProbeOutcome, Prober};
use crate::target::Target;
use crate::trace::DebugTrace;
use log::{debug, error, trace};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// tokio channels cannot be zero-sized; one slot is the closest to a hand-off.
pub const RESULT_CHANNEL_CAPACITY: usize = 1;

/// Terminal outcome for one consumed target.
#[derive(Debug)]
pub struct ScanResult {
    pub input: String,
    pub url: Option<Url>,
    pub outcome: Result<ProbeOutcome, ProbeError>,
    pub debug: Option<DebugTrace>,
}

impl ScanResult {
    pub fn is_vulnerable(&self) -> bool {
        matches!(self.outcome, Ok(ProbeOutcome { vulnerable: true, .. }))
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.outcome.as_ref().err()
    }

    /// The probed URL, or the raw input line for targets that never parsed.
    pub fn display_target(&self) -> &str {
        self.url.as_ref().map_or(self.input.as_str(), |u| u.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        WorkerPool {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawns the workers and returns the merged result stream.
    ///
    /// Every target taken off `targets` yields exactly one [`ScanResult`]. The
    /// stream closes once all workers have exited, either because `targets`
    /// ran dry or because `cancel` fired. Results arrive in completion order.
    pub fn run<P: Prober>(
        &self,
        cancel: CancellationToken,
        targets: mpsc::Receiver<Target>,
        prober: Arc<P>,
    ) -> mpsc::Receiver<ScanResult> {
        let (result_tx, result_rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let targets = Arc::new(Mutex::new(targets));

        let mut set = JoinSet::new();
        for id in 0..self.workers {
            set.spawn(work(
                id,
                cancel.clone(),
                Arc::clone(&targets),
                Arc::clone(&prober),
                result_tx.clone(),
            ));
        }
        // Workers own the only senders left, so the stream ends when the last one exits.
        drop(result_tx);

        let workers = self.workers;
        tokio::spawn(async move {
            while let Some(joined) = set.join_next().await {
                if let Err(e) = joined {
                    error!("Worker task failed: {}", e);
                }
            }
            debug!("All {} workers finished", workers);
        });

        result_rx
    }
}

async fn next_target(
    cancel: &CancellationToken,
    targets: &Mutex<mpsc::Receiver<Target>>,
) -> Option<Target> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        target = async { targets.lock().await.recv().await } => target,
    }
}

async fn work<P: Prober>(
    id: usize,
    cancel: CancellationToken,
    targets: Arc<Mutex<mpsc::Receiver<Target>>>,
    prober: Arc<P>,
    results: mpsc::Sender<ScanResult>,
) {
    trace!("Worker {} started", id);

    while let Some(target) = next_target(&cancel, &targets).await {
        let (input, parsed) = target.into_parts();

        let result = match parsed {
            Err(e) => ScanResult {
                input,
                url: None,
                outcome: Err(ProbeError::InvalidTarget(e)),
                debug: None,
            },
            Ok(url) => {
                let report = prober.probe(&cancel, &url).await;
                ScanResult {
                    input,
                    url: Some(url),
                    outcome: report.outcome,
                    debug: report.debug,
                }
            }
        };

        if results.send(result).await.is_err() {
            debug!("Worker {}: result receiver dropped", id);
            break;
        }
    }

    trace!("Worker {} exiting", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ProbeReport;
    use crate::target::{TargetError, DEFAULT_PATH_SUFFIX};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProber {
        calls: AtomicUsize,
    }

    impl Prober for CountingProber {
        async fn probe(&self, _cancel: &CancellationToken, url: &Url) -> ProbeReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ProbeReport {
                outcome: Ok(ProbeOutcome {
                    vulnerable: url.host_str() == Some("vulnerable.test"),
                    status: 200,
                }),
                debug: None,
            }
        }
    }

    #[test]
    fn test_pool_needs_at_least_one_worker() {
        assert_eq!(WorkerPool::new(0).workers(), 1);
        assert_eq!(WorkerPool::new(8).workers(), 8);
    }

    #[tokio::test]
    async fn test_invalid_target_never_reaches_prober() {
        let prober = Arc::new(CountingProber::default());
        let (tx, rx) = mpsc::channel(4);
        tx.send(Target::invalid("bad line", TargetError::Empty))
            .await
            .unwrap();
        drop(tx);

        let mut results = WorkerPool::new(2).run(CancellationToken::new(), rx, Arc::clone(&prober));

        let result = results.recv().await.unwrap();
        assert!(matches!(
            result.outcome,
            Err(ProbeError::InvalidTarget(TargetError::Empty))
        ));
        assert_eq!(result.display_target(), "bad line");
        assert!(results.recv().await.is_none());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_result_carries_classification() {
        let prober = Arc::new(CountingProber::default());
        let (tx, rx) = mpsc::channel(4);
        tx.send(Target::parse("vulnerable.test", DEFAULT_PATH_SUFFIX))
            .await
            .unwrap();
        drop(tx);

        let mut results = WorkerPool::new(1).run(CancellationToken::new(), rx, prober);
        let result = results.recv().await.unwrap();

        assert!(result.is_vulnerable());
        assert!(result.error().is_none());
        assert_eq!(
            result.display_target(),
            "https://vulnerable.test/.git/config"
        );
    }

    #[tokio::test]
    async fn test_closed_input_closes_output() {
        let (tx, rx) = mpsc::channel::<Target>(1);
        drop(tx);

        let mut results = WorkerPool::new(4).run(
            CancellationToken::new(),
            rx,
            Arc::new(CountingProber::default()),
        );
        assert!(results.recv().await.is_none());
    }
}
