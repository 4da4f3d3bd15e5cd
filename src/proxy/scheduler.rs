//! Bounded scheduler that drives probes through a token pool in waves

use crate::error::ProbeFailure;
use crate::proxy::models::{CheckOutcome, ProbeResult, Proxy};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Completions between progress reports
pub const PROGRESS_INTERVAL: usize = 10;

/// Probe run by the scheduler for each endpoint
pub type ProbeFn = Arc<dyn Fn(Proxy) -> BoxFuture<'static, ProbeResult> + Send + Sync>;

/// Progress of one pass over the endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub attempt: u32,
    pub completed: usize,
    pub total: usize,
}

impl ProgressUpdate {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.completed as f64 / self.total as f64 * 100.0).round() as u32
    }
}

/// Caps in-flight probes at `concurrency_limit`
///
/// Tokens come from a fair semaphore, so waiting probes acquire them in
/// submission order. The same pool is shared by every pass this scheduler
/// runs.
pub struct BoundedScheduler {
    concurrency_limit: usize,
    wave_deadline: Duration,
    tokens: Arc<Semaphore>,
    progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl BoundedScheduler {
    pub fn new(concurrency_limit: usize, wave_deadline: Duration) -> Self {
        let concurrency_limit = concurrency_limit.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            concurrency_limit,
            wave_deadline,
            tokens: Arc::new(Semaphore::new(concurrency_limit)),
            progress: None,
        }
    }

    /// Send progress updates to `sender` as well as the log
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Probe every endpoint once
    ///
    /// `endpoints` pairs each proxy with its index in the run. The returned
    /// outcomes line up with `endpoints` position for position, whatever
    /// order the probes completed in.
    pub async fn run(
        &self,
        endpoints: Vec<(usize, Proxy)>,
        attempt: u32,
        probe: ProbeFn,
    ) -> Vec<CheckOutcome> {
        let total = endpoints.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0;

        for wave in endpoints.chunks(self.concurrency_limit) {
            let wave_outcomes = self
                .run_wave(wave, attempt, &probe, &mut completed, total)
                .await;
            outcomes.extend(wave_outcomes);
        }

        outcomes
    }

    async fn run_wave(
        &self,
        wave: &[(usize, Proxy)],
        attempt: u32,
        probe: &ProbeFn,
        completed: &mut usize,
        total: usize,
    ) -> Vec<CheckOutcome> {
        let mut slots: Vec<Option<ProbeResult>> = vec![None; wave.len()];
        let mut tasks = JoinSet::new();

        for (slot, (_, proxy)) in wave.iter().enumerate() {
            let tokens = Arc::clone(&self.tokens);
            let probe = Arc::clone(probe);
            let proxy = proxy.clone();
            tasks.spawn(async move {
                // Released when the task finishes or is aborted
                let Ok(_token) = tokens.acquire_owned().await else {
                    return (slot, ProbeResult::failed(ProbeFailure::Cancelled));
                };
                (slot, probe(proxy).await)
            });
        }

        let deadline = tokio::time::sleep(self.wave_deadline);
        tokio::pin!(deadline);
        let mut timed_out = false;

        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(Ok((slot, result))) => {
                        slots[slot] = Some(result);
                        *completed += 1;
                        self.report(attempt, *completed, total);
                    }
                    Some(Err(e)) => warn!(error = %e, "probe task ended abnormally"),
                    None => break,
                },
                _ = &mut deadline => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            warn!(
                outstanding = tasks.len(),
                deadline = ?self.wave_deadline,
                "wave deadline reached, abandoning outstanding probes"
            );
            tasks.shutdown().await;
        }

        wave.iter()
            .zip(slots)
            .map(|((index, _), slot)| match slot {
                Some(result) => CheckOutcome::from_probe(*index, attempt, result),
                None => {
                    *completed += 1;
                    self.report(attempt, *completed, total);
                    let failure = if timed_out {
                        ProbeFailure::WaveTimeout
                    } else {
                        ProbeFailure::Cancelled
                    };
                    CheckOutcome::failed(*index, attempt, failure)
                }
            })
            .collect()
    }

    fn report(&self, attempt: u32, completed: usize, total: usize) {
        if completed % PROGRESS_INTERVAL != 0 && completed != total {
            return;
        }

        let update = ProgressUpdate {
            attempt,
            completed,
            total,
        };
        info!(
            attempt,
            "Progress: {}/{} ({}%)",
            completed,
            total,
            update.percent()
        );
        if let Some(sender) = &self.progress {
            // The receiver may have gone away; progress is advisory
            let _ = sender.send(update);
        }
    }
}
