//! Retry passes over endpoints that failed

use crate::proxy::aggregator::Ledger;
use crate::proxy::scheduler::{BoundedScheduler, ProbeFn};
use std::sync::Arc;
use tracing::{debug, info};

/// Runs the initial pass and then up to `retry_count` retry passes
///
/// Each retry pass starts only after the previous pass has fully finished and
/// goes through the same scheduler, so retries share the concurrency cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryCoordinator {
    retry_count: u32,
}

impl RetryCoordinator {
    pub fn new(retry_count: u32) -> Self {
        Self { retry_count }
    }

    /// Most attempts any single endpoint can receive
    pub fn max_attempts(&self) -> u32 {
        self.retry_count + 1
    }

    pub async fn run(&self, scheduler: &BoundedScheduler, ledger: &mut Ledger, probe: ProbeFn) {
        if ledger.is_empty() {
            debug!("no proxies to validate");
            return;
        }

        info!(total = ledger.len(), "starting initial pass");
        let outcomes = scheduler.run(ledger.endpoints(), 1, Arc::clone(&probe)).await;
        ledger.record_all(outcomes);

        for attempt in 2..=self.max_attempts() {
            let failed = ledger.failed_endpoints();
            if failed.is_empty() {
                break;
            }

            info!(attempt, count = failed.len(), "retrying failed proxies");
            let outcomes = scheduler.run(failed, attempt, Arc::clone(&probe)).await;
            ledger.record_all(outcomes);
        }
    }
}
