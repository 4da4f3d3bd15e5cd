//! Validation engine tying the parser, scheduler, retries and speed filter together

use crate::config::RunConfiguration;
use crate::error::{ConfigError, ProbeFailure};
use crate::proxy::aggregator::{Aggregator, Ledger, RunReport};
use crate::proxy::checker::ProxyChecker;
use crate::proxy::models::{ProbeResult, Proxy};
use crate::proxy::parser::{ParsedInput, ProxyParser};
use crate::proxy::retry::RetryCoordinator;
use crate::proxy::scheduler::{BoundedScheduler, ProbeFn, ProgressUpdate};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Validates batches of proxies under one [`RunConfiguration`]
pub struct ProxyValidator {
    config: Arc<RunConfiguration>,
    checker: ProxyChecker,
    progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl ProxyValidator {
    /// Create a validator that probes through reqwest
    pub fn new(config: RunConfiguration) -> Result<Self, ConfigError> {
        Self::with_checker(config, ProxyChecker::new())
    }

    /// Create a validator with a custom checker
    ///
    /// The configuration is validated here, before any probing can start.
    pub fn with_checker(
        config: RunConfiguration,
        checker: ProxyChecker,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            checker,
            progress: None,
        })
    }

    /// Receive progress updates for every pass
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Parse raw proxy lines and validate every endpoint that parsed
    pub async fn validate_text(&self, content: &str) -> RunReport {
        self.validate_parsed(ProxyParser::parse_string(content)).await
    }

    /// Validate already-parsed endpoints
    pub async fn validate(&self, proxies: Vec<Proxy>) -> RunReport {
        self.validate_parsed(ParsedInput {
            proxies,
            rejected: Vec::new(),
        })
        .await
    }

    /// Validate endpoints, carrying rejected lines through to the report
    pub async fn validate_parsed(&self, input: ParsedInput) -> RunReport {
        let mut scheduler = BoundedScheduler::new(
            self.config.concurrency_limit,
            self.config.wave_deadline(),
        );
        if let Some(sender) = &self.progress {
            scheduler = scheduler.with_progress(sender.clone());
        }

        info!(
            proxies = input.proxies.len(),
            rejected = input.rejected.len(),
            concurrency = scheduler.concurrency_limit(),
            timeout = ?self.config.per_check_timeout,
            retries = self.config.retry_count,
            "starting proxy validation"
        );

        let mut ledger = Ledger::new(input.proxies);
        RetryCoordinator::new(self.config.retry_count)
            .run(&scheduler, &mut ledger, self.probe_fn())
            .await;

        let mut records = ledger.finalize();
        self.config.speed_filter.apply(&mut records);
        let report = Aggregator::aggregate(records, input.rejected);

        info!(
            total = report.summary.total_input,
            working = report.summary.working,
            failing = report.summary.failing,
            excluded = report.summary.excluded_by_speed_filter,
            "proxy validation finished"
        );
        report
    }

    /// One probe: pick a target, then run the checker with the per-check timeout
    fn probe_fn(&self) -> ProbeFn {
        let checker = self.checker.clone();
        let config = Arc::clone(&self.config);

        Arc::new(move |proxy: Proxy| {
            let checker = checker.clone();
            let timeout = config.per_check_timeout;
            let target = config.pick_target().map(str::to_owned);
            async move {
                match target {
                    Some(target) => checker.probe(&proxy, &target, timeout).await,
                    None => ProbeResult::failed(ProbeFailure::Client(
                        "no test target configured".to_string(),
                    )),
                }
            }
            .boxed()
        })
    }
}
