//! Per-endpoint ledger and the final run report

use crate::error::ProbeFailure;
use crate::proxy::models::{CheckOutcome, EndpointRecord, Proxy, ProxyReport, RunSummary};
use crate::proxy::parser::RejectedLine;
use crate::proxy::speed::SpeedCategory;

#[derive(Debug, Clone)]
struct LedgerEntry {
    endpoint: Proxy,
    latest: Option<CheckOutcome>,
    attempts_used: u32,
}

/// Running record of every endpoint's attempts
///
/// Owned by whoever drives the passes; outcomes are applied between passes,
/// never from inside probe tasks.
#[derive(Debug, Clone)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new(endpoints: Vec<Proxy>) -> Self {
        let entries = endpoints
            .into_iter()
            .map(|endpoint| LedgerEntry {
                endpoint,
                latest: None,
                attempts_used: 0,
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every endpoint with its index, in input order
    pub fn endpoints(&self) -> Vec<(usize, Proxy)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index, entry.endpoint.clone()))
            .collect()
    }

    /// Endpoints whose latest attempt failed, in input order
    pub fn failed_endpoints(&self) -> Vec<(usize, Proxy)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches!(&entry.latest, Some(outcome) if !outcome.reachable))
            .map(|(index, entry)| (index, entry.endpoint.clone()))
            .collect()
    }

    /// Apply one attempt; the latest attempt always replaces earlier ones
    pub fn record(&mut self, outcome: CheckOutcome) {
        if let Some(entry) = self.entries.get_mut(outcome.index) {
            entry.attempts_used += 1;
            entry.latest = Some(outcome);
        }
    }

    pub fn record_all<I: IntoIterator<Item = CheckOutcome>>(&mut self, outcomes: I) {
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    /// Close the ledger; categories and speed exclusions are filled in later
    pub fn finalize(self) -> Vec<EndpointRecord> {
        self.entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let never_attempted = || CheckOutcome::failed(index, 0, ProbeFailure::Cancelled);
                EndpointRecord {
                    endpoint: entry.endpoint,
                    final_outcome: entry.latest.unwrap_or_else(never_attempted),
                    attempts_used: entry.attempts_used,
                    speed_category: SpeedCategory::Unknown,
                    excluded_by_speed_filter: false,
                }
            })
            .collect()
    }
}

/// Everything a run produced, ready to hand to a persistence layer
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub summary: RunSummary,
    /// Canonical strings of working endpoints, input order
    pub working: Vec<String>,
    /// Records of the working endpoints, input order
    pub details: Vec<EndpointRecord>,
    /// Records of every parsed endpoint, input order
    pub records: Vec<EndpointRecord>,
    pub rejected: Vec<RejectedLine>,
}

impl RunReport {
    /// Structured entries for the working endpoints
    pub fn working_reports(&self) -> Vec<ProxyReport> {
        self.details.iter().map(EndpointRecord::to_report).collect()
    }
}

/// Turns finalized records into summary counts and output views
pub struct Aggregator;

impl Aggregator {
    pub fn aggregate(records: Vec<EndpointRecord>, rejected: Vec<RejectedLine>) -> RunReport {
        let summary = Self::summarize(&records, rejected.len());
        let details: Vec<EndpointRecord> = records
            .iter()
            .filter(|record| record.is_working())
            .cloned()
            .collect();
        let working = details.iter().map(|record| record.endpoint.url()).collect();

        RunReport {
            summary,
            working,
            details,
            records,
            rejected,
        }
    }

    pub fn summarize(records: &[EndpointRecord], rejected_lines: usize) -> RunSummary {
        let mut summary = RunSummary {
            total_input: records.len(),
            rejected_lines,
            ..Default::default()
        };

        for record in records {
            if !record.final_outcome.reachable {
                summary.failing += 1;
            } else if record.excluded_by_speed_filter {
                summary.excluded_by_speed_filter += 1;
            } else {
                summary.working += 1;
            }

            match record.speed_category {
                SpeedCategory::Fast => summary.fast += 1,
                SpeedCategory::Medium => summary.medium += 1,
                SpeedCategory::Slow => summary.slow += 1,
                SpeedCategory::Unknown => summary.unknown += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::proxy::models::{ProbeResult, ProxyType};
    use std::time::Duration;

    fn proxies(count: usize) -> Vec<Proxy> {
        (0..count)
            .map(|i| Proxy::new(format!("10.0.0.{}", i), 8080, ProxyType::Http))
            .collect()
    }

    fn working(index: usize, attempt: u32, ms: u64) -> CheckOutcome {
        let probe = ProbeResult::working(Duration::from_millis(ms));
        CheckOutcome::from_probe(index, attempt, probe)
    }

    fn failing(index: usize, attempt: u32) -> CheckOutcome {
        CheckOutcome::failed(index, attempt, ProbeFailure::Timeout(Duration::from_secs(1)))
    }

    fn failed_indices(ledger: &Ledger) -> Vec<usize> {
        ledger
            .failed_endpoints()
            .iter()
            .map(|(index, _)| *index)
            .collect()
    }

    #[test]
    fn test_failed_endpoints_tracks_latest_attempt() {
        let mut ledger = Ledger::new(proxies(3));
        assert!(ledger.failed_endpoints().is_empty());

        ledger.record_all(vec![working(0, 1, 100), failing(1, 1), failing(2, 1)]);
        assert_eq!(failed_indices(&ledger), vec![1, 2]);

        ledger.record(working(2, 2, 300));
        assert_eq!(failed_indices(&ledger), vec![1]);
    }

    #[test]
    fn test_final_outcome_is_last_attempt() {
        let mut ledger = Ledger::new(proxies(1));
        ledger.record(failing(0, 1));
        ledger.record(working(0, 2, 150));
        ledger.record(failing(0, 3));

        let records = ledger.finalize();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attempts_used, 3);
        assert_eq!(records[0].final_outcome.attempt, 3);
        assert!(!records[0].final_outcome.reachable);
    }

    #[test]
    fn test_unattempted_entry_is_explicitly_failed() {
        let records = Ledger::new(proxies(1)).finalize();
        assert!(!records[0].final_outcome.reachable);
        assert_eq!(
            records[0].final_outcome.failure,
            Some(ProbeFailure::Cancelled)
        );
        assert_eq!(records[0].attempts_used, 0);
    }

    #[test]
    fn test_aggregate_counts_and_views() {
        let mut ledger = Ledger::new(proxies(4));
        ledger.record_all(vec![
            working(0, 1, 100),
            failing(1, 1),
            working(2, 1, 700),
            working(3, 1, 1500),
        ]);
        let mut records = ledger.finalize();
        records[0].speed_category = SpeedCategory::Fast;
        records[2].speed_category = SpeedCategory::Medium;
        records[2].excluded_by_speed_filter = true;
        records[3].speed_category = SpeedCategory::Slow;

        let rejected = vec![RejectedLine {
            line_number: 9,
            content: "junk".to_string(),
            error: ParseError::MissingPort("junk".to_string()),
        }];
        let report = Aggregator::aggregate(records, rejected);

        assert_eq!(
            report.working,
            vec!["http://10.0.0.0:8080", "http://10.0.0.3:8080"]
        );
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.records.len(), 4);
        assert_eq!(
            report.summary,
            RunSummary {
                total_input: 4,
                rejected_lines: 1,
                working: 2,
                failing: 1,
                excluded_by_speed_filter: 1,
                fast: 1,
                medium: 1,
                slow: 1,
                unknown: 1,
            }
        );

        let reports = report.working_reports();
        assert_eq!(reports[1].speed, Some(1500));
        assert_eq!(reports[1].category, SpeedCategory::Slow);
    }
}
