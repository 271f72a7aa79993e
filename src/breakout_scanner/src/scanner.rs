//! The scan pipeline: reports, reconciliation, liquidity filter, history and
//! detection.
//!
//! Only a reconciliation precondition failure aborts a scan. An unavailable
//! report leaves the universe empty, and per-security failures end up as
//! [`Outcome::NoData`] entries of the [`ScanReport`].

use std::{collections::BTreeSet, sync::Arc};

use futures::{StreamExt, stream};
use market_data_ingestor::{
    errors::ReconcileError,
    models::report::{CombinedRecord, ReportKind},
    providers::{HistoryProvider, ReportProvider, load_report},
    reconcile::reconcile,
};
use tracing::{info, warn};

use crate::{
    backoff::BackoffGate,
    config::ScanConfig,
    detector::{ExplosiveMoveDetector, RejectReason, Verdict},
    retriever::{NoData, SeriesRetriever},
};

/// Securities that survived reconciliation and the liquidity filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universe {
    /// Reports that could not be loaded. Non-empty means `securities` is empty.
    pub missing_reports: Vec<ReportKind>,
    /// Securities present in both reports.
    pub reconciled: usize,
    /// Liquid securities, in daily-report order.
    pub securities: Vec<CombinedRecord>,
}

/// Final state of one security.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The detector accepted the security.
    Candidate,
    /// The detector rejected the security.
    Rejected(RejectReason),
    /// Everything but the moving-average check passed.
    Indeterminate,
    /// No snapshot could be built.
    NoData(NoData),
}

impl From<Verdict> for Outcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => Outcome::Candidate,
            Verdict::Rejected(reason) => Outcome::Rejected(reason),
            Verdict::Indeterminate => Outcome::Indeterminate,
        }
    }
}

/// A security and what became of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityResult {
    /// Report data for the security.
    pub record: CombinedRecord,
    /// Detection outcome.
    pub outcome: Outcome,
}

/// Result of a full scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Reports that could not be loaded.
    pub missing_reports: Vec<ReportKind>,
    /// Securities present in both reports.
    pub reconciled: usize,
    /// Passes over the universe that were run.
    pub passes: usize,
    /// One entry per liquid security, in universe order.
    pub results: Vec<SecurityResult>,
}

impl ScanReport {
    /// Securities accepted by the detector.
    pub fn candidates(&self) -> impl Iterator<Item = &CombinedRecord> {
        self.with_outcome(|o| matches!(o, Outcome::Candidate))
    }

    /// Securities that only failed the moving-average check.
    pub fn indeterminate(&self) -> impl Iterator<Item = &CombinedRecord> {
        self.with_outcome(|o| matches!(o, Outcome::Indeterminate))
    }

    /// Number of securities with no usable history.
    pub fn no_data_count(&self) -> usize {
        self.with_outcome(|o| matches!(o, Outcome::NoData(_))).count()
    }

    /// Number of rejected securities.
    pub fn rejected_count(&self) -> usize {
        self.with_outcome(|o| matches!(o, Outcome::Rejected(_))).count()
    }

    /// Outcome recorded for `code`, if it was part of the scan.
    pub fn outcome_of(&self, code: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|r| r.record.code() == code)
            .map(|r| &r.outcome)
    }

    fn with_outcome(&self, pred: impl Fn(&Outcome) -> bool) -> impl Iterator<Item = &CombinedRecord> {
        self.results
            .iter()
            .filter(move |r| pred(&r.outcome))
            .map(|r| &r.record)
    }
}

/// Drives one scan over the exchange's listed securities.
pub struct Scanner<R, H> {
    reports: R,
    retriever: SeriesRetriever<H>,
    detector: ExplosiveMoveDetector,
    config: ScanConfig,
    codes: Option<BTreeSet<String>>,
}

impl<R: ReportProvider, H: HistoryProvider> Scanner<R, H> {
    /// Wires the pipeline with its own backoff gate.
    pub fn new(reports: R, history: H, config: ScanConfig) -> Self {
        let gate = Arc::new(BackoffGate::new(config.backoff()));
        let retriever =
            SeriesRetriever::new(history, config.market, config.detection.range_day, gate);
        Self {
            reports,
            retriever,
            detector: ExplosiveMoveDetector::new(config.detection.clone()),
            config,
            codes: None,
        }
    }

    /// Restricts the scan to the given security codes. The restriction is
    /// applied to the reconciled reports, before the liquidity filter; a
    /// requested code that does not make it into the universe is logged.
    pub fn with_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.codes = Some(
            codes
                .into_iter()
                .map(|c| c.as_ref().trim().to_string())
                .collect(),
        );
        self
    }

    /// The retriever used for history requests.
    pub fn retriever(&self) -> &SeriesRetriever<H> {
        &self.retriever
    }

    /// Loads and reconciles both reports, keeps the requested codes (if any),
    /// then applies the liquidity filter.
    ///
    /// # Errors
    ///
    /// [`ReconcileError`] if a loaded report lacks a join column.
    pub async fn load_universe(&self) -> Result<Universe, ReconcileError> {
        let (daily, valuation) = tokio::join!(
            load_report(&self.reports, ReportKind::DailyTrade),
            load_report(&self.reports, ReportKind::Valuation),
        );

        let (daily, valuation) = match (daily, valuation) {
            (Some(d), Some(v)) => (d, v),
            (d, v) => {
                let missing_reports: Vec<ReportKind> = [
                    (ReportKind::DailyTrade, d.is_none()),
                    (ReportKind::Valuation, v.is_none()),
                ]
                .into_iter()
                .filter_map(|(kind, missing)| missing.then_some(kind))
                .collect();
                warn!(?missing_reports, "scan universe is empty");
                return Ok(Universe {
                    missing_reports,
                    ..Universe::default()
                });
            }
        };

        let merged = reconcile(&daily, &valuation)?;
        let reconciled = merged.len();
        let mut records: Vec<CombinedRecord> = merged
            .rows()
            .iter()
            .filter_map(|row| match CombinedRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping malformed report row");
                    None
                }
            })
            .collect();

        if let Some(wanted) = &self.codes {
            records.retain(|r| wanted.contains(r.code()));
            for code in wanted {
                if !records.iter().any(|r| r.code() == code) {
                    warn!(code = %code, "requested code is not in both reports");
                }
            }
        }

        let securities: Vec<CombinedRecord> = records
            .into_iter()
            .filter(|record| {
                let liquid = self.config.liquidity.admits(record);
                if !liquid && self.codes.is_some() {
                    warn!(code = record.code(), "requested code is below the liquidity floor");
                }
                liquid
            })
            .collect();

        info!(
            daily = daily.len(),
            valuation = valuation.len(),
            reconciled,
            liquid = securities.len(),
            "universe loaded"
        );
        Ok(Universe {
            missing_reports: Vec::new(),
            reconciled,
            securities,
        })
    }

    /// Evaluates every security in `universe`.
    ///
    /// Securities that were throttled are revisited in later passes, up to
    /// `max_passes` in total. The last cause stands for securities that never
    /// got through.
    pub async fn evaluate(&self, universe: Universe) -> ScanReport {
        let Universe {
            missing_reports,
            reconciled,
            securities,
        } = universe;

        let mut outcomes: Vec<Option<Outcome>> = securities.iter().map(|_| None).collect();
        let mut pending: Vec<usize> = (0..securities.len()).collect();
        let mut passes = 0;

        while !pending.is_empty() && passes < self.config.max_passes {
            passes += 1;
            let records = &securities;
            let results: Vec<(usize, Outcome)> = stream::iter(pending.iter().copied())
                .map(|i| async move { (i, self.evaluate_one(records[i].code()).await) })
                .buffered(self.config.concurrency)
                .collect()
                .await;

            pending.clear();
            for (i, outcome) in results {
                if matches!(&outcome, Outcome::NoData(cause) if cause.is_retryable()) {
                    pending.push(i);
                }
                outcomes[i] = Some(outcome);
            }
            if !pending.is_empty() && passes < self.config.max_passes {
                info!(pass = passes, retry = pending.len(), "revisiting throttled securities");
            }
        }

        let results: Vec<SecurityResult> = securities
            .into_iter()
            .zip(outcomes)
            .map(|(record, outcome)| SecurityResult {
                record,
                outcome: outcome.unwrap_or(Outcome::NoData(NoData::RateLimited)),
            })
            .collect();

        let report = ScanReport {
            missing_reports,
            reconciled,
            passes,
            results,
        };
        info!(
            passes,
            candidates = report.candidates().count(),
            indeterminate = report.indeterminate().count(),
            rejected = report.rejected_count(),
            no_data = report.no_data_count(),
            "scan finished"
        );
        report
    }

    /// Full scan: [`load_universe`](Self::load_universe) then
    /// [`evaluate`](Self::evaluate).
    pub async fn scan(&self) -> Result<ScanReport, ReconcileError> {
        let universe = self.load_universe().await?;
        Ok(self.evaluate(universe).await)
    }

    async fn evaluate_one(&self, code: &str) -> Outcome {
        match self.retriever.retrieve(code).await {
            Ok(snapshot) => self.detector.evaluate(code, &snapshot).into(),
            Err(cause) => Outcome::NoData(cause),
        }
    }
}
