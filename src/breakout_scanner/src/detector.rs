//! The explosive-move detector.
//!
//! A snapshot is run through seven checks in a fixed order and the first one
//! that fails decides the verdict. The first six failures reject the security
//! with a reason; the last one (price above its short moving averages) only
//! downgrades it to [`Verdict::Indeterminate`].
//!
//! Checks 2, 3 and 5 compare the latest and previous bars against the oldest
//! bar of the lookback window.

use std::fmt;

use market_data_ingestor::models::price_series::{SeriesRow, Snapshot};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DetectionConfig;

/// Factor on top of `stable_rate` the latest volume must reach.
pub const BREAKOUT_MULTIPLIER: f64 = 1.5;

/// Why a security was rejected. `Display` yields the log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// The volume average before the breakout day is below `min_volume`.
    VolumeTooSmall,
    /// The last two bars are not both up-candles above the reference open.
    NoRedCandleStreak,
    /// Closes, lows or highs are not rising over the last two bars.
    NoUpwardStreak,
    /// Some bar inside the window already traded unusually heavily.
    PriorVolumeSpike,
    /// Volume did not grow over the last two bars.
    NoVolumeIncrease,
    /// The latest volume is not far enough above its average.
    NoVolumeBreakout,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::VolumeTooSmall => "volume too small",
            RejectReason::NoRedCandleStreak => "no two-day up-candle streak",
            RejectReason::NoUpwardStreak => "no two-day upward streak",
            RejectReason::PriorVolumeSpike => "prior volume spike within window",
            RejectReason::NoVolumeIncrease => "no two-day volume increase",
            RejectReason::NoVolumeBreakout => "no volume breakout",
        })
    }
}

/// Outcome of evaluating one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Every check passed.
    Accepted,
    /// One of the first six checks failed.
    Rejected(RejectReason),
    /// Only the moving-average check failed; worth a manual look.
    Indeterminate,
}

impl Verdict {
    /// Whether this is [`Verdict::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// The detector's checks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// 1. `previous.volume_ma_range >= min_volume`.
    Liquidity,
    /// 2. `latest.close > previous.open` and `previous.close > reference.open`.
    RedCandleStreak,
    /// 3. Strictly rising closes and lows over reference, previous, latest,
    ///    and `previous.high > reference.high`.
    UpwardStreak,
    /// 4. Every window bar's volume stays below `volume_ma_range * stable_rate`.
    VolumeStability,
    /// 5. `latest.volume > previous.volume > reference.volume`.
    VolumeIncrease,
    /// 6. `latest.volume >= latest.volume_ma_range * stable_rate * 1.5`.
    VolumeBreakout,
    /// 7. `latest.close` at or above its 5- and 10-day averages.
    MovingAverageBreakout,
}

impl Check {
    /// All checks in evaluation order.
    pub const ORDER: [Check; 7] = [
        Check::Liquidity,
        Check::RedCandleStreak,
        Check::UpwardStreak,
        Check::VolumeStability,
        Check::VolumeIncrease,
        Check::VolumeBreakout,
        Check::MovingAverageBreakout,
    ];

    /// The verdict when this check fails.
    pub fn failure(self) -> Verdict {
        match self {
            Check::Liquidity => Verdict::Rejected(RejectReason::VolumeTooSmall),
            Check::RedCandleStreak => Verdict::Rejected(RejectReason::NoRedCandleStreak),
            Check::UpwardStreak => Verdict::Rejected(RejectReason::NoUpwardStreak),
            Check::VolumeStability => Verdict::Rejected(RejectReason::PriorVolumeSpike),
            Check::VolumeIncrease => Verdict::Rejected(RejectReason::NoVolumeIncrease),
            Check::VolumeBreakout => Verdict::Rejected(RejectReason::NoVolumeBreakout),
            Check::MovingAverageBreakout => Verdict::Indeterminate,
        }
    }
}

/// Evaluates snapshots against a fixed [`DetectionConfig`].
#[derive(Debug, Clone)]
pub struct ExplosiveMoveDetector {
    config: DetectionConfig,
}

impl ExplosiveMoveDetector {
    /// Creates a detector with the given thresholds.
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Runs the checks in order and returns the verdict of the first failure,
    /// or [`Verdict::Accepted`]. Each failure is logged at info level with
    /// `code`.
    pub fn evaluate(&self, code: &str, snapshot: &Snapshot) -> Verdict {
        for check in Check::ORDER {
            if !self.passes(check, snapshot) {
                let verdict = check.failure();
                match verdict {
                    Verdict::Rejected(reason) => info!(code, ?check, "{reason}"),
                    _ => info!(code, ?check, "close below short moving averages"),
                }
                return verdict;
            }
        }
        debug!(code, "all checks passed");
        Verdict::Accepted
    }

    /// Whether `snapshot` passes a single check.
    ///
    /// A snapshot with an empty window fails every check that needs the
    /// reference bar.
    pub fn passes(&self, check: Check, snapshot: &Snapshot) -> bool {
        let Snapshot {
            latest, previous, ..
        } = snapshot;
        let reference = snapshot.window_oldest();
        let stable_rate = self.config.stable_rate;

        match check {
            Check::Liquidity => previous.volume_ma_range >= self.config.min_volume,
            Check::RedCandleStreak => reference.is_some_and(|r| {
                latest.bar.close > previous.bar.open && previous.bar.close > r.bar.open
            }),
            Check::UpwardStreak => reference.is_some_and(|r| upward_streak(r, previous, latest)),
            Check::VolumeStability => snapshot
                .window
                .iter()
                .all(|row| row.bar.volume < row.volume_ma_range * stable_rate),
            Check::VolumeIncrease => reference.is_some_and(|r| {
                latest.bar.volume > previous.bar.volume && previous.bar.volume > r.bar.volume
            }),
            Check::VolumeBreakout => {
                latest.bar.volume >= latest.volume_ma_range * (stable_rate * BREAKOUT_MULTIPLIER)
            }
            Check::MovingAverageBreakout => {
                latest.bar.close >= latest.close_ma5 && latest.bar.close >= latest.close_ma10
            }
        }
    }
}

fn upward_streak(reference: &SeriesRow, previous: &SeriesRow, latest: &SeriesRow) -> bool {
    let (r, p, l) = (&reference.bar, &previous.bar, &latest.bar);
    l.close > p.close && p.close > r.close && l.low > p.low && p.low > r.low && p.high > r.high
}
