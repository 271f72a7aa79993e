use thiserror::Error;

/// Which input of a join an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

impl std::fmt::Display for JoinSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinSide::Left => f.write_str("left"),
            JoinSide::Right => f.write_str("right"),
        }
    }
}

/// Errors raised by [`reconcile`](crate::reconcile::reconcile).
///
/// These indicate a programming or configuration mistake, not transient data
/// unavailability, so they are surfaced to the caller instead of being logged
/// and swallowed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// One of the record sets has no column to join on.
    #[error("{side} record set has no '{column}' column")]
    MissingJoinKey { side: JoinSide, column: &'static str },
}

/// Errors raised while turning a generic report row into a typed record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// A required text column is absent or not text.
    #[error("record has no text value for '{0}'")]
    MissingText(&'static str),
}

/// Errors raised while deriving a [`PriceSeries`](crate::models::price_series::PriceSeries).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeriesError {
    /// Fewer bars than the lookback needs.
    #[error("insufficient history: have {have} bars, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    /// The lookback window must cover at least one bar.
    #[error("range_day must be at least 1")]
    EmptyRange,
}
