//! Shared suspension window for the historical feed.
//!
//! When any request is throttled, every retrieval sharing the gate pauses
//! until the window ends. Throttling signals that arrive while a window is
//! open join it instead of extending it.

use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};
use tracing::warn;

/// Gate that every historical fetch passes through.
#[derive(Debug)]
pub struct BackoffGate {
    period: Duration,
    resume_at: Mutex<Option<Instant>>,
}

impl BackoffGate {
    /// Creates an open gate that suspends for `period` per throttling signal.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            resume_at: Mutex::new(None),
        }
    }

    /// Length of one suspension.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits until any active suspension has ended.
    pub async fn wait(&self) {
        let resume_at = *self.resume_at.lock().await;
        if let Some(at) = resume_at {
            tokio::time::sleep_until(at).await;
        }
    }

    /// Opens a suspension window (or joins the one already open) and waits
    /// for it to end.
    pub async fn back_off(&self) {
        let at = {
            let mut resume_at = self.resume_at.lock().await;
            let now = Instant::now();
            match *resume_at {
                Some(at) if at > now => at,
                _ => {
                    let at = now + self.period;
                    *resume_at = Some(at);
                    warn!(secs = self.period.as_secs(), "rate limited, suspending history requests");
                    at
                }
            }
        };
        tokio::time::sleep_until(at).await;
    }

    /// Whether a suspension is in effect right now.
    pub async fn is_suspended(&self) -> bool {
        matches!(*self.resume_at.lock().await, Some(at) if at > Instant::now())
    }
}
