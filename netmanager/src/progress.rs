//! Progress fraction tracking for a single operation.
//!
//! [`ProgressTracker`] turns byte counts into fractions in `[0.0, 1.0]`
//! and decides which of them are worth reporting. Reported fractions are
//! strictly increasing, and consecutive reports differ by at least the
//! configured step (except the final `1.0`), which bounds the number of
//! progress notifications for one operation to roughly `1 / step + 1`.

/// Default minimum change between two progress reports.
pub const DEFAULT_PROGRESS_STEP: f64 = 0.01;

/// Compute a completion fraction from byte counts.
///
/// Returns `None` when the total is unknown or zero.
pub fn fraction(received: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => Some((received as f64 / total as f64).clamp(0.0, 1.0)),
        _ => None,
    }
}

/// Tracks bytes received and yields the fractions that should be reported.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    received: u64,
    last_reported: Option<f64>,
    step: f64,
}

impl ProgressTracker {
    /// Create a tracker for a body of `total` bytes (`None` if unknown).
    ///
    /// `step` is clamped to `[0.0, 1.0]`; a non-finite step falls back to
    /// [`DEFAULT_PROGRESS_STEP`].
    pub fn new(total: Option<u64>, step: f64) -> Self {
        let step = if step.is_finite() {
            step.clamp(0.0, 1.0)
        } else {
            DEFAULT_PROGRESS_STEP
        };

        Self {
            total: total.filter(|&t| t > 0),
            received: 0,
            last_reported: None,
            step,
        }
    }

    /// Total expected bytes, if known.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Bytes received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Last fraction handed out by [`advance`](Self::advance) or
    /// [`finish`](Self::finish).
    pub fn last_reported(&self) -> Option<f64> {
        self.last_reported
    }

    /// Record `bytes` more received bytes.
    ///
    /// Returns the fraction to report, or `None` if nothing should be
    /// reported for this chunk.
    pub fn advance(&mut self, bytes: u64) -> Option<f64> {
        self.received = self.received.saturating_add(bytes);
        let current = fraction(self.received, self.total)?;
        let last = self.last_reported.unwrap_or(0.0);

        if current <= last {
            return None;
        }
        let reached_end = current >= 1.0;
        if current - last < self.step && !reached_end {
            return None;
        }

        self.last_reported = Some(current);
        Some(current)
    }

    /// Mark the transfer as complete.
    ///
    /// Returns `Some(1.0)` unless `1.0` was already reported.
    pub fn finish(&mut self) -> Option<f64> {
        if self.last_reported == Some(1.0) {
            return None;
        }
        self.last_reported = Some(1.0);
        Some(1.0)
    }
}
