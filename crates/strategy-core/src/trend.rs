//! Trend bookkeeping for the signal engine.

/// Direction of the current qualifying episode.
///
/// `Up` is an overbought episode (advises short), `Down` an oversold one
/// (advises long).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    Down,
    #[default]
    None,
}

/// State of the current trend episode.
///
/// Invariants:
/// - `duration` is reset to 0 exactly when `direction` changes
/// - `persisted` only becomes true once `duration >= persistence`
/// - `advised` is set at most once per episode and cleared on the next
///   direction change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrendState {
    pub direction: Direction,
    pub duration: u32,
    pub persisted: bool,
    pub advised: bool,
}

impl TrendState {
    /// Fresh episode in `direction`.
    pub fn start(direction: Direction) -> Self {
        Self {
            direction,
            duration: 0,
            persisted: false,
            advised: false,
        }
    }

    /// Record one qualifying candle in `direction`.
    ///
    /// Returns true when this candle confirms the episode and advice should be
    /// emitted; that happens once per episode.
    pub fn advance(&mut self, direction: Direction, persistence: u32) -> bool {
        if self.direction != direction {
            *self = Self::start(direction);
        }

        self.duration = self.duration.saturating_add(1);

        if self.duration >= persistence {
            self.persisted = true;
        }

        if self.persisted && !self.advised {
            self.advised = true;
            true
        } else {
            false
        }
    }
}
