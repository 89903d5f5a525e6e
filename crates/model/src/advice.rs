use serde::{Deserialize, Serialize};

/// What the signal engine recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdviceAction {
    /// Enter or hold a long position (buy the asset).
    Long,
    /// Exit to the currency (sell the asset).
    Short,
    /// No recommendation for this candle.
    None,
}

impl AdviceAction {
    /// Returns true for `Long` and `Short`.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for AdviceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Advice emitted for one candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub action: AdviceAction,
    pub timestamp_ms: i64,
}

impl Advice {
    pub fn long(timestamp_ms: i64) -> Self {
        Self {
            action: AdviceAction::Long,
            timestamp_ms,
        }
    }

    pub fn short(timestamp_ms: i64) -> Self {
        Self {
            action: AdviceAction::Short,
            timestamp_ms,
        }
    }

    pub fn none(timestamp_ms: i64) -> Self {
        Self {
            action: AdviceAction::None,
            timestamp_ms,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.action.is_actionable()
    }
}
