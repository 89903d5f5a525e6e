//! Execution mode configuration.
//!
//! Chooses between the in-memory paper venue and a live venue adapter.

use std::fmt;
use std::str::FromStr;

/// Environment variable holding the execution mode.
pub const EXECUTION_MODE_VAR: &str = "EXECUTION_MODE";

/// Whether advice is executed against a simulated or a real venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Simulated fills against an in-memory venue.
    #[default]
    Paper,
    /// Orders are sent to a real venue adapter.
    Live,
}

impl ExecutionMode {
    /// Returns true for paper trading.
    pub fn is_paper(&self) -> bool {
        matches!(self, Self::Paper)
    }

    /// Returns true for live trading.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Load the mode from `EXECUTION_MODE`.
    ///
    /// Returns `Paper` if not set or invalid.
    pub fn from_env() -> Self {
        std::env::var(EXECUTION_MODE_VAR)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
            Self::Live => write!(f, "live"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paper" | "dry" | "dry-run" | "dryrun" | "sandbox" => Ok(Self::Paper),
            "live" | "real" | "production" | "prod" => Ok(Self::Live),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Error parsing an execution mode string.
#[derive(Debug, Clone)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid execution mode '{}', expected 'paper' or 'live'",
            self.0
        )
    }
}

impl std::error::Error for ParseModeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paper() {
        assert_eq!("paper".parse::<ExecutionMode>().unwrap(), ExecutionMode::Paper);
        assert_eq!("DRY-RUN".parse::<ExecutionMode>().unwrap(), ExecutionMode::Paper);
        assert_eq!("sandbox".parse::<ExecutionMode>().unwrap(), ExecutionMode::Paper);
    }

    #[test]
    fn test_parse_live() {
        assert_eq!("live".parse::<ExecutionMode>().unwrap(), ExecutionMode::Live);
        assert_eq!("PROD".parse::<ExecutionMode>().unwrap(), ExecutionMode::Live);
    }

    #[test]
    fn test_parse_invalid() {
        let err = "margin".parse::<ExecutionMode>().unwrap_err();
        assert!(err.to_string().contains("margin"));
    }

    #[test]
    fn test_default_is_paper() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Paper);
        assert!(ExecutionMode::default().is_paper());
        assert!(!ExecutionMode::default().is_live());
    }

    #[test]
    fn test_display() {
        assert_eq!(ExecutionMode::Paper.to_string(), "paper");
        assert_eq!(ExecutionMode::Live.to_string(), "live");
    }
}
