use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("{endpoint}: connect failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("{endpoint}: protocol error: {reason}")]
    Protocol { endpoint: String, reason: String },

    #[error("{endpoint}: save did not complete after {polls} polls")]
    Stalled { endpoint: String, polls: u64 },

    #[error("run cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl SaveError {
    pub fn connect(endpoint: impl ToString, reason: impl ToString) -> Self {
        Self::Connect {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(endpoint: impl ToString, reason: impl ToString) -> Self {
        Self::Protocol {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Terminal errors end the whole run and propagate through every layer.
    /// Everything else is absorbed at the endpoint boundary.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, SaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_kinds() {
        assert!(SaveError::Cancelled.is_terminal());
        assert!(SaveError::DeadlineExceeded.is_terminal());
        assert!(!SaveError::Setup("empty".into()).is_terminal());
        assert!(!SaveError::connect("a:1", "refused").is_terminal());
        assert!(!SaveError::protocol("a:1", "ERR").is_terminal());
    }

    #[test]
    fn test_display_carries_endpoint() {
        let err = SaveError::protocol("10.0.0.1:6379", "Background save already in progress");
        assert_eq!(
            err.to_string(),
            "10.0.0.1:6379: protocol error: Background save already in progress"
        );
    }
}
