use crate::core::{Result, SaveError};
use std::time::Duration;

/// Shortest run the orchestrator accepts. Smaller requests are raised to this.
pub const MIN_DEADLINE: Duration = Duration::from_secs(60);

/// Run length used when none is requested.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60 * 60);

/// Orchestrator timing configuration
///
/// Every blocking step of a run is bounded by one of these values or by the
/// run deadline, whichever fires first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Connect timeout used when disabling automatic saves
    pub toggle_connect_timeout: Duration,

    /// Connect timeout used when triggering and waiting for a save
    pub save_connect_timeout: Duration,

    /// Upper bound on a single command round trip
    pub command_timeout: Option<Duration>,

    /// Delay between two LASTSAVE reads while a save is in progress
    pub poll_interval: Duration,

    /// Delay between two full passes over the fleet
    pub pass_delay: Duration,

    /// Total run length
    pub deadline: Duration,

    /// Give up on a single save after this many polls (unbounded when `None`)
    pub max_polls: Option<u32>,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self {
            toggle_connect_timeout: Duration::from_secs(5),
            save_connect_timeout: Duration::from_secs(15),
            command_timeout: Some(Duration::from_secs(30)),
            poll_interval: Duration::from_secs(10),
            pass_delay: Duration::from_secs(10),
            deadline: DEFAULT_DEADLINE,
            max_polls: None,
        }
    }

    /// Set the run deadline, floored to [`MIN_DEADLINE`]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = effective_deadline(deadline);
        self
    }

    /// Set the connect timeout used when disabling automatic saves
    pub fn toggle_connect_timeout(mut self, timeout: Duration) -> Self {
        self.toggle_connect_timeout = timeout;
        self
    }

    /// Set the connect timeout used when saving
    pub fn save_connect_timeout(mut self, timeout: Duration) -> Self {
        self.save_connect_timeout = timeout;
        self
    }

    /// Set the per-command timeout
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the LASTSAVE poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the delay between passes
    pub fn pass_delay(mut self, delay: Duration) -> Self {
        self.pass_delay = delay;
        self
    }

    /// Set the poll cap for a single save
    pub fn max_polls(mut self, max: Option<u32>) -> Self {
        self.max_polls = max;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.deadline < MIN_DEADLINE {
            return Err(SaveError::Setup(format!(
                "deadline must be at least {}",
                humantime::format_duration(MIN_DEADLINE)
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(SaveError::Setup("poll_interval must be > 0".into()));
        }

        if self.toggle_connect_timeout.is_zero() || self.save_connect_timeout.is_zero() {
            return Err(SaveError::Setup("connect timeouts must be > 0".into()));
        }

        if self.command_timeout.is_some_and(|t| t.is_zero()) {
            return Err(SaveError::Setup("command_timeout must be > 0".into()));
        }

        if self.max_polls == Some(0) {
            return Err(SaveError::Setup("max_polls must be > 0 when set".into()));
        }

        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the one-minute floor to a requested run length.
pub fn effective_deadline(requested: Duration) -> Duration {
    requested.max(MIN_DEADLINE)
}
