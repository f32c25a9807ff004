use super::{disable_persistence, save_blocking};
use crate::connection::StoreConnector;
use crate::connection::config::OrchestratorConfig;
use crate::context::RunContext;
use crate::core::{Endpoint, Result, SaveError};
use crate::result::RunStats;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where the scheduler is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// One-shot pass clearing automatic save triggers on every endpoint
    Disabling,
    /// Walking the fleet; `cursor` is the next endpoint to save
    Saving { cursor: usize },
    /// Fixed delay between two passes
    InterPassWait,
}

/// Drives a run over a fixed, ordered fleet
///
/// Endpoints are processed strictly one after another, so at most one save is
/// ever in flight across the fleet. The run ends only when `config.deadline`
/// passes, measured from the start of [`FleetScheduler::run`], or when the
/// token from [`FleetScheduler::canceller`] is cancelled.
pub struct FleetScheduler<C> {
    connector: C,
    endpoints: Vec<Endpoint>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    phase: Phase,
    stats: RunStats,
}

impl<C: StoreConnector> FleetScheduler<C> {
    /// Fails with `SaveError::Setup` on an empty fleet or invalid config
    /// (including a deadline under one minute), before any connection is
    /// attempted.
    pub fn new(connector: C, endpoints: Vec<Endpoint>, config: OrchestratorConfig) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(SaveError::Setup("empty addresses".into()));
        }
        config.validate()?;

        let stats = RunStats::new(&endpoints);
        Ok(Self {
            connector,
            endpoints,
            config,
            cancel: CancellationToken::new(),
            phase: Phase::Disabling,
            stats,
        })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Handle that cancels the run from another task.
    pub fn canceller(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_stats(self) -> RunStats {
        self.stats
    }

    /// Run until the deadline passes or the run is cancelled. Only ever
    /// returns `SaveError::DeadlineExceeded` or `SaveError::Cancelled`.
    pub async fn run(&mut self) -> Result<Infallible> {
        let ctx = RunContext::with_token(self.config.deadline, self.cancel.clone());
        loop {
            match self.step(&ctx).await {
                Ok(next) => self.phase = next,
                Err(err) => {
                    self.stats.finish();
                    return Err(err);
                }
            }
        }
    }

    async fn step(&mut self, ctx: &RunContext) -> Result<Phase> {
        match self.phase {
            Phase::Disabling => {
                self.disable_all(ctx).await?;
                self.begin_pass();
                Ok(Phase::Saving { cursor: 0 })
            }
            Phase::Saving { cursor } if cursor >= self.endpoints.len() => {
                self.stats.complete_pass();
                debug!(pass = self.stats.passes_completed, "pass complete");
                Ok(Phase::InterPassWait)
            }
            Phase::Saving { cursor } => {
                self.save_one(cursor, ctx).await?;
                // Abort mid-pass rather than finishing the remaining endpoints.
                ctx.check()?;
                Ok(Phase::Saving { cursor: cursor + 1 })
            }
            Phase::InterPassWait => {
                ctx.sleep(self.config.pass_delay).await?;
                self.begin_pass();
                Ok(Phase::Saving { cursor: 0 })
            }
        }
    }

    async fn disable_all(&mut self, ctx: &RunContext) -> Result<()> {
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            match disable_persistence(&self.connector, endpoint, &self.config, ctx).await {
                Ok(()) => {
                    debug!(endpoint = %endpoint, "automatic saves disabled");
                    self.stats.record_toggle(index, Ok(()));
                }
                Err(err) if err.is_terminal() => return Err(err),
                Err(err) => {
                    warn!(endpoint = %endpoint, error = %err, "could not disable automatic saves");
                    self.stats.record_toggle(index, Err(&err));
                }
            }
        }
        Ok(())
    }

    async fn save_one(&mut self, cursor: usize, ctx: &RunContext) -> Result<()> {
        let endpoint = &self.endpoints[cursor];
        match save_blocking(&self.connector, endpoint, &self.config, ctx).await {
            Ok(report) => {
                info!(
                    endpoint = %endpoint,
                    elapsed = ?report.elapsed,
                    polls = report.polls,
                    "saved"
                );
                self.stats.record_save(cursor, &report);
                Ok(())
            }
            Err(err) if err.is_terminal() => Err(err),
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "save failed");
                self.stats.record_failure(cursor, &err);
                Ok(())
            }
        }
    }

    fn begin_pass(&mut self) {
        self.stats.begin_pass();
        debug!(pass = self.stats.passes_started, endpoints = self.endpoints.len(), "starting pass");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::StoreConnection;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Unreachable;

    struct NoConnection;

    #[async_trait]
    impl StoreConnection for NoConnection {
        async fn read_last_save(&mut self) -> Result<i64> {
            unreachable!()
        }

        async fn trigger_save(&mut self) -> Result<()> {
            unreachable!()
        }

        async fn disable_auto_save(&mut self) -> Result<()> {
            unreachable!()
        }
    }

    #[async_trait]
    impl StoreConnector for Unreachable {
        type Connection = NoConnection;

        async fn connect(&self, endpoint: &Endpoint, _timeout: Duration) -> Result<NoConnection> {
            Err(SaveError::connect(endpoint, "connection refused"))
        }
    }

    #[test]
    fn test_empty_fleet_is_setup_error() {
        let err = FleetScheduler::new(Unreachable, Vec::new(), OrchestratorConfig::new())
            .err()
            .unwrap();
        assert!(matches!(err, SaveError::Setup(_)));
    }

    #[test]
    fn test_invalid_config_is_setup_error() {
        let config = OrchestratorConfig::new().poll_interval(Duration::ZERO);
        let result = FleetScheduler::new(Unreachable, vec![Endpoint::new("a:1")], config);
        assert!(matches!(result.err(), Some(SaveError::Setup(_))));
    }

    #[test]
    fn test_deadline_under_floor_is_setup_error() {
        let mut config = OrchestratorConfig::new();
        config.deadline = Duration::ZERO;
        let result = FleetScheduler::new(Unreachable, vec![Endpoint::new("a:1")], config);
        assert!(matches!(result.err(), Some(SaveError::Setup(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_fleet_keeps_cycling_until_deadline() {
        let endpoints = vec![Endpoint::new("a:1"), Endpoint::new("b:2")];
        let config = OrchestratorConfig::new().with_deadline(Duration::from_secs(65));
        let mut scheduler = FleetScheduler::new(Unreachable, endpoints, config).unwrap();

        let Err(err) = scheduler.run().await;
        assert_eq!(err, SaveError::DeadlineExceeded);

        // Failures are instant, so only the 10s pass delay paces the run.
        let stats = scheduler.stats();
        assert_eq!(stats.passes_started, 7);
        assert_eq!(stats.passes_completed, 7);
        assert_eq!(stats.endpoints[0].saves_failed, 7);
        assert!(!stats.endpoints[1].auto_save_disabled);
        assert!(stats.finished_at.is_some());
        assert_eq!(scheduler.phase(), Phase::InterPassWait);
    }
}
