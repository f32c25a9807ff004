use crate::connection::config::OrchestratorConfig;
use crate::connection::{StoreConnection, StoreConnector};
use crate::context::RunContext;
use crate::core::{Endpoint, Result, SaveError};
use crate::result::SaveReport;
use tokio::time::Instant;
use tracing::debug;

/// In-flight save on one endpoint
struct SaveAttempt {
    previous_marker: i64,
    triggered_at: Instant,
    polls: u64,
}

impl SaveAttempt {
    fn record_poll(&mut self) -> u64 {
        self.polls = self.polls.saturating_add(1);
        self.polls
    }
}

/// Trigger a background save on `endpoint` and block until its LASTSAVE
/// marker moves away from the value read just before the trigger.
///
/// Any change counts as completion, including a marker going backwards.
/// Polling is unbounded unless `config.max_polls` is set; the run deadline
/// still applies either way.
pub async fn save_blocking<C>(
    connector: &C,
    endpoint: &Endpoint,
    config: &OrchestratorConfig,
    ctx: &RunContext,
) -> Result<SaveReport>
where
    C: StoreConnector,
{
    let begin = Instant::now();
    let mut conn = ctx
        .guard(connector.connect(endpoint, config.save_connect_timeout))
        .await?;

    let previous_marker = ctx.guard(conn.read_last_save()).await?;
    ctx.guard(conn.trigger_save()).await?;

    let mut attempt = SaveAttempt {
        previous_marker,
        triggered_at: Instant::now(),
        polls: 0,
    };
    debug!(endpoint = %endpoint, marker = previous_marker, "background save triggered");

    loop {
        ctx.sleep(config.poll_interval).await?;

        let current_marker = ctx.guard(conn.read_last_save()).await?;
        attempt.record_poll();

        if current_marker != attempt.previous_marker {
            return Ok(SaveReport {
                endpoint: endpoint.clone(),
                elapsed: begin.elapsed(),
                polls: attempt.polls,
                previous_marker: attempt.previous_marker,
                current_marker,
            });
        }

        debug!(
            endpoint = %endpoint,
            polls = attempt.polls,
            waiting = ?attempt.triggered_at.elapsed(),
            "save still in progress"
        );

        if let Some(max) = config.max_polls {
            if attempt.polls >= u64::from(max) {
                return Err(SaveError::Stalled {
                    endpoint: endpoint.to_string(),
                    polls: attempt.polls,
                });
            }
        }
    }
}
