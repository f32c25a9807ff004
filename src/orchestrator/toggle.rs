use crate::connection::config::OrchestratorConfig;
use crate::connection::{StoreConnection, StoreConnector};
use crate::context::RunContext;
use crate::core::{Endpoint, Result};

/// Clear the automatic save triggers on `endpoint`.
///
/// The connection is dropped, and thereby closed, on every return path.
pub async fn disable_persistence<C>(
    connector: &C,
    endpoint: &Endpoint,
    config: &OrchestratorConfig,
    ctx: &RunContext,
) -> Result<()>
where
    C: StoreConnector,
{
    let mut conn = ctx
        .guard(connector.connect(endpoint, config.toggle_connect_timeout))
        .await?;
    ctx.guard(conn.disable_auto_save()).await
}
