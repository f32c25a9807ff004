pub mod config;
pub mod resp;

use crate::core::{Endpoint, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Opens connections to fleet members
///
/// The orchestrator only ever holds one connection at a time. Implementations
/// must release the underlying socket when the connection is dropped, so that
/// every exit path of an attempt closes it.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Connection: StoreConnection;

    /// Connect to `endpoint`, failing with `SaveError::Connect` if the
    /// connection is not established within `timeout`.
    async fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Self::Connection>;
}

/// The three store capabilities the orchestrator relies on
#[async_trait]
pub trait StoreConnection: Send {
    /// Read the marker that changes whenever a snapshot completes (`LASTSAVE`).
    async fn read_last_save(&mut self) -> Result<i64>;

    /// Start a background snapshot (`BGSAVE`).
    async fn trigger_save(&mut self) -> Result<()>;

    /// Clear every automatic snapshot trigger (`CONFIG SET save ""`).
    async fn disable_auto_save(&mut self) -> Result<()>;
}
