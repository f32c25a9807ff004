// ============================================================================
// fleetsave Library
// ============================================================================

pub mod core;
pub mod connection;
pub mod context;
pub mod endpoints;
pub mod orchestrator;
pub mod result;
pub mod shuffle;

// Re-export main types for convenience
pub use crate::core::{Endpoint, Result, SaveError};
pub use crate::context::RunContext;
pub use crate::result::{EndpointStats, RunStats, SaveReport};

// Re-export connection API
pub use crate::connection::{
    StoreConnection, StoreConnector,
    config::{DEFAULT_DEADLINE, MIN_DEADLINE, OrchestratorConfig, effective_deadline},
    resp::{RespConnection, RespConnector},
};

pub use crate::endpoints::{load_endpoints, parse_endpoints};
pub use crate::orchestrator::{FleetScheduler, Phase, disable_persistence, save_blocking};
pub use crate::shuffle::{run_rng, shuffle};
