use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::errors::AgentError;

/// Defines the common interface of the agent's long-running polling units
#[async_trait]
pub trait PollingUnit: Send + Sync + Debug {
    /// Name used in logs and scheduler errors
    fn name(&self) -> String;

    /// Runs the unit's loop. Only returns on a fatal error.
    async fn run(&self) -> Result<(), AgentError>;
}
