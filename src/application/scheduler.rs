//! Runs every polling unit concurrently and fails as soon as one stops

use futures::future::select_all;
use std::future::Future;
use std::sync::Arc;

use crate::application::unit::PollingUnit;
use crate::domain::errors::AgentError;
use crate::utils::logging;

/// Supervisor of the agent's polling units
#[derive(Debug, Default)]
pub struct Scheduler {
    units: Vec<Arc<dyn PollingUnit>>,
}

impl Scheduler {
    /// Creates a new scheduler instance
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    pub fn add_unit(&mut self, unit: Arc<dyn PollingUnit>) {
        self.units.push(unit);
    }

    pub fn unit_names(&self) -> Vec<String> {
        self.units.iter().map(|unit| unit.name()).collect()
    }

    /// Run until the first unit returns
    pub async fn run(self) -> Result<(), AgentError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until the first unit returns or `shutdown` completes. The first
    /// returning unit fails the whole run; shutdown is a clean exit. Either
    /// way every other unit is aborted.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), AgentError>
    where
        F: Future<Output = ()>,
    {
        if self.units.is_empty() {
            return Ok(());
        }

        let names = self.unit_names();
        let handles: Vec<_> = self
            .units
            .into_iter()
            .map(|unit| tokio::spawn(async move { unit.run().await }))
            .collect();
        let aborts: Vec<_> = handles.iter().map(|handle| handle.abort_handle()).collect();
        logging::log_info(&format!("[SCHEDULER] Started {} units", names.len()));

        let result = tokio::select! {
            (finished, index, _) = select_all(handles) => {
                let name = names[index].clone();
                Err(match finished {
                    Ok(Ok(())) => AgentError::UnitStopped(name),
                    Ok(Err(e)) => {
                        logging::log_error(&format!("[SCHEDULER] Unit {} failed: {}", name, e));
                        e
                    }
                    Err(join_error) => {
                        AgentError::UnitStopped(format!("{} ({})", name, join_error))
                    }
                })
            }
            _ = shutdown => {
                logging::log_info("[SCHEDULER] Shutdown requested");
                Ok(())
            }
        };

        for abort in &aborts {
            abort.abort();
        }
        logging::log_info("[SCHEDULER] All units stopped");
        result
    }
}
