//! Waiting for the simulator to come to rest after a scene change.

use crate::interfaces::{SimError, SimStatus, Simulator};
use thiserror::Error;

/// Bounds for the stabilization wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Steps that always run, even if the simulator reports settled earlier.
    pub min_steps: u32,
    /// Upper bound; exceeding it marks the scene incomplete.
    pub max_steps: u32,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            min_steps: 5,
            max_steps: 200,
        }
    }
}

impl SettlePolicy {
    /// Step bound actually applied: never below `min_steps`, and at least one step.
    pub fn effective_max_steps(&self) -> u32 {
        self.max_steps.max(self.min_steps).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleOutcome {
    pub steps: u32,
    pub status: SimStatus,
}

#[derive(Debug, Error)]
pub enum SettleError {
    #[error("simulator did not settle within {steps} steps")]
    Timeout { steps: u32 },
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Step `sim` until it reports settled and at least `policy.min_steps` have run.
pub fn wait_for_settle<S: Simulator + ?Sized>(
    sim: &mut S,
    policy: SettlePolicy,
) -> Result<SettleOutcome, SettleError> {
    let max_steps = policy.effective_max_steps();
    for step in 1..=max_steps {
        let status = sim.step()?;
        if status.settled && step >= policy.min_steps {
            return Ok(SettleOutcome {
                steps: step,
                status,
            });
        }
    }
    Err(SettleError::Timeout { steps: max_steps })
}
