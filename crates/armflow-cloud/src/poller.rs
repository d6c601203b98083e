//! Fixed-interval polling of a submitted deployment until it settles

use crate::deployment::{Deployment, ProvisioningState};
use crate::error::{ProvisionError, Result};
use crate::provider::DeploymentApi;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Polling cadence and hard deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub deadline: Duration,
}

impl PollConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(800);

    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    pub fn from_secs(interval_secs: u64, deadline_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(deadline_secs),
        )
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_DEADLINE)
    }
}

/// Terminal snapshot reached by the poller
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub deployment: Deployment,
    pub state: ProvisioningState,
    pub polls: u32,
    pub elapsed: Duration,
}

impl PollOutcome {
    /// The deployment if it succeeded, `ProviderFailed` otherwise
    pub fn into_succeeded(self) -> Result<Deployment> {
        if self.state.is_success() {
            Ok(self.deployment)
        } else {
            Err(ProvisionError::ProviderFailed {
                deployment: self.deployment.name,
                state: self.state,
            })
        }
    }
}

pub struct ProvisioningPoller<'a, D: ?Sized> {
    api: &'a D,
    config: PollConfig,
}

impl<'a, D: DeploymentApi + ?Sized> ProvisioningPoller<'a, D> {
    pub fn new(api: &'a D, config: PollConfig) -> Self {
        Self { api, config }
    }

    /// Poll until the deployment reaches a terminal state
    ///
    /// Per-tick query failures are logged and retried until the deadline.
    /// Once a terminal state is observed no further query is issued.
    pub async fn wait_for_terminal(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        let started = Instant::now();
        let mut polls: u32 = 0;
        let mut last_state: Option<ProvisioningState> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(ProvisionError::Cancelled(name.to_string()));
            }

            polls += 1;
            match self.api.get_deployment(name).await {
                Ok(deployment) => {
                    let state = deployment.state();

                    if state == ProvisioningState::Unrecognized {
                        tracing::warn!(
                            deployment = %name,
                            state = %deployment.properties.provisioning_state,
                            "Unrecognized provisioning state, still polling"
                        );
                    } else if last_state != Some(state) {
                        tracing::info!(deployment = %name, state = %state, "Provisioning state changed");
                    }
                    last_state = Some(state);

                    if state.is_terminal() {
                        return Ok(PollOutcome {
                            deployment,
                            state,
                            polls,
                            elapsed: started.elapsed(),
                        });
                    }
                    tracing::debug!(deployment = %name, state = %state, poll = polls, "Not settled yet");
                }
                Err(e) => {
                    let err = ProvisionError::Poll {
                        deployment: name.to_string(),
                        message: e.to_string(),
                    };
                    tracing::warn!(error = %err, poll = polls, "Status query failed, retrying");
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.deadline {
                return Err(ProvisionError::PollingTimeout {
                    deployment: name.to_string(),
                    elapsed,
                    last_state,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(deployment = %name, "Polling cancelled");
                    return Err(ProvisionError::Cancelled(name.to_string()));
                }
                _ = sleep(self.config.interval) => {}
            }
        }
    }
}
