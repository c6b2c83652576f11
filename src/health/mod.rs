//! Runtime liveness contract.
//!
//! The pipeline imposes exactly one behavioral requirement on the service it
//! packages: answer `GET /health` on the loopback interface. This module
//! carries the fixed probe parameters and the liveness state machine the
//! orchestrator consumes. Probe failures are state transitions, never
//! pipeline errors, and the service is never forcibly interrupted here.

mod probe;

pub use probe::{HealthMonitor, HttpProbe, Probe, ProbeFailure};

use crate::config::{HEALTH_PATH, SERVICE_PORT};
use std::time::Duration;

pub const PROBE_INTERVAL: Duration = Duration::from_secs(30);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const PROBE_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub endpoint: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: local_health_endpoint(),
            interval: PROBE_INTERVAL,
            timeout: PROBE_TIMEOUT,
            retries: PROBE_RETRIES,
        }
    }
}

pub fn local_health_endpoint() -> String {
    format!("http://127.0.0.1:{}{}", SERVICE_PORT, HEALTH_PATH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Healthy,
    Unhealthy,
}

/// Pure transition logic, kept separate from timing so it is testable
/// without a clock. `Unhealthy` is terminal for this layer; restarting is
/// the surrounding orchestrator's decision.
#[derive(Debug)]
pub struct HealthTracker {
    state: HealthState,
    consecutive_failures: u32,
    retries: u32,
}

impl HealthTracker {
    pub fn new(retries: u32) -> Self {
        Self {
            state: HealthState::Starting,
            consecutive_failures: 0,
            retries,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn observe(&mut self, success: bool) -> HealthState {
        if self.state == HealthState::Unhealthy {
            return self.state;
        }

        if success {
            self.consecutive_failures = 0;
            self.state = HealthState::Healthy;
        } else {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= self.retries {
                self.state = HealthState::Unhealthy;
            }
        }

        self.state
    }
}
