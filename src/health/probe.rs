use super::{HealthState, HealthTracker, ProbeConfig};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Timeout,
    Status(u16),
    Connect(String),
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "probe timed out"),
            ProbeFailure::Status(code) => write!(f, "probe returned HTTP {}", code),
            ProbeFailure::Connect(message) => write!(f, "probe could not connect: {}", message),
        }
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> Result<(), ProbeFailure>;
}

/// The probe client used against a live container: one GET to the fixed
/// local endpoint, success meaning any 2xx answer.
pub struct HttpProbe {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProbe {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> Result<(), ProbeFailure> {
        match self.client.get(&self.endpoint).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(ProbeFailure::Status(response.status().as_u16())),
            Err(e) if e.is_timeout() => Err(ProbeFailure::Timeout),
            Err(e) => Err(ProbeFailure::Connect(e.to_string())),
        }
    }
}

/// Drives a probe on the contract interval and folds results into the
/// liveness state machine. Runs on its own timer and never blocks or
/// interrupts the observed service; a hung endpoint surfaces purely as a
/// timeout.
pub struct HealthMonitor<P: Probe> {
    probe: P,
    config: ProbeConfig,
    tracker: HealthTracker,
}

impl<P: Probe> HealthMonitor<P> {
    pub fn new(probe: P, config: ProbeConfig) -> Self {
        let tracker = HealthTracker::new(config.retries);
        Self {
            probe,
            config,
            tracker,
        }
    }

    pub fn state(&self) -> HealthState {
        self.tracker.state()
    }

    /// One probe invocation bounded by the contract timeout.
    pub async fn tick(&mut self) -> HealthState {
        let result = tokio::time::timeout(self.config.timeout, self.probe.check()).await;
        let success = match result {
            Ok(Ok(())) => {
                debug!(endpoint = %self.config.endpoint, "Probe succeeded");
                true
            }
            Ok(Err(failure)) => {
                warn!(endpoint = %self.config.endpoint, %failure, "Probe failed");
                false
            }
            Err(_) => {
                warn!(endpoint = %self.config.endpoint, "Probe timed out");
                false
            }
        };
        self.tracker.observe(success)
    }

    /// Probes at each interval boundary until the state settles into
    /// Healthy or Unhealthy, mirroring how an engine evaluates a
    /// healthcheck after container start.
    pub async fn watch_until_settled(&mut self) -> HealthState {
        let mut timer = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.interval,
            self.config.interval,
        );

        loop {
            timer.tick().await;
            match self.tick().await {
                HealthState::Starting => continue,
                settled => return settled,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysHealthy;

    #[async_trait]
    impl Probe for AlwaysHealthy {
        async fn check(&self) -> Result<(), ProbeFailure> {
            Ok(())
        }
    }

    /// Never answers within any timeout.
    struct Silent;

    #[async_trait]
    impl Probe for Silent {
        async fn check(&self) -> Result<(), ProbeFailure> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    struct FlakyThenStable {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for FlakyThenStable {
        async fn check(&self) -> Result<(), ProbeFailure> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProbeFailure::Status(503))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_responsive_service_is_healthy_within_first_interval() {
        let start = tokio::time::Instant::now();
        let mut monitor = HealthMonitor::new(AlwaysHealthy, ProbeConfig::default());

        let state = monitor.watch_until_settled().await;

        assert_eq!(state, HealthState::Healthy);
        assert!(start.elapsed() <= Duration::from_secs(30) + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_service_is_unhealthy_after_three_timeouts() {
        let start = tokio::time::Instant::now();
        let mut monitor = HealthMonitor::new(Silent, ProbeConfig::default());

        let state = monitor.watch_until_settled().await;
        let elapsed = start.elapsed();

        assert_eq!(state, HealthState::Unhealthy);
        // Three interval waits plus three 3s timeouts.
        assert!(elapsed >= Duration::from_secs(90));
        assert!(elapsed <= Duration::from_secs(3 * 30 + 3 * 3) + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_before_threshold_settles_healthy() {
        let probe = FlakyThenStable {
            calls: AtomicUsize::new(0),
        };
        let mut monitor = HealthMonitor::new(probe, ProbeConfig::default());

        let state = monitor.watch_until_settled().await;
        assert_eq!(state, HealthState::Healthy);
    }
}
