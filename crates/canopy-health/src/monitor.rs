use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use canopy_config::MonitorConfig;
use canopy_registry::{RegistryStore, StoreError};
use canopy_telemetry::{Counter, Histogram, KeyValue, metrics};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jiff::Timestamp;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::probe::{HealthCheckResult, ProbeError, Prober};
use crate::record::{HealthRecord, HealthStatus, Tracker, Transition};

/// A server with a running probe task
struct Monitored {
    tracker: Tracker,
    /// Identifies the task owning this entry across stop/start cycles
    generation: u64,
    token: CancellationToken,
}

struct Inner {
    config: MonitorConfig,
    prober: Arc<dyn Prober>,
    servers: DashMap<String, Monitored>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
    probe_duration: Histogram<f64>,
    probe_count: Counter<u64>,
}

/// Supervisor of per-server probe tasks
///
/// Every monitored server gets its own task holding a child of the
/// supervisor's cancellation token, so servers are probed independently
/// and [`HealthMonitor::shutdown`] stops all of them at once. Health
/// records live only in memory.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

impl HealthMonitor {
    pub fn new(config: MonitorConfig, prober: Arc<dyn Prober>) -> Self {
        let meter = metrics::meter();

        let probe_duration = meter
            .f64_histogram(metrics::PROBE_DURATION)
            .with_unit("s")
            .with_description("Health probe duration")
            .build();

        let probe_count = meter
            .u64_counter(metrics::PROBE_COUNT)
            .with_description("Health probes issued")
            .build();

        Self {
            inner: Arc::new(Inner {
                config,
                prober,
                servers: DashMap::new(),
                next_generation: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
                probe_duration,
                probe_count,
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Start probing `url` on the configured interval
    ///
    /// The first probe runs immediately. Returns `false` without doing
    /// anything when the server is already monitored or the monitor has
    /// been shut down. Must be called within a Tokio runtime.
    pub fn start_monitoring(&self, server_id: &str, url: &str) -> bool {
        let token = self.inner.shutdown.child_token();
        if token.is_cancelled() {
            return false;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        match self.inner.servers.entry(server_id.to_string()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                // shutdown cancels before it clears, so this runs either
                // before the cancel or ahead of the clear
                if token.is_cancelled() {
                    return false;
                }

                let config = &self.inner.config;
                slot.insert(Monitored {
                    tracker: Tracker::new(server_id, url, config.window_size, config.failure_threshold),
                    generation,
                    token: token.clone(),
                });
            }
        }

        tokio::spawn(probe_loop(
            self.inner.clone(),
            server_id.to_string(),
            url.to_string(),
            generation,
            token,
        ));

        tracing::info!(server_id, url, "started health monitoring");
        true
    }

    /// Cancel the server's probe task and drop its record
    ///
    /// Does not wait for the task. A probe already in flight is abandoned
    /// and its result discarded. Returns whether the server was monitored.
    pub fn stop_monitoring(&self, server_id: &str) -> bool {
        let Some((_, monitored)) = self.inner.servers.remove(server_id) else {
            return false;
        };

        monitored.token.cancel();
        tracing::info!(server_id, "stopped health monitoring");

        true
    }

    pub fn is_monitoring(&self, server_id: &str) -> bool {
        self.inner.servers.contains_key(server_id)
    }

    /// Url probed for a monitored server
    pub fn monitored_url(&self, server_id: &str) -> Option<String> {
        self.inner
            .servers
            .get(server_id)
            .map(|monitored| monitored.tracker.url().to_string())
    }

    /// Probe once outside the schedule
    ///
    /// The outcome is folded into the server's record only when `record`
    /// is set and the server is monitored.
    pub async fn check_health(&self, server_id: &str, url: &str, record: bool) -> HealthCheckResult {
        let result = self.inner.probe(server_id, url).await;

        if record {
            let generation = self.inner.servers.get(server_id).map(|m| m.generation);
            if let Some(generation) = generation {
                self.inner.apply(server_id, generation, &result, false);
            }
        }

        result
    }

    pub fn get_health(&self, server_id: &str) -> Option<HealthRecord> {
        self.inner
            .servers
            .get(server_id)
            .map(|monitored| monitored.tracker.record().clone())
    }

    /// Every record, in the order monitoring started
    pub fn list_all_health(&self) -> Vec<HealthRecord> {
        let mut records: Vec<_> = self
            .inner
            .servers
            .iter()
            .map(|monitored| (monitored.generation, monitored.tracker.record().clone()))
            .collect();

        records.sort_by_key(|(generation, _)| *generation);
        records.into_iter().map(|(_, record)| record).collect()
    }

    /// Start monitoring every active server in the registry
    ///
    /// Returns how many servers were newly monitored.
    pub async fn monitor_registered(&self, store: &dyn RegistryStore) -> Result<usize, StoreError> {
        let servers = store.list_servers().await?;

        Ok(servers
            .iter()
            .filter(|server| server.status.is_active())
            .filter(|server| self.start_monitoring(&server.id, &server.url))
            .count())
    }

    /// Stop every probe task and refuse new ones
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.servers.clear();
        tracing::debug!("health monitor shut down");
    }
}

impl Inner {
    /// Run one bounded probe and measure it
    async fn probe(&self, server_id: &str, url: &str) -> HealthCheckResult {
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.config.timeout, self.prober.probe(url))
            .await
            .unwrap_or(Err(ProbeError::Timeout(self.config.timeout)));

        let elapsed = started.elapsed();

        let attributes = [
            KeyValue::new("server_id", server_id.to_string()),
            KeyValue::new("outcome", if outcome.is_ok() { "success" } else { "failure" }),
        ];
        self.probe_duration.record(elapsed.as_secs_f64(), &attributes);
        self.probe_count.add(1, &attributes);

        if let Err(ref e) = outcome {
            tracing::debug!(server_id, url, error = %e, "health probe failed");
        }

        HealthCheckResult {
            server_id: server_id.to_string(),
            is_healthy: outcome.is_ok(),
            response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            timestamp: Timestamp::now(),
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Mark the record as checking if `generation` still owns it
    fn begin_probe(&self, server_id: &str, generation: u64) -> bool {
        match self.servers.get_mut(server_id) {
            Some(mut monitored) if monitored.generation == generation => {
                monitored.tracker.begin_probe();
                true
            }
            _ => false,
        }
    }

    /// Fold a result into the record owned by `generation`
    ///
    /// Only a `scheduled` result ends the `checking` state. Returns the consecutive failure count, or `None` when the record
    /// is gone or owned by a newer task.
    fn apply(&self, server_id: &str, generation: u64, result: &HealthCheckResult, scheduled: bool) -> Option<u32> {
        let mut monitored = self
            .servers
            .get_mut(server_id)
            .filter(|monitored| monitored.generation == generation)?;

        let transition = if scheduled {
            monitored.tracker.apply(result)
        } else {
            monitored.tracker.apply_check(result)
        };
        let failures = monitored.tracker.record().consecutive_failures;
        drop(monitored);

        if let Some(transition) = transition {
            log_transition(server_id, transition);
        }

        Some(failures)
    }

    /// Delay until the next probe
    ///
    /// Doubles per consecutive failure up to `max_backoff` when set.
    fn delay(&self, consecutive_failures: u32) -> Duration {
        let interval = self.config.interval;

        match self.config.max_backoff {
            Some(max_backoff) if consecutive_failures > 0 => interval
                .saturating_mul(1_u32 << consecutive_failures.min(16))
                .min(max_backoff),
            _ => interval,
        }
    }
}

async fn probe_loop(inner: Arc<Inner>, server_id: String, url: String, generation: u64, token: CancellationToken) {
    tracing::debug!(server_id = %server_id, "probe loop started");

    let mut next = Instant::now();

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            () = tokio::time::sleep_until(next) => {}
        }

        if !inner.begin_probe(&server_id, generation) {
            break;
        }

        let started = Instant::now();
        let result = tokio::select! {
            () = token.cancelled() => break,
            result = inner.probe(&server_id, &url) => result,
        };

        let Some(consecutive_failures) = inner.apply(&server_id, generation, &result, true) else {
            break;
        };

        next = started + inner.delay(consecutive_failures);
    }

    tracing::debug!(server_id = %server_id, "probe loop stopped");
}

fn log_transition(server_id: &str, transition: Transition) {
    if transition.to == HealthStatus::Unhealthy {
        tracing::warn!(server_id, from = ?transition.from, "server became unhealthy");
    } else {
        tracing::info!(server_id, from = ?transition.from, to = ?transition.to, "server health changed");
    }
}
