use std::collections::VecDeque;

use jiff::Timestamp;
use serde::Serialize;

use crate::probe::HealthCheckResult;

/// Live health of a monitored server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No probe has completed yet
    #[default]
    Unknown,
    /// A probe is in flight
    Checking,
    Healthy,
    Unhealthy,
}

/// Health of one server as exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthRecord {
    pub server_id: String,
    pub url: String,
    pub status: HealthStatus,
    /// Completion time of the latest probe
    pub last_ping: Option<Timestamp>,
    pub last_response_time_ms: Option<u64>,
    /// Failed probes since monitoring started, never decreases
    pub error_count: u64,
    pub consecutive_failures: u32,
    /// Share of successful probes in the trailing window, 0 to 100
    pub uptime_percentage: f64,
    /// Error of the latest probe, cleared by a success
    pub last_error: Option<String>,
}

/// Bounded trailing window of probe outcomes
#[derive(Debug, Clone)]
pub struct UptimeWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
}

impl UptimeWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an outcome, evicting the oldest when full
    pub fn push(&mut self, success: bool) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(success);
    }

    /// Successful share of recorded outcomes; 100 while empty
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 100.0;
        }

        let successes = self.outcomes.iter().filter(|ok| **ok).count();
        successes as f64 * 100.0 / self.outcomes.len() as f64
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Per-server health state machine
///
/// `status` only leaves the last settled value while a scheduled probe is
/// in flight. Failures below the threshold keep the settled value.
#[derive(Debug, Clone)]
pub struct Tracker {
    record: HealthRecord,
    settled: HealthStatus,
    window: UptimeWindow,
    threshold: u32,
    probing: bool,
}

/// A settled status change caused by one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

impl Tracker {
    pub fn new(server_id: &str, url: &str, window_size: usize, threshold: u32) -> Self {
        Self {
            record: HealthRecord {
                server_id: server_id.to_string(),
                url: url.to_string(),
                status: HealthStatus::Unknown,
                last_ping: None,
                last_response_time_ms: None,
                error_count: 0,
                consecutive_failures: 0,
                uptime_percentage: 100.0,
                last_error: None,
            },
            settled: HealthStatus::Unknown,
            window: UptimeWindow::new(window_size),
            threshold: threshold.max(1),
            probing: false,
        }
    }

    pub const fn record(&self) -> &HealthRecord {
        &self.record
    }

    pub fn url(&self) -> &str {
        &self.record.url
    }

    /// Enter `checking` for the duration of a scheduled probe
    pub const fn begin_probe(&mut self) {
        self.probing = true;
        self.record.status = HealthStatus::Checking;
    }

    /// Fold the outcome of the scheduled probe and leave `checking`
    pub fn apply(&mut self, result: &HealthCheckResult) -> Option<Transition> {
        self.probing = false;
        self.fold(result)
    }

    /// Fold an out-of-schedule outcome
    ///
    /// A scheduled probe still in flight keeps the status at `checking`.
    pub fn apply_check(&mut self, result: &HealthCheckResult) -> Option<Transition> {
        self.fold(result)
    }

    fn fold(&mut self, result: &HealthCheckResult) -> Option<Transition> {
        let previous = self.settled;

        self.record.last_ping = Some(result.timestamp);
        self.record.last_response_time_ms = Some(result.response_time_ms);
        self.window.push(result.is_healthy);
        self.record.uptime_percentage = self.window.percentage();

        if result.is_healthy {
            self.record.consecutive_failures = 0;
            self.record.last_error = None;
            self.settled = HealthStatus::Healthy;
        } else {
            self.record.error_count += 1;
            self.record.consecutive_failures = self.record.consecutive_failures.saturating_add(1);
            self.record.last_error.clone_from(&result.error);

            if self.record.consecutive_failures >= self.threshold {
                self.settled = HealthStatus::Unhealthy;
            }
        }

        self.record.status = if self.probing { HealthStatus::Checking } else { self.settled };

        (previous != self.settled).then_some(Transition {
            from: previous,
            to: self.settled,
        })
    }
}
