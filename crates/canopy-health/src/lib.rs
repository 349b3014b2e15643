//! Continuous health monitoring of registered servers

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
mod monitor;
mod probe;
mod record;
pub mod router;

pub use error::HealthError;
pub use monitor::HealthMonitor;
pub use probe::{HealthCheckResult, HttpProber, ProbeError, Prober};
pub use record::{HealthRecord, HealthStatus, Transition, UptimeWindow};
pub use router::{HealthErrorResponse, health_router};
