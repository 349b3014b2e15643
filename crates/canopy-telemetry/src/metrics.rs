//! Metric names and the shared meter

use opentelemetry::metrics::Meter;

pub const PROBE_DURATION: &str = "canopy.health.probe.duration";
pub const PROBE_COUNT: &str = "canopy.health.probe.count";
pub const MATRIX_TOGGLE_COUNT: &str = "canopy.matrix.toggle.count";

/// Meter shared by all canopy instruments
///
/// Resolves against whatever provider is installed globally, so
/// instruments created before [`crate::init`] are no-ops.
pub fn meter() -> Meter {
    opentelemetry::global::meter("canopy")
}
