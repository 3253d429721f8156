//! Metrics collection for guidance sessions.
//!
//! Provides Prometheus-compatible metrics and typed convenience functions
//! for recording measurements. Every label value comes from a closed set
//! so cardinality stays fixed.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::GuideError;
use crate::guidance::{AdvanceReason, StepKind};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Port names accepted as the `port` label.
const KNOWN_PORTS: [&str; 2] = ["beep", "narration"];

/// Maps a port name onto the closed label set.
#[must_use]
pub fn sanitize_port_label(port: &str) -> &str {
    if KNOWN_PORTS.contains(&port) {
        port
    } else {
        "__unknown__"
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `GuideError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), GuideError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| GuideError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "cpr_guide_steps_entered_total",
        "Total number of steps entered, by step kind"
    );
    describe_counter!(
        "cpr_guide_transitions_total",
        "Total number of step transitions, by trigger"
    );
    describe_counter!(
        "cpr_guide_cycles_total",
        "Times the sequence wrapped back to the compressions step"
    );
    describe_counter!(
        "cpr_guide_compressions_total",
        "Compressions counted across all cycles"
    );
    describe_counter!(
        "cpr_guide_port_failures_total",
        "Narration or beep failures swallowed by the engine"
    );
    describe_gauge!(
        "cpr_guide_current_step",
        "Index of the active step, or -1 when idle"
    );
}

/// Records entry into a step.
pub fn record_step_entered(kind: StepKind) {
    counter!("cpr_guide_steps_entered_total", "kind" => kind.as_str()).increment(1);
}

/// Records a transition and its trigger.
pub fn record_transition(reason: AdvanceReason) {
    counter!("cpr_guide_transitions_total", "reason" => reason.as_str()).increment(1);
}

/// Records a wrap back to the compressions step.
pub fn record_cycle() {
    counter!("cpr_guide_cycles_total").increment(1);
}

/// Records one counted compression.
pub fn record_compression() {
    counter!("cpr_guide_compressions_total").increment(1);
}

/// Records a swallowed port failure.
pub fn record_port_failure(port: &str) {
    let label = sanitize_port_label(port);
    counter!("cpr_guide_port_failures_total", "port" => label.to_owned()).increment(1);
}

/// Sets the current step gauge; `None` means idle.
#[allow(clippy::cast_precision_loss)]
pub fn set_current_step(index: Option<usize>) {
    let value = index.map_or(-1.0, |i| i as f64);
    gauge!("cpr_guide_current_step").set(value);
}
