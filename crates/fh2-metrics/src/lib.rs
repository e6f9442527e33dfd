//! Metrics for the FH-2 panel link.
//!
//! Every metric the bridge records is declared here as a [`Metric`] constant
//! so names, units and label keys live in one place. The `metrics` crate is
//! re-exported; without an installed recorder all updates are no-ops.
//!
//! # Example
//!
//! ```rust
//! use fh2_metrics::{metric_defs, LinkLabels};
//!
//! let labels = LinkLabels::new("/dev/ttyUSB0");
//! fh2_metrics::metrics::counter!(metric_defs::COMMANDS_SENT.name, &labels.to_labels())
//!     .increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use fh2_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const RECONNECTS: Metric = Metric::counter("fh2.link.reconnects")
///     .with_description("Reconnect attempts")
///     .with_unit(Unit::Count)
///     .with_labels(&["port"]);
///
/// assert_eq!(RECONNECTS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "fh2.link.commands_sent").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the panel link.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every link metric.
    pub const LINK_LABELS: &[&str] = &["port"];

    // ========================================================================
    // Inbound Traffic
    // ========================================================================

    /// Non-empty lines read from the radio.
    pub const LINES_RECEIVED: Metric = Metric::counter("fh2.link.lines_received")
        .with_description("Response lines read from the radio")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Lines with a known prefix whose value was dropped.
    ///
    /// Labels: port, field
    pub const LINES_IGNORED: Metric = Metric::counter("fh2.link.lines_ignored")
        .with_description("Response lines with an unusable value")
        .with_unit(Unit::Count)
        .with_labels(&["port", "field"]);

    /// Lines matching no known response.
    pub const LINES_UNRECOGNIZED: Metric = Metric::counter("fh2.link.lines_unrecognized")
        .with_description("Response lines matching no known prefix")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Read loop failures. Each one ends the read loop.
    pub const READ_ERRORS: Metric = Metric::counter("fh2.link.read_errors")
        .with_description("Transport read failures")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    // ========================================================================
    // Outbound Traffic
    // ========================================================================

    /// Commands handed to the transport successfully.
    pub const COMMANDS_SENT: Metric = Metric::counter("fh2.link.commands_sent")
        .with_description("Commands written to the radio")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    /// Commands the transport refused.
    pub const SEND_FAILURES: Metric = Metric::counter("fh2.link.send_failures")
        .with_description("Commands that failed to send")
        .with_unit(Unit::Count)
        .with_labels(LINK_LABELS);

    // ========================================================================
    // Device State
    // ========================================================================

    /// State field updates.
    ///
    /// Labels: port, field, source (`device` or `local`)
    pub const STATE_UPDATES: Metric = Metric::counter("fh2.state.updates")
        .with_description("Device state field updates")
        .with_unit(Unit::Count)
        .with_labels(&["port", "field", "source"]);

    /// Last known AF gain.
    pub const VOLUME: Metric = Metric::gauge("fh2.state.volume")
        .with_description("Last known AF gain (0-255)")
        .with_labels(LINK_LABELS);

    /// Last known monitor level.
    pub const MONITOR_LEVEL: Metric = Metric::gauge("fh2.state.monitor_level")
        .with_description("Last known monitor level (0-100)")
        .with_unit(Unit::Percent)
        .with_labels(LINK_LABELS);

    /// Time spent classifying and applying one line.
    pub const LINE_HANDLING_TIME: Metric = Metric::histogram("fh2.link.line_handling_us")
        .with_description("Time to classify and apply one response line")
        .with_unit(Unit::Microseconds)
        .with_labels(LINK_LABELS);

    /// All metrics, for bulk registration.
    pub const ALL: &[&Metric] = &[
        &LINES_RECEIVED,
        &LINES_IGNORED,
        &LINES_UNRECOGNIZED,
        &READ_ERRORS,
        &COMMANDS_SENT,
        &SEND_FAILURES,
        &STATE_UPDATES,
        &VOLUME,
        &MONITOR_LEVEL,
        &LINE_HANDLING_TIME,
    ];
}

/// Labels identifying the link a metric belongs to.
#[derive(Debug, Clone)]
pub struct LinkLabels {
    /// Serial port, or `offline` when there is no connection.
    pub port: String,
}

impl LinkLabels {
    /// Creates labels for the given port.
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("port", self.port.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all link metrics. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_labels() {
        let labels = LinkLabels::new("/dev/ttyUSB0");
        assert_eq!(labels.to_labels(), vec![("port", "/dev/ttyUSB0".to_string())]);
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = LinkLabels::new("COM3");
        let extended = labels.with(&[("field", "volume".to_string()), ("source", "device".to_string())]);

        assert_eq!(extended.len(), 3);
        assert!(extended.contains(&("field", "volume".to_string())));
        assert!(extended.contains(&("source", "device".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::COMMANDS_SENT.name, "fh2.link.commands_sent");
        assert_eq!(metric_defs::COMMANDS_SENT.kind, MetricKind::Counter);
        assert_eq!(metric_defs::MONITOR_LEVEL.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::MONITOR_LEVEL.unit, Some(Unit::Percent));
        assert_eq!(metric_defs::LINE_HANDLING_TIME.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::STATE_UPDATES.labels, &["port", "field", "source"]);
    }

    #[test]
    fn test_all_metrics_unique() {
        let mut names: Vec<&str> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(names.iter().all(|n| n.starts_with("fh2.")));
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing is a no-op, not a panic.
        describe_metrics();
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MetricKind::Histogram.to_string(), "histogram");
    }
}
