//! Metrics for Linptech BLE decoding.
//!
//! This crate declares every metric the runner emits as a structured
//! [`Metric`] constant and provides label helpers. It re-exports the `metrics`
//! crate for convenience. Without an installed recorder all recording is a
//! no-op.
//!
//! # Example
//!
//! ```rust
//! use linptech_metrics::{metric_defs, record_outcome, DeviceLabels};
//! use mibeacon_packet::DecodeOutcome;
//!
//! let labels = DeviceLabels::new("A4:C1:38:5A:0B:1C", "PS1BB");
//! record_outcome(&labels, Err(DecodeOutcome::NoData));
//! metrics::counter!(metric_defs::READINGS.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use mibeacon_packet::{DecodeOutcome, DecodedReading};

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

/// A metric declaration with its metadata.
///
/// ```rust
/// use linptech_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("linptech.example.frames")
///     .with_description("Frames seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["outcome"]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name.
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
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
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
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

/// All metric definitions.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on all device-scoped metrics.
    pub const DEVICE_LABELS: &[&str] = &["device", "model"];

    /// Frames handed to the decoder, by outcome.
    ///
    /// Labels: device, model, outcome (`ok` or a [`DecodeOutcome`](mibeacon_packet::DecodeOutcome) label)
    pub const FRAMES: Metric = Metric::counter("linptech.decode.frames")
        .with_description("MiBeacon frames decoded, by outcome")
        .with_unit(Unit::Count)
        .with_labels(&["device", "model", "outcome"]);

    /// Readings produced.
    pub const READINGS: Metric = Metric::counter("linptech.decode.readings")
        .with_description("Sensor readings produced")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    /// Received signal strength of advertisements that produced a reading.
    pub const RSSI: Metric = Metric::histogram("linptech.decode.rssi_dbm")
        .with_description("Received signal strength in dBm")
        .with_labels(DEVICE_LABELS);

    /// Last reported battery level.
    pub const BATTERY: Metric = Metric::gauge("linptech.device.battery_percent")
        .with_description("Last reported battery level")
        .with_unit(Unit::Percent)
        .with_labels(DEVICE_LABELS);

    /// Advertisements not routed to any decoder.
    ///
    /// Labels: reason (`no_service_data`, `unknown_device`)
    pub const SKIPPED: Metric = Metric::counter("linptech.capture.skipped")
        .with_description("Advertisements skipped before decoding")
        .with_unit(Unit::Count)
        .with_labels(&["reason"]);

    /// All metrics, for registration.
    pub const ALL: &[Metric] = &[FRAMES, READINGS, RSSI, BATTERY, SKIPPED];
}

/// Labels identifying a configured device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLabels {
    /// Device address.
    pub device: String,
    /// Product model name.
    pub model: String,
}

impl DeviceLabels {
    /// Create labels for a device.
    pub fn new(device: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            model: model.into(),
        }
    }

    /// Returns the labels as key-value pairs for the metrics crate.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("device", self.device.clone()), ("model", self.model.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Label value for a decode result.
pub fn outcome_label(result: Result<&DecodedReading, DecodeOutcome>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(outcome) => outcome.as_str(),
    }
}

/// Record the metrics for one decode result.
pub fn record_outcome(labels: &DeviceLabels, result: Result<&DecodedReading, DecodeOutcome>) {
    let outcome = outcome_label(result);
    metrics::counter!(
        metric_defs::FRAMES.name,
        &labels.with(&[("outcome", outcome.to_string())])
    )
    .increment(1);

    if let Ok(reading) = result {
        metrics::counter!(metric_defs::READINGS.name, &labels.to_labels()).increment(1);
        if let Some(rssi) = reading.signal_strength_dbm {
            metrics::histogram!(metric_defs::RSSI.name, &labels.to_labels()).record(rssi as f64);
        }
        if let Some(battery) = reading.battery_percent {
            metrics::gauge!(metric_defs::BATTERY.name, &labels.to_labels()).set(battery as f64);
        }
    }
}

/// Record an advertisement skipped before decoding.
pub fn record_skipped(reason: &'static str) {
    metrics::counter!(metric_defs::SKIPPED.name, "reason" => reason).increment(1);
}

/// Describes all metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
