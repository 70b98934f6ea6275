//! Routing captured advertisements to configured devices.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use linptech_metrics::{outcome_label, record_outcome, record_skipped, DeviceLabels};
use linptech_model::{product_info, DeviceSet};
use mibeacon_packet::{
    peek_product_id, Advertisement, BindKey, DecodeOutcome, DecodedReading, MacAddress, MiBeaconDecoder,
};
use serde::Serialize;
use tracing::{debug, info, warn, Level};

use crate::CapturedAdvertisement;

/// Decode result for one frame, as printed by the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    /// `ok` or the outcome label.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<DecodedReading>,
}

impl FrameReport {
    pub fn new(result: Result<DecodedReading, DecodeOutcome>) -> Self {
        Self {
            outcome: outcome_label(result.as_ref().map_err(|outcome| *outcome)),
            device: None,
            timestamp: None,
            reading: result.ok(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.reading.is_some()
    }
}

/// Outcome counts over a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Advertisements read from the capture.
    pub advertisements: usize,
    /// Frames decoded, by outcome label.
    pub outcomes: BTreeMap<&'static str, usize>,
    /// Advertisements skipped before decoding, by reason.
    pub skipped: BTreeMap<&'static str, usize>,
}

impl ReplaySummary {
    /// Frames that produced a reading.
    pub fn readings(&self) -> usize {
        self.outcomes.get("ok").copied().unwrap_or(0)
    }
}

/// Log a frame outcome at the level it deserves.
pub fn log_outcome(address: &MacAddress, outcome: DecodeOutcome) {
    let level = outcome.severity();
    if level == Level::WARN {
        warn!("{}: {}", address, outcome);
    } else if level == Level::INFO {
        info!("{}: {}", address, outcome);
    } else {
        debug!("{}: {}", address, outcome);
    }
}

/// Model name for metric labels, taken from the frame's product id.
fn model_label(service_data: &[u8]) -> &'static str {
    peek_product_id(service_data)
        .and_then(product_info)
        .map(|product| product.model)
        .unwrap_or("unknown")
}

/// Decode one advertisement, recording metrics and logging the outcome.
pub fn decode_and_record(
    decoder: &MiBeaconDecoder,
    advertisement: &Advertisement<'_>,
    key: Option<&BindKey>,
) -> Result<DecodedReading, DecodeOutcome> {
    let result = decoder.decode_advertisement(advertisement, key);
    let labels = DeviceLabels::new(
        advertisement.address.to_string(),
        model_label(advertisement.service_data),
    );
    record_outcome(&labels, result.as_ref().map_err(|outcome| *outcome));
    if let Err(outcome) = result {
        log_outcome(&advertisement.address, outcome);
    }
    result
}

/// Replays a capture against a device configuration.
#[derive(Debug)]
pub struct Replayer<'a> {
    devices: &'a DeviceSet,
    summary: ReplaySummary,
}

impl<'a> Replayer<'a> {
    pub fn new(devices: &'a DeviceSet) -> Self {
        Self {
            devices,
            summary: ReplaySummary::default(),
        }
    }

    fn skip(&mut self, reason: &'static str) {
        record_skipped(reason);
        *self.summary.skipped.entry(reason).or_default() += 1;
    }

    /// Process one advertisement.
    ///
    /// Returns `None` when the advertisement carries no MiBeacon data or comes
    /// from an unconfigured device.
    pub fn process(&mut self, captured: &CapturedAdvertisement) -> Option<FrameReport> {
        self.summary.advertisements += 1;

        let Some(service_data) = captured.mibeacon_data() else {
            debug!("{}: no MiBeacon service data", captured.address);
            self.skip("no_service_data");
            return None;
        };
        let Some(device) = self.devices.get(&captured.address) else {
            debug!("{}: not a configured device", captured.address);
            self.skip("unknown_device");
            return None;
        };

        let advertisement = Advertisement {
            address: captured.address,
            rssi: captured.rssi,
            service_data,
        };
        let result = decode_and_record(self.devices.decoder(), &advertisement, device.bindkey.as_ref());

        let mut report = FrameReport::new(result);
        *self.summary.outcomes.entry(report.outcome).or_default() += 1;
        report.device = Some(device.title());
        report.timestamp = captured.timestamp;
        Some(report)
    }

    /// Process every advertisement of a capture, in order.
    pub fn run(&mut self, capture: &[CapturedAdvertisement]) -> Vec<FrameReport> {
        let reports: Vec<FrameReport> = capture.iter().filter_map(|c| self.process(c)).collect();
        info!(
            "Replayed {} advertisement(s): {} reading(s), outcomes {:?}, skipped {:?}",
            self.summary.advertisements,
            self.summary.readings(),
            self.summary.outcomes,
            self.summary.skipped
        );
        reports
    }

    pub fn summary(&self) -> &ReplaySummary {
        &self.summary
    }

    pub fn into_summary(self) -> ReplaySummary {
        self.summary
    }
}
