//! Mock thermal framework and platform helpers for integration tests.
//!
//! `RecordingZones` records every registration and notification so tests
//! can assert on the full history; clones share the record.

use std::sync::{Arc, Mutex};

use sun50i_ths::adapters::sim::{SimPlatform, SimRegisters};
use sun50i_ths::binding::ThsNode;
use sun50i_ths::ports::{PortError, TemperatureSource, ThermalFramework, ZoneHandle};

pub const DEVICE: &str = "5070400.thermal-sensor";

/// 30.0 C; sensor 0 read 2345, sensor 1 read 2360 (nominal 2348).
pub const CAL_BLOB: [u8; 6] = [0x2c, 0x01, 0x29, 0x09, 0x38, 0x09];

// ── Framework call record ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneCall {
    Registered { sensor: u8, zone: ZoneHandle },
    Unregistered(ZoneHandle),
    Sample(ZoneHandle),
}

type Source = Arc<dyn TemperatureSource + Send + Sync>;

#[derive(Default)]
struct Inner {
    calls: Vec<ZoneCall>,
    sources: Vec<(ZoneHandle, Source)>,
    next: u32,
}

// ── RecordingZones ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingZones {
    inner: Arc<Mutex<Inner>>,
    /// Refuse registration of this sensor index with this error.
    pub fail_on: Option<(u8, PortError)>,
}

#[allow(dead_code)]
impl RecordingZones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(sensor: u8, e: PortError) -> Self {
        Self {
            fail_on: Some((sensor, e)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ZoneCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn samples(&self) -> Vec<ZoneHandle> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ZoneCall::Sample(z) => Some(z),
                _ => None,
            })
            .collect()
    }

    pub fn registered(&self) -> usize {
        self.inner.lock().unwrap().sources.len()
    }

    /// Query zone `zone` the way the thermal core would.
    pub fn read(&self, zone: ZoneHandle) -> Option<Result<i32, sun50i_ths::error::SensorError>> {
        let inner = self.inner.lock().unwrap();
        inner
            .sources
            .iter()
            .find(|(z, _)| *z == zone)
            .map(|(_, s)| s.get_temperature())
    }
}

impl ThermalFramework for RecordingZones {
    fn register_zone(&mut self, sensor: u8, source: Source) -> Result<ZoneHandle, PortError> {
        if let Some((s, e)) = self.fail_on {
            if s == sensor {
                return Err(e);
            }
        }
        let mut inner = self.inner.lock().unwrap();
        let zone = ZoneHandle(inner.next);
        inner.next += 1;
        inner.sources.push((zone, source));
        inner.calls.push(ZoneCall::Registered { sensor, zone });
        Ok(zone)
    }

    fn unregister_zone(&mut self, zone: ZoneHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.sources.retain(|(z, _)| *z != zone);
        inner.calls.push(ZoneCall::Unregistered(zone));
    }

    fn sample_available(&self, zone: ZoneHandle) {
        self.inner.lock().unwrap().calls.push(ZoneCall::Sample(zone));
    }
}

// ── Platform helpers ──────────────────────────────────────────

#[allow(dead_code)]
pub fn h6_platform() -> SimPlatform {
    SimPlatform::new(
        DEVICE,
        ThsNode::h6_reference().unwrap(),
        Arc::new(SimRegisters::new()),
    )
}

#[allow(dead_code)]
pub fn calibrated_platform() -> SimPlatform {
    h6_platform().with_calibration(&CAL_BLOB)
}
