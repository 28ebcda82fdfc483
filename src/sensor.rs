//! Per-sensor sample latch.
//!
//! The deferred interrupt worker is the only writer of a channel's raw
//! value; the thermal framework reads it whenever it polls. One word,
//! one writer: an atomic store/load pair is all the synchronisation the
//! field needs.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::conversion::Conversion;
use crate::error::SensorError;
use crate::ports::{TemperatureSource, ZoneHandle};

/// One physical sensor.
#[derive(Debug)]
pub struct SensorChannel {
    index: u8,
    /// Last latched raw value. 0 = nothing sampled yet.
    raw: AtomicU32,
    conversion: Conversion,
}

impl SensorChannel {
    pub fn new(index: u8, conversion: Conversion) -> Self {
        Self {
            index,
            raw: AtomicU32::new(0),
            conversion,
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn raw(&self) -> u32 {
        self.raw.load(Ordering::Acquire)
    }

    /// Store a freshly read sample. Interrupt worker only.
    pub(crate) fn latch(&self, raw: u32) {
        self.raw.store(raw, Ordering::Release);
    }

    /// Latest temperature in millidegrees Celsius.
    ///
    /// A zero raw value is never converted: it means no sample has arrived.
    pub fn temperature(&self) -> Result<i32, SensorError> {
        match self.raw() {
            0 => Err(SensorError::SampleNotReady),
            raw => Ok(self.conversion.raw_to_millidegrees(raw)),
        }
    }
}

impl TemperatureSource for SensorChannel {
    fn get_temperature(&self) -> Result<i32, SensorError> {
        self.temperature()
    }
}

/// A channel plus the zone it feeds.
#[derive(Debug, Clone)]
pub struct SensorSlot {
    pub channel: std::sync::Arc<SensorChannel>,
    pub zone: ZoneHandle,
}
