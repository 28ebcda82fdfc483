//! Sampling parameters and sensor-family descriptors.
//!
//! [`SamplingConfig`] holds the tunables written into the THS at init.
//! The defaults reproduce the vendor setup: 20 us acquisition, an
//! average over 8 samples, one reported sample every 10 ms.
//!
//! [`SensorFamily`] is immutable match data selected by the devicetree
//! `compatible` string.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::conversion::Conversion;
use crate::regs::MAX_SENSORS;

/// Largest value the 20-bit PER field holds.
const PER_FIELD_MAX: u32 = 0xf_ffff;

/// Sampling and filtering setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Acquisition time in THS clock cycles (0x1df = 20 us).
    pub acquire_time: u16,
    /// Averaging filter type; the hardware averages 2^(n+1) samples.
    pub filter_type: u8,
    /// Target interval between reported samples.
    pub period_ms: u32,
    /// THS input clock.
    pub clock_hz: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            acquire_time: 0x1df,
            filter_type: 2,
            period_ms: 10,
            clock_hz: 240_000_000,
        }
    }
}

impl SamplingConfig {
    /// Number of samples the averaging filter folds into one report.
    pub fn filter_div(&self) -> u32 {
        1 << (u32::from(self.filter_type) + 1)
    }

    /// Value for the PER field: filtered periods of 4096 clocks, minus one.
    pub fn period_value(&self) -> u32 {
        let clocks = u64::from(self.period_ms) * u64::from(self.clock_hz / 1000);
        let units = clocks / u64::from(self.filter_div()) / 4096;
        units.saturating_sub(1).min(u64::from(PER_FIELD_MAX)) as u32
    }

    /// Range-check every field. Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter_type > 3 {
            return Err(ConfigError::ValidationFailed("filter_type must be 0-3"));
        }
        if self.acquire_time == 0 {
            return Err(ConfigError::ValidationFailed("acquire_time must be non-zero"));
        }
        if self.clock_hz < 1000 {
            return Err(ConfigError::ValidationFailed("clock_hz must be at least 1 kHz"));
        }
        if self.period_ms == 0 {
            return Err(ConfigError::ValidationFailed("period_ms must be non-zero"));
        }
        let clocks = u64::from(self.period_ms) * u64::from(self.clock_hz / 1000);
        let units = clocks / u64::from(self.filter_div()) / 4096;
        if units == 0 {
            return Err(ConfigError::ValidationFailed(
                "period_ms too short for clock and filter",
            ));
        }
        if units - 1 > u64::from(PER_FIELD_MAX) {
            return Err(ConfigError::ValidationFailed("period_ms overflows the PER field"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor families
// ───────────────────────────────────────────────────────────────

/// Per-revision match data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFamily {
    pub name: &'static str,
    /// Physical sensors on the die, at most [`MAX_SENSORS`].
    pub sensor_count: usize,
    pub conversion: Conversion,
}

/// Allwinner H6: CPU and GPU sensors.
pub const SUN50I_H6: SensorFamily = SensorFamily {
    name: "sun50i-h6",
    sensor_count: 2,
    conversion: Conversion::H6,
};

const _: () = assert!(SUN50I_H6.sensor_count <= MAX_SENSORS);
