//! Factory calibration from OTP.
//!
//! At the factory test stage each part gets a temperature/value pair
//! fused into eFuse: the test temperature (0.1 C units) and the raw code
//! every sensor reported at it. The blob is a run of little-endian
//! 16-bit words:
//!
//! ```text
//! word 0      bits 11:0  factory temperature, 0.1 C (0 = never fused)
//!             bits 13:12 deviation-enable flags
//! word 1..N   raw code of sensor 0..N-1 at that temperature
//! ```
//!
//! The hardware subtracts `CDATA - 0x800` from every raw sample, so the
//! correction for a sensor is how far its factory reading sits above what
//! the nominal formula predicts at the factory temperature. Two 12-bit
//! corrections share each CDATA word, the odd sensor in the high half.

use log::{debug, info, warn};

use crate::config::SensorFamily;
use crate::error::{CalibrationError, InvalidReason};
use crate::ports::NvmemCell;
use crate::regs::{
    CAL_DEFAULT, CAL_FT_TEMP_DEVIATION_EN, CAL_FT_TEMP_MASK, CAL_VAL_MASK, MAX_SENSORS,
    RegisterBus, ThsRegisters,
};

/// Bytes read from the cell. Larger cells are truncated; only the
/// reference word and one word per sensor are ever used.
const CELL_BUF_LEN: usize = 32;

/// Decoded calibration blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationData {
    reference: u16,
    stored: heapless::Vec<u16, MAX_SENSORS>,
}

impl CalibrationData {
    /// Decode the words for `sensor_count` sensors.
    pub fn parse(bytes: &[u8], sensor_count: usize) -> Result<Self, CalibrationError> {
        let sensor_count = sensor_count.min(MAX_SENSORS);
        let need = 2 + 2 * sensor_count;
        if bytes.len() < need {
            return Err(CalibrationError::Invalid(InvalidReason::TooShort {
                len: bytes.len(),
                need,
            }));
        }

        let mut words = bytes
            .chunks_exact(2)
            .map(|w| u16::from_le_bytes([w[0], w[1]]));
        let reference = words.next().unwrap_or(0);
        if reference == 0 {
            return Err(CalibrationError::Invalid(InvalidReason::Unfused));
        }

        Ok(Self {
            reference,
            stored: words.take(sensor_count).collect(),
        })
    }

    /// Factory temperature in 0.1 C units.
    pub fn reference_decidegrees(&self) -> u16 {
        self.reference & CAL_FT_TEMP_MASK
    }

    pub fn reference_millidegrees(&self) -> i32 {
        i32::from(self.reference_decidegrees()) * 100
    }

    pub fn deviation_flags(&self) -> u16 {
        (self.reference & CAL_FT_TEMP_DEVIATION_EN) >> 12
    }

    /// Raw code each sensor reported at the factory temperature.
    pub fn stored(&self) -> &[u16] {
        &self.stored
    }
}

/// One sensor's applied correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCalibration {
    pub sensor: u8,
    pub value: u16,
}

/// What `calibrate` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationReport {
    pub reference_mc: i32,
    /// Raw code the nominal formula predicts at `reference_mc`.
    pub expected_raw: i32,
    pub written: heapless::Vec<SensorCalibration, MAX_SENSORS>,
    /// Sensors left at the hardware default, each as
    /// [`CalibrationError::ValueOutOfRange`].
    pub skipped: heapless::Vec<CalibrationError, MAX_SENSORS>,
}

/// Correction for a sensor that read `stored` where `expected` was due.
/// `None` when it does not fit the 12-bit field.
pub fn correction(expected: i32, stored: u16) -> Option<u16> {
    let diff = expected - i32::from(stored);
    let value = i32::from(CAL_DEFAULT) - diff;
    (0..=i32::from(CAL_VAL_MASK))
        .contains(&value)
        .then_some(value as u16)
}

/// Read the OTP cell and program every sensor's correction.
///
/// Nothing is written unless the blob decodes. A sensor whose correction
/// falls outside 12 bits is skipped with a warning and keeps whatever its
/// register holds; the others are still written. On `Err` the caller
/// decides whether to fall back to [`restore_defaults`].
pub fn calibrate<B, C>(
    regs: &ThsRegisters<B>,
    family: &SensorFamily,
    cell: &C,
) -> Result<CalibrationReport, CalibrationError>
where
    B: RegisterBus,
    C: NvmemCell + ?Sized,
{
    let data = {
        let mut buf = [0u8; CELL_BUF_LEN];
        let len = cell.read(&mut buf).map_err(|e| {
            warn!("calibration: cell read failed: {}", e);
            CalibrationError::Unavailable
        })?;
        CalibrationData::parse(&buf[..len.min(CELL_BUF_LEN)], family.sensor_count)?
    };

    let reference_mc = data.reference_millidegrees();
    let expected_raw = family.conversion.millidegrees_to_raw(reference_mc);
    debug!(
        "calibration: factory {} mC (flags {:#x}), nominal raw {}",
        reference_mc,
        data.deviation_flags(),
        expected_raw
    );

    let mut report = CalibrationReport {
        reference_mc,
        expected_raw,
        written: heapless::Vec::new(),
        skipped: heapless::Vec::new(),
    };

    for (i, &stored) in data.stored().iter().enumerate() {
        let Some(value) = correction(expected_raw, stored) else {
            let value = i32::from(CAL_DEFAULT) - (expected_raw - i32::from(stored));
            warn!(
                "calibration: sensor {} value {:#x} beyond the valid range, keeping default",
                i, value
            );
            let _ = report.skipped.push(CalibrationError::ValueOutOfRange {
                sensor: i as u8,
                value,
            });
            continue;
        };
        write_sensor_cal(regs, i, value);
        let _ = report.written.push(SensorCalibration {
            sensor: i as u8,
            value,
        });
    }

    info!(
        "calibration: {} sensor(s) calibrated, {} skipped",
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Write `value` into `sensor`'s half of its CDATA word, keeping the
/// other half.
pub fn write_sensor_cal<B: RegisterBus>(regs: &ThsRegisters<B>, sensor: usize, value: u16) {
    let pair = sensor / 2;
    let value = u32::from(value & CAL_VAL_MASK);
    let word = regs.read_cal_pair(pair);
    let word = if sensor % 2 == 1 {
        (word & 0x0000_ffff) | (value << 16)
    } else {
        (word & 0xffff_0000) | value
    };
    regs.write_cal_pair(pair, word);
}

/// Put every sensor of the device back on the default correction, so a
/// failed calibration never leaves a mix of calibrated and raw sensors.
///
/// Even sensors get a half-word store; odd sensors a read-modify-write of
/// the high half.
pub fn restore_defaults<B: RegisterBus>(regs: &ThsRegisters<B>, sensor_count: usize) {
    for sensor in 0..sensor_count.min(MAX_SENSORS) {
        if sensor % 2 == 0 {
            regs.write_cal_low(sensor / 2, CAL_DEFAULT);
        } else {
            write_sensor_cal(regs, sensor, CAL_DEFAULT);
        }
    }
}
