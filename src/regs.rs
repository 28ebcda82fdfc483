//! H6 THS register map and typed accessors.
//!
//! ```text
//!  0x00 CTRL0          acquisition time (bits 31:16)
//!  0x04 CTRL2          per-sensor sense enable
//!  0x08 PER            sampling period (bits 31:12)
//!  0x10 DATA_INT_CTRL  per-sensor data IRQ enable
//!  0x20 DATA_INT_STAT  per-sensor data IRQ status, write 1 to clear
//!  0x30 FILTER         averaging filter enable + type
//!  0xa0 CDATA(n)       calibration, two sensors per word (odd sensor high)
//!  0xc0 DATA(n)        latest raw sample per sensor
//! ```
//!
//! Every access goes straight to the [`RegisterBus`]; nothing is cached.

use std::sync::Arc;

pub const CTRL0: usize = 0x00;
pub const CTRL2: usize = 0x04;
pub const PER: usize = 0x08;
pub const DATA_INT_CTRL: usize = 0x10;
pub const DATA_INT_STAT: usize = 0x20;
pub const FILTER: usize = 0x30;

/// Calibration word holding sensors `2 * pair` (low half) and `2 * pair + 1`.
pub const fn cdata(pair: usize) -> usize {
    0xa0 + 4 * pair
}

/// Raw sample of `sensor`.
pub const fn data(sensor: usize) -> usize {
    0xc0 + 4 * sensor
}

/// Upper bound on sensors any THS revision carries.
pub const MAX_SENSORS: usize = 4;

/// Size of the mapped window.
pub const WINDOW_SIZE: usize = 0x100;

pub const CTRL0_UNK: u32 = 0x0000_002f;
pub const FILTER_EN: u32 = 1 << 2;

pub const CAL_DEFAULT: u16 = 0x800;
pub const CAL_VAL_MASK: u16 = 0xfff;
pub const CAL_FT_TEMP_MASK: u16 = 0x0fff;
pub const CAL_FT_TEMP_DEVIATION_EN: u16 = 0x3000;

pub const fn ctrl0_sensor_acq0(x: u32) -> u32 {
    x << 16
}

pub const fn sense_en(n: usize) -> u32 {
    1 << n
}

pub const fn per_thermal_per(x: u32) -> u32 {
    x << 12
}

pub const fn data_irq_en(n: usize) -> u32 {
    1 << n
}

pub const fn data_irq_sts(n: usize) -> u32 {
    1 << n
}

pub const fn filter_type(x: u32) -> u32 {
    x
}

/// One bit per sensor in `0..count`, as CTRL2 / DATA_INT_* expect.
pub const fn sensor_mask(count: usize) -> u32 {
    if count >= 32 { u32::MAX } else { (1 << count) - 1 }
}

// ───────────────────────────────────────────────────────────────
// Bus port
// ───────────────────────────────────────────────────────────────

/// Raw access to the mapped register window.
///
/// Writes take `&self`: the window is hardware state, and the deferred
/// interrupt worker writes status bits while queries read samples.
pub trait RegisterBus {
    fn read32(&self, offset: usize) -> u32;
    fn write32(&self, offset: usize, value: u32);
    /// Store the low half-word at `offset`, leaving the high half alone.
    fn write16(&self, offset: usize, value: u16);
}

impl<T: RegisterBus + ?Sized> RegisterBus for Arc<T> {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn write16(&self, offset: usize, value: u16) {
        (**self).write16(offset, value);
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    fn write16(&self, offset: usize, value: u16) {
        (**self).write16(offset, value);
    }
}

// ───────────────────────────────────────────────────────────────
// Typed accessors
// ───────────────────────────────────────────────────────────────

/// The THS register block behind a bus.
pub struct ThsRegisters<B> {
    bus: B,
}

impl<B: RegisterBus> ThsRegisters<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Program the acquisition time (in THS clock cycles).
    pub fn write_ctrl0(&self, acquire_time: u32) {
        self.bus
            .write32(CTRL0, ctrl0_sensor_acq0(acquire_time) | CTRL0_UNK);
    }

    /// Enable the averaging filter with the given type.
    pub fn write_filter(&self, kind: u32) {
        self.bus.write32(FILTER, FILTER_EN | filter_type(kind));
    }

    pub fn write_sense_enable(&self, mask: u32) {
        self.bus.write32(CTRL2, mask);
    }

    pub fn write_period(&self, period: u32) {
        self.bus.write32(PER, per_thermal_per(period));
    }

    pub fn write_irq_enable(&self, mask: u32) {
        self.bus.write32(DATA_INT_CTRL, mask);
    }

    pub fn irq_status(&self) -> u32 {
        self.bus.read32(DATA_INT_STAT)
    }

    /// Write-1-to-clear the given status bits. Sample registers keep
    /// their content.
    pub fn clear_irq_status(&self, mask: u32) {
        self.bus.write32(DATA_INT_STAT, mask);
    }

    pub fn read_cal_pair(&self, pair: usize) -> u32 {
        self.bus.read32(cdata(pair))
    }

    pub fn write_cal_pair(&self, pair: usize, value: u32) {
        self.bus.write32(cdata(pair), value);
    }

    /// Half-word store into the low (even sensor) half of a pair.
    pub fn write_cal_low(&self, pair: usize, value: u16) {
        self.bus.write16(cdata(pair), value);
    }

    pub fn sample(&self, sensor: usize) -> u32 {
        self.bus.read32(data(sensor))
    }
}
