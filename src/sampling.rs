//! Sampling setup and interrupt-status drain.
//!
//! ```text
//!   Uninitialized ──configure──▶ Configured ──irq enable──▶ Armed
//!                                                   │
//!                        drain (per pending sensor) ◀┘
//! ```
//!
//! `configure` programs the acquisition, filter, sense-enable and period
//! registers and then enables the data interrupts. Running it again from
//! any state rewrites the same values.

use log::{debug, info, trace};

use crate::config::SamplingConfig;
use crate::ports::ThermalFramework;
use crate::regs::{RegisterBus, ThsRegisters, data_irq_sts, sensor_mask};
use crate::sensor::SensorSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingState {
    Uninitialized,
    /// Sensors sampling, interrupts still masked.
    Configured,
    /// Data interrupts enabled.
    Armed,
}

/// What one drain pass did, as sensor bitmasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Status bits found set and cleared.
    pub cleared: u32,
    /// Sensors whose zone was notified (non-zero sample).
    pub notified: u32,
}

impl DrainReport {
    pub fn is_empty(&self) -> bool {
        self.cleared == 0
    }
}

#[derive(Debug)]
pub struct Sampler {
    config: SamplingConfig,
    sensor_count: usize,
    state: SamplingState,
}

impl Sampler {
    pub fn new(config: SamplingConfig, sensor_count: usize) -> Self {
        Self {
            config,
            sensor_count,
            state: SamplingState::Uninitialized,
        }
    }

    pub fn state(&self) -> SamplingState {
        self.state
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Program the sampling registers and arm the data interrupts.
    pub fn configure<B: RegisterBus>(&mut self, regs: &ThsRegisters<B>) {
        let mask = sensor_mask(self.sensor_count);
        let period = self.config.period_value();

        regs.write_ctrl0(u32::from(self.config.acquire_time));
        regs.write_filter(u32::from(self.config.filter_type));
        regs.write_sense_enable(mask);
        regs.write_period(period);
        self.state = SamplingState::Configured;
        debug!(
            "sampling: acq={:#x} filter={} period={} ({} ms)",
            self.config.acquire_time, self.config.filter_type, period, self.config.period_ms
        );

        regs.write_irq_enable(mask);
        self.state = SamplingState::Armed;
        info!("sampling: {} sensor(s) armed", self.sensor_count);
    }

    /// Service every pending sensor.
    ///
    /// Each set status bit is cleared before its sample register is read,
    /// so a sample landing in between raises the bit again instead of
    /// being lost. Zero samples are latched but not announced.
    pub fn drain<B, Z>(&self, regs: &ThsRegisters<B>, slots: &[SensorSlot], zones: &Z) -> DrainReport
    where
        B: RegisterBus,
        Z: ThermalFramework + ?Sized,
    {
        let mut report = DrainReport::default();
        let status = regs.irq_status();

        for slot in slots {
            let i = usize::from(slot.channel.index());
            let bit = data_irq_sts(i);
            if status & bit == 0 {
                continue;
            }
            regs.clear_irq_status(bit);
            report.cleared |= bit;

            let raw = regs.sample(i);
            slot.channel.latch(raw);
            trace!("sampling: sensor {} raw {}", i, raw);
            if raw != 0 {
                zones.sample_available(slot.zone);
                report.notified |= bit;
            }
        }
        report
    }
}
