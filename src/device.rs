//! Device context: probe, interrupt servicing, removal.
//!
//! `probe` acquires resources in a fixed order and unwinds exactly what
//! it acquired when a later step fails:
//!
//! ```text
//!  match ─▶ ioremap ─▶ irq ─▶ clk get ─▶ rst get ─▶ deassert ─▶ clk enable
//!                                                      │            │
//!                                                  (fail: ─)  (fail: assert)
//!  ─▶ nvmem + calibrate ─▶ zones ─▶ configure
//!        │ (deferred)       │ (fail: unregister earlier zones)
//!        └── disable clk, assert reset ──┘
//! ```
//!
//! Any failure after the IRQ request also frees the IRQ, last.
//!
//! Calibration problems never fail probe: the sensors still work on the
//! hardware default, only less accurately.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::binding::ThsNode;
use crate::calibration::{CalibrationReport, calibrate, restore_defaults};
use crate::config::{SamplingConfig, SensorFamily};
use crate::error::{CalibrationError, Error, ResourceError, Result, SensorError};
use crate::irq::IrqLine;
use crate::ports::{Clock, PlatformDevice, PortError, ResetControl, ThermalFramework};
use crate::regs::{MAX_SENSORS, RegisterBus, ThsRegisters};
use crate::sampling::{DrainReport, Sampler, SamplingState};
use crate::sensor::{SensorChannel, SensorSlot};

/// How the calibration step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Corrections programmed from OTP.
    Applied(CalibrationReport),
    /// The blob was unusable; every sensor is back on the default.
    Defaulted(CalibrationError),
    /// No calibration cell; registers keep their reset values.
    Missing,
}

/// Device context for a platform device `P` feeding thermal framework `Z`.
pub type DeviceOf<P, Z> = ThsDevice<
    <P as PlatformDevice>::Bus,
    <P as PlatformDevice>::Clock,
    <P as PlatformDevice>::Reset,
    Z,
>;

pub struct ThsDevice<B, C, R, Z> {
    name: heapless::String<32>,
    family: &'static SensorFamily,
    regs: ThsRegisters<B>,
    clock: C,
    reset: R,
    irq: IrqLine,
    sampler: Sampler,
    sensors: heapless::Vec<SensorSlot, MAX_SENSORS>,
    zones: Z,
    calibration: CalibrationStatus,
}

/// `name` cut to the first 32 bytes that form whole characters.
pub(crate) fn short_name(name: &str) -> heapless::String<32> {
    let mut out = heapless::String::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Turn a failed acquisition step into the probe error, logging it.
fn acquire_failed(dev: &str, what: &'static str, e: PortError, fatal: ResourceError) -> Error {
    match e {
        PortError::Deferred => {
            info!("{}: {} not ready, deferring probe", dev, what);
            Error::DeferredRetry(what)
        }
        _ => {
            error!("{}: {} failed: {}", dev, what, e);
            fatal.into()
        }
    }
}

/// One zone per sensor. On failure the zones already registered are
/// dropped again, newest first.
fn register_zones<Z: ThermalFramework>(
    zones: &mut Z,
    family: &SensorFamily,
) -> core::result::Result<heapless::Vec<SensorSlot, MAX_SENSORS>, (u8, PortError)> {
    let mut sensors: heapless::Vec<SensorSlot, MAX_SENSORS> = heapless::Vec::new();
    for i in 0..family.sensor_count.min(MAX_SENSORS) as u8 {
        let channel = Arc::new(SensorChannel::new(i, family.conversion));
        match zones.register_zone(i, channel.clone()) {
            Ok(zone) => {
                let _ = sensors.push(SensorSlot { channel, zone });
            }
            Err(e) => {
                for slot in sensors.iter().rev() {
                    zones.unregister_zone(slot.zone);
                }
                return Err((i, e));
            }
        }
    }
    Ok(sensors)
}

impl<B, C, R, Z> ThsDevice<B, C, R, Z>
where
    B: RegisterBus,
    C: Clock,
    R: ResetControl,
    Z: ThermalFramework,
{
    pub fn probe<P>(pdev: &mut P, zones: Z, config: SamplingConfig) -> Result<Self>
    where
        P: PlatformDevice<Bus = B, Clock = C, Reset = R>,
    {
        let name = short_name(pdev.name());
        config.validate().inspect_err(|e| error!("{}: {}", name, e))?;

        let node: &ThsNode = pdev.of_node();
        let family = node.validate().inspect_err(|e| error!("{}: {}", name, e))?;
        let window = node.reg.ok_or(ResourceError::NoMemResource)?;

        // ── Resources ─────────────────────────────────────────
        let bus = pdev
            .ioremap(window)
            .map_err(|e| acquire_failed(&name, "ioremap", e, ResourceError::MapFailed))?;
        let irq_no = pdev
            .irq(0)
            .map_err(|e| acquire_failed(&name, "irq", e, ResourceError::IrqUnavailable))?;
        pdev.request_threaded_irq(irq_no).map_err(|e| {
            acquire_failed(&name, "request irq", e, ResourceError::IrqRequestFailed)
        })?;

        let device = Self::bring_up(pdev, name, family, bus, irq_no, zones, config);
        if device.is_err() {
            pdev.free_irq(irq_no);
        }
        device
    }

    /// Everything after the IRQ request. On error, nothing acquired here
    /// is left held.
    fn bring_up<P>(
        pdev: &mut P,
        name: heapless::String<32>,
        family: &'static SensorFamily,
        bus: B,
        irq_no: u32,
        mut zones: Z,
        config: SamplingConfig,
    ) -> Result<Self>
    where
        P: PlatformDevice<Bus = B, Clock = C, Reset = R>,
    {
        let mut clock = pdev
            .clock("bus")
            .map_err(|e| acquire_failed(&name, "bus clock", e, ResourceError::ClockUnavailable))?;
        let mut reset = pdev
            .reset_control()
            .map_err(|e| acquire_failed(&name, "reset", e, ResourceError::ResetUnavailable))?;

        reset.deassert().map_err(|e| {
            acquire_failed(&name, "reset deassert", e, ResourceError::ResetDeassertFailed)
        })?;
        if let Err(e) = clock.prepare_enable() {
            let _ = reset.assert();
            return Err(acquire_failed(
                &name,
                "bus clock enable",
                e,
                ResourceError::ClockEnableFailed,
            ));
        }

        let regs = ThsRegisters::new(bus);

        // ── Calibration ───────────────────────────────────────
        let calibration = match pdev.nvmem_cell("calibration") {
            Err(PortError::Deferred) => {
                info!("{}: calibration cell not ready, deferring probe", name);
                clock.disable_unprepare();
                let _ = reset.assert();
                return Err(Error::DeferredRetry("calibration cell"));
            }
            Err(e) => {
                warn!("{}: no calibration cell ({}), running uncalibrated", name, e);
                CalibrationStatus::Missing
            }
            Ok(cell) => match calibrate(&regs, family, &cell) {
                Ok(report) => CalibrationStatus::Applied(report),
                Err(e) => {
                    warn!("{}: calibration failed: {}, reverting to defaults", name, e);
                    restore_defaults(&regs, family.sensor_count);
                    CalibrationStatus::Defaulted(e)
                }
            },
        };

        // ── Thermal zones ─────────────────────────────────────
        let sensors = match register_zones(&mut zones, family) {
            Ok(sensors) => sensors,
            Err((i, e)) => {
                clock.disable_unprepare();
                let _ = reset.assert();
                return Err(acquire_failed(
                    &name,
                    "thermal zone",
                    e,
                    ResourceError::ZoneRegistrationFailed(i),
                ));
            }
        };

        let mut sampler = Sampler::new(config, family.sensor_count);
        sampler.configure(&regs);

        info!(
            "{}: {} THS up, {} sensor(s), irq {}",
            name, family.name, family.sensor_count, irq_no
        );
        Ok(Self {
            name,
            family,
            regs,
            clock,
            reset,
            irq: IrqLine::new(irq_no),
            sampler,
            sensors,
            zones,
            calibration,
        })
    }

    /// Release the device: stop the worker, unregister the zones, assert
    /// reset, gate the clock, free the interrupt.
    ///
    /// Consuming `self` means no worker borrow can outlive this call.
    pub fn remove<P: PlatformDevice>(mut self, pdev: &mut P) {
        self.irq.stop();
        for slot in self.sensors.iter().rev() {
            self.zones.unregister_zone(slot.zone);
        }
        if let Err(e) = self.reset.assert() {
            warn!("{}: reset assert failed: {}", self.name, e);
        }
        self.clock.disable_unprepare();
        pdev.free_irq(self.irq.number());
        info!("{}: removed", self.name);
    }

    // ── Interrupt path ────────────────────────────────────────

    /// One deferred-worker pass: drain every pending sensor.
    pub fn handle_threaded_irq(&self) -> DrainReport {
        let report = self.sampler.drain(&self.regs, &self.sensors, &self.zones);
        self.irq.mark_serviced();
        if report.is_empty() {
            debug!("{}: spurious wake-up", self.name);
        }
        report
    }

    /// Run a worker pass if the top half left one pending.
    pub fn service_pending(&self) -> Option<DrainReport> {
        self.irq
            .take_pending()
            .then(|| self.handle_threaded_irq())
    }

    /// The deferred worker. Returns once the line is stopped.
    pub async fn irq_thread(&self) {
        debug!("{}: irq worker running", self.name);
        while self.irq.wait().await {
            self.handle_threaded_irq();
        }
        debug!("{}: irq worker stopped", self.name);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Latest temperature of `sensor` in millidegrees Celsius.
    pub fn temperature(&self, sensor: u8) -> Result<i32> {
        let slot = self
            .sensors
            .get(usize::from(sensor))
            .ok_or(SensorError::NoSuchSensor(sensor))?;
        Ok(slot.channel.temperature()?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> &'static SensorFamily {
        self.family
    }

    pub fn irq(&self) -> &IrqLine {
        &self.irq
    }

    pub fn registers(&self) -> &ThsRegisters<B> {
        &self.regs
    }

    pub fn sensors(&self) -> &[SensorSlot] {
        &self.sensors
    }

    pub fn sampling_state(&self) -> SamplingState {
        self.sampler.state()
    }

    pub fn calibration(&self) -> &CalibrationStatus {
        &self.calibration
    }

    pub fn zones(&self) -> &Z {
        &self.zones
    }
}
