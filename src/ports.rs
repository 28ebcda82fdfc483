//! Port traits: the boundary between the driver core and its host.
//!
//! ```text
//!   PlatformDevice ──▶ probe ──▶ ThsDevice ──▶ ThermalFramework
//!   (regs, irq, clk,            (calibrate,     (zones, new-sample
//!    reset, nvmem)               sample, drain)   events)
//! ```
//!
//! Adapters implement these for real hardware or for simulation. The
//! driver core is generic over them and never names a concrete host type.

use core::fmt;
use std::sync::Arc;

use crate::binding::{RegWindow, ThsNode};
use crate::error::SensorError;
use crate::regs::RegisterBus;

// ───────────────────────────────────────────────────────────────
// Port errors
// ───────────────────────────────────────────────────────────────

/// Failure reported by a host collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    /// The resource is not described or does not exist.
    NotFound,
    /// The provider has not finished initialising; retry later.
    Deferred,
    /// The resource exists but is held by someone else.
    Busy,
    /// Any other failure, with the host's errno.
    Io(i32),
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Deferred => write!(f, "provider not ready"),
            Self::Busy => write!(f, "busy"),
            Self::Io(rc) => write!(f, "I/O error (rc={})", rc),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Platform resources (driven adapter: host → driver)
// ───────────────────────────────────────────────────────────────

pub trait Clock {
    fn prepare_enable(&mut self) -> Result<(), PortError>;
    fn disable_unprepare(&mut self);
}

pub trait ResetControl {
    fn deassert(&mut self) -> Result<(), PortError>;
    fn assert(&mut self) -> Result<(), PortError>;
}

/// Read-only access to one OTP / eFuse cell.
pub trait NvmemCell {
    /// Copy the cell into `buf`. Returns the number of bytes written,
    /// which is the cell size when `buf` is large enough.
    fn read(&self, buf: &mut [u8]) -> Result<usize, PortError>;
}

/// The platform device the host hands to probe.
pub trait PlatformDevice {
    type Bus: RegisterBus;
    type Clock: Clock;
    type Reset: ResetControl;
    type Cell: NvmemCell;

    /// Device name used as the log prefix.
    fn name(&self) -> &str;

    /// The devicetree node this device was created from.
    fn of_node(&self) -> &ThsNode;

    fn ioremap(&mut self, window: RegWindow) -> Result<Self::Bus, PortError>;

    /// Interrupt number of the `index`th `interrupts` entry.
    fn irq(&self, index: usize) -> Result<u32, PortError>;

    /// Install the threaded handler. From here on the host calls the
    /// device's [`IrqLine::top_half`](crate::irq::IrqLine::top_half) when
    /// the line fires.
    fn request_threaded_irq(&mut self, irq: u32) -> Result<(), PortError>;

    /// Uninstall the handler installed by `request_threaded_irq`.
    fn free_irq(&mut self, irq: u32);

    fn clock(&mut self, name: &str) -> Result<Self::Clock, PortError>;

    fn reset_control(&mut self) -> Result<Self::Reset, PortError>;

    fn nvmem_cell(&mut self, name: &str) -> Result<Self::Cell, PortError>;
}

// ───────────────────────────────────────────────────────────────
// Thermal framework (driven adapter: driver → host)
// ───────────────────────────────────────────────────────────────

/// What the thermal framework may ask a registered sensor.
pub trait TemperatureSource {
    /// Latest temperature in millidegrees Celsius.
    fn get_temperature(&self) -> Result<i32, SensorError>;
}

/// Opaque handle to a registered thermal zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneHandle(pub u32);

/// The host's thermal framework.
pub trait ThermalFramework {
    /// Register `source` as the temperature source of sensor `sensor`.
    fn register_zone(
        &mut self,
        sensor: u8,
        source: Arc<dyn TemperatureSource + Send + Sync>,
    ) -> Result<ZoneHandle, PortError>;

    /// Drop `zone` and the framework's reference to its source.
    fn unregister_zone(&mut self, zone: ZoneHandle);

    /// A new sample is available for `zone`. Called from the deferred
    /// interrupt worker.
    fn sample_available(&self, zone: ZoneHandle);
}
