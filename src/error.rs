//! Unified error types for the THS driver.
//!
//! A single `Error` enum that every subsystem converts into, so probe, the
//! interrupt path and the registry all report failures the same way.
//! Every variant is `Copy` and carries enough detail to tell which resource
//! failed.

use core::fmt;

use crate::config::ConfigError;

/// Linux errno values, as reported upward to the host framework.
pub mod errno {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENXIO: i32 = 6;
    pub const ENOMEM: i32 = 12;
    pub const EBUSY: i32 = 16;
    pub const EEXIST: i32 = 17;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const ENOSPC: i32 = 28;
    pub const ENODATA: i32 = 61;
    pub const EPROBE_DEFER: i32 = 517;
}

// ---------------------------------------------------------------------------
// Top-level driver error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A mandatory hardware resource is missing or failed. Fatal for probe.
    Resource(ResourceError),
    /// A dependency is still initialising; the host retries probe later.
    DeferredRetry(&'static str),
    /// Factory calibration could not be applied. Probe tolerates this.
    Calibration(CalibrationError),
    /// A temperature query could not be answered.
    Sensor(SensorError),
    /// Sampling parameters failed validation.
    Config(ConfigError),
    /// Device registry bookkeeping failed.
    Registry(RegistryError),
}

impl Error {
    /// Negative errno the host would see for this failure.
    pub fn errno(&self) -> i32 {
        let code = match self {
            Self::Resource(e) => e.errno(),
            Self::DeferredRetry(_) => errno::EPROBE_DEFER,
            Self::Calibration(CalibrationError::Unavailable) => errno::ENODATA,
            Self::Calibration(_) => errno::EINVAL,
            Self::Sensor(SensorError::SampleNotReady) => errno::EBUSY,
            Self::Sensor(SensorError::NoSuchSensor(_)) => errno::EINVAL,
            Self::Config(_) => errno::EINVAL,
            Self::Registry(RegistryError::Full) => errno::ENOSPC,
            Self::Registry(RegistryError::AlreadyBound) => errno::EEXIST,
            Self::Registry(RegistryError::NotBound) => errno::ENODEV,
        };
        -code
    }

    /// True for failures the host resolves by probing again later.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::DeferredRetry(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(e) => write!(f, "resource: {e}"),
            Self::DeferredRetry(what) => write!(f, "deferred: waiting for {what}"),
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// No entry of the match table fits the node's `compatible`.
    NoMatchData,
    /// The node has no usable `reg` window.
    NoMemResource,
    /// The register window could not be mapped.
    MapFailed,
    /// No interrupt line is described for the device.
    IrqUnavailable,
    /// The threaded interrupt handler could not be installed.
    IrqRequestFailed,
    /// The `bus` clock could not be looked up.
    ClockUnavailable,
    /// The `bus` clock could not be enabled.
    ClockEnableFailed,
    /// The reset line could not be looked up.
    ResetUnavailable,
    /// The reset line could not be deasserted.
    ResetDeassertFailed,
    /// The thermal framework refused a zone for this sensor index.
    ZoneRegistrationFailed(u8),
    /// The devicetree node violates the binding.
    InvalidBinding(&'static str),
}

impl ResourceError {
    fn errno(self) -> i32 {
        match self {
            Self::NoMatchData | Self::NoMemResource | Self::InvalidBinding(_) => errno::EINVAL,
            Self::MapFailed => errno::ENOMEM,
            Self::IrqUnavailable => errno::ENXIO,
            Self::IrqRequestFailed => errno::EBUSY,
            Self::ClockUnavailable | Self::ResetUnavailable => errno::ENOENT,
            Self::ClockEnableFailed | Self::ResetDeassertFailed => errno::EIO,
            Self::ZoneRegistrationFailed(_) => errno::ENODEV,
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchData => write!(f, "no match data for compatible"),
            Self::NoMemResource => write!(f, "no memory resources defined"),
            Self::MapFailed => write!(f, "failed to ioremap THS registers"),
            Self::IrqUnavailable => write!(f, "failed to get IRQ"),
            Self::IrqRequestFailed => write!(f, "failed to request threaded IRQ"),
            Self::ClockUnavailable => write!(f, "failed to get bus clock"),
            Self::ClockEnableFailed => write!(f, "failed to enable bus clock"),
            Self::ResetUnavailable => write!(f, "failed to get reset control"),
            Self::ResetDeassertFailed => write!(f, "reset deassert failed"),
            Self::ZoneRegistrationFailed(i) => write!(f, "failed to register thermal zone {i}"),
            Self::InvalidBinding(what) => write!(f, "invalid devicetree node: {what}"),
        }
    }
}

impl From<ResourceError> for Error {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The OTP cell could not be read.
    Unavailable,
    /// The OTP cell content is unusable.
    Invalid(InvalidReason),
    /// One sensor's derived value does not fit the 12-bit field. Reported
    /// per sensor in [`CalibrationReport`](crate::calibration::CalibrationReport),
    /// never returned for the whole device.
    ValueOutOfRange { sensor: u8, value: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Fewer bytes than the reference word plus one word per sensor.
    TooShort { len: usize, need: usize },
    /// Reference word is zero: the part was never fused.
    Unfused,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "calibration data unavailable"),
            Self::Invalid(InvalidReason::TooShort { len, need }) => {
                write!(f, "calibration data too short ({len} < {need} bytes)")
            }
            Self::Invalid(InvalidReason::Unfused) => write!(f, "calibration data not fused"),
            Self::ValueOutOfRange { sensor, value } => write!(
                f,
                "sensor {sensor} calibration value {value:#x} beyond the valid range"
            ),
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// No sample has been latched yet; query again later.
    SampleNotReady,
    /// The device has no sensor with this index.
    NoSuchSensor(u8),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleNotReady => write!(f, "sample not ready"),
            Self::NoSuchSensor(i) => write!(f, "no sensor {i}"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    Full,
    AlreadyBound,
    NotBound,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "no free device slot"),
            Self::AlreadyBound => write!(f, "device already bound"),
            Self::NotBound => write!(f, "device not bound"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Driver-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
