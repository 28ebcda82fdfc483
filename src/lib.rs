//! Allwinner H6 thermal sensor (THS) driver.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │  Mmio / SimRegisters     SimPlatform      LogThermalZones    │
//! │  (RegisterBus)           (PlatformDevice) (ThermalFramework) │
//! │                                                              │
//! │  ───────────────── Port Trait Boundary ─────────────────     │
//! │                                                              │
//! │   registry ─▶ device::probe ─▶ calibration ─▶ sampling       │
//! │                    │                             │           │
//! │                 irq (top half ─▶ worker) ─▶ drain ─▶ sensor  │
//! │                                                 conversion   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core is host-agnostic: it talks to registers, clocks, resets,
//! OTP and the thermal framework only through [`ports`] and
//! [`regs::RegisterBus`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod binding;
pub mod calibration;
pub mod config;
pub mod conversion;
pub mod device;
pub mod error;
pub mod irq;
pub mod ports;
pub mod registry;
pub mod regs;
pub mod sampling;
pub mod sensor;

pub use error::{Error, Result};
