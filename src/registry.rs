//! Bound-device table and deferred-probe list.
//!
//! Replaces a module-global driver singleton: every bound device lives in
//! a fixed-capacity map keyed by its platform name. Devices whose probe
//! asked to be retried wait in the deferred list, holding on to their
//! platform device, until [`DriverRegistry::retry_deferred`] runs.

use heapless::FnvIndexMap;
use log::{info, warn};

use crate::config::SamplingConfig;
use crate::device::{DeviceOf, ThsDevice};
use crate::error::{Error, RegistryError, Result};
use crate::ports::{PlatformDevice, ThermalFramework};

pub type DeviceId = heapless::String<32>;

/// Registry key for a platform device name (truncated to 32 bytes).
pub fn device_id(name: &str) -> DeviceId {
    crate::device::short_name(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    /// Parked on the deferred list; names the missing dependency.
    Deferred(&'static str),
}

/// A bound device and the platform device it was probed from.
pub struct Binding<P: PlatformDevice, Z> {
    pub pdev: P,
    pub device: DeviceOf<P, Z>,
}

/// Up to `N` devices (`N` a power of two, at least 2).
pub struct DriverRegistry<P: PlatformDevice, Z, const N: usize> {
    bound: FnvIndexMap<DeviceId, Binding<P, Z>, N>,
    deferred: heapless::Vec<(DeviceId, P), N>,
    zones: Z,
    config: SamplingConfig,
}

impl<P, Z, const N: usize> DriverRegistry<P, Z, N>
where
    P: PlatformDevice,
    Z: ThermalFramework + Clone,
{
    /// Every device bound through this registry feeds `zones`.
    pub fn new(zones: Z, config: SamplingConfig) -> Self {
        const {
            assert!(
                N > 1 && N.is_power_of_two(),
                "registry capacity must be a power of two >= 2"
            )
        };
        Self {
            bound: FnvIndexMap::new(),
            deferred: heapless::Vec::new(),
            zones,
            config,
        }
    }

    /// Probe `pdev` and record the outcome.
    pub fn bind(&mut self, pdev: P) -> Result<BindOutcome> {
        let id = device_id(pdev.name());
        if self.bound.contains_key(&id) || self.deferred.iter().any(|(d, _)| *d == id) {
            return Err(RegistryError::AlreadyBound.into());
        }
        if self.bound.len() + self.deferred.len() >= N {
            return Err(RegistryError::Full.into());
        }
        self.probe_into(id, pdev)
    }

    fn probe_into(&mut self, id: DeviceId, mut pdev: P) -> Result<BindOutcome> {
        match ThsDevice::probe(&mut pdev, self.zones.clone(), self.config) {
            Ok(device) => {
                if let Err((_, mut rejected)) = self.bound.insert(id, Binding { pdev, device }) {
                    rejected.device.remove(&mut rejected.pdev);
                    return Err(RegistryError::Full.into());
                }
                Ok(BindOutcome::Bound)
            }
            Err(Error::DeferredRetry(what)) => {
                info!("{}: probe deferred ({})", id, what);
                self.deferred
                    .push((id, pdev))
                    .map_err(|_| RegistryError::Full)?;
                Ok(BindOutcome::Deferred(what))
            }
            Err(e) => Err(e),
        }
    }

    /// Re-probe every deferred device. Returns how many bound.
    ///
    /// Devices that defer again go back on the list; devices that now
    /// fail for good are dropped with a warning.
    pub fn retry_deferred(&mut self) -> usize {
        let pending = core::mem::take(&mut self.deferred);
        let mut bound = 0;
        for (id, pdev) in pending {
            match self.probe_into(id.clone(), pdev) {
                Ok(BindOutcome::Bound) => bound += 1,
                Ok(BindOutcome::Deferred(_)) => {}
                Err(e) => warn!("{}: deferred probe failed: {} ({})", id, e, e.errno()),
            }
        }
        bound
    }

    /// Remove a bound device, or forget a deferred one.
    pub fn unbind(&mut self, name: &str) -> Result<P> {
        let id = device_id(name);
        if let Some(Binding { mut pdev, device }) = self.bound.remove(&id) {
            device.remove(&mut pdev);
            return Ok(pdev);
        }
        match self.deferred.iter().position(|(d, _)| *d == id) {
            Some(pos) => Ok(self.deferred.swap_remove(pos).1),
            None => Err(RegistryError::NotBound.into()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DeviceOf<P, Z>> {
        self.bound.get(&device_id(name)).map(|b| &b.device)
    }

    pub fn platform(&self, name: &str) -> Option<&P> {
        let id = device_id(name);
        self.bound
            .get(&id)
            .map(|b| &b.pdev)
            .or_else(|| self.deferred.iter().find(|(d, _)| *d == id).map(|(_, p)| p))
    }

    pub fn platform_mut(&mut self, name: &str) -> Option<&mut P> {
        let id = device_id(name);
        if let Some(b) = self.bound.get_mut(&id) {
            return Some(&mut b.pdev);
        }
        self.deferred
            .iter_mut()
            .find(|(d, _)| *d == id)
            .map(|(_, p)| p)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.contains_key(&device_id(name))
    }

    pub fn is_deferred(&self, name: &str) -> bool {
        let id = device_id(name);
        self.deferred.iter().any(|(d, _)| *d == id)
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Bound devices, in bind order until the first unbind.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceOf<P, Z>> {
        self.bound.values().map(|b| &b.device)
    }
}
