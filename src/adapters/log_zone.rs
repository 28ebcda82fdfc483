//! Log-based thermal framework adapter.
//!
//! Implements [`ThermalFramework`] by keeping registered sources in a
//! table and writing every new-sample notification, with the converted
//! temperature, to the logger. The simulation binary uses it in place of
//! a kernel thermal core.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::ports::{PortError, TemperatureSource, ThermalFramework, ZoneHandle};

type Source = Arc<dyn TemperatureSource + Send + Sync>;

/// Adapter that logs every sample notification.
#[derive(Clone, Default)]
pub struct LogThermalZones {
    zones: Arc<Mutex<Vec<(ZoneHandle, u8, Source)>>>,
    next: Arc<AtomicU32>,
    notified: Arc<AtomicU32>,
}

impl LogThermalZones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered zones.
    pub fn len(&self) -> usize {
        self.zones.lock().map(|z| z.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total notifications received.
    pub fn notifications(&self) -> u32 {
        self.notified.load(Ordering::Relaxed)
    }
}

impl ThermalFramework for LogThermalZones {
    fn register_zone(&mut self, sensor: u8, source: Source) -> Result<ZoneHandle, PortError> {
        let handle = ZoneHandle(self.next.fetch_add(1, Ordering::Relaxed));
        let mut zones = self.zones.lock().map_err(|_| PortError::Busy)?;
        zones.push((handle, sensor, source));
        info!("ZONE  | registered sensor {} as zone {}", sensor, handle.0);
        Ok(handle)
    }

    fn unregister_zone(&mut self, zone: ZoneHandle) {
        let Ok(mut zones) = self.zones.lock() else { return };
        match zones.iter().position(|(h, _, _)| *h == zone) {
            Some(pos) => {
                let (_, sensor, _) = zones.remove(pos);
                info!("ZONE  | unregistered zone {} (sensor {})", zone.0, sensor);
            }
            None => warn!("ZONE  | unregister of unknown zone {}", zone.0),
        }
    }

    fn sample_available(&self, zone: ZoneHandle) {
        self.notified.fetch_add(1, Ordering::Relaxed);
        let Ok(zones) = self.zones.lock() else { return };
        match zones.iter().find(|(h, _, _)| *h == zone) {
            Some((_, sensor, source)) => match source.get_temperature() {
                Ok(mc) => info!(
                    "TEMP  | zone={} sensor={} T={}{}.{:03}\u{00b0}C",
                    zone.0,
                    sensor,
                    if mc < 0 { "-" } else { "" },
                    mc.unsigned_abs() / 1000,
                    mc.unsigned_abs() % 1000
                ),
                Err(e) => warn!("TEMP  | zone={} sensor={} {}", zone.0, sensor, e),
            },
            None => warn!("TEMP  | notification for unknown zone {}", zone.0),
        }
    }
}
