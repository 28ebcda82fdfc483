//! Simulation backends for every hardware port.
//!
//! [`SimRegisters`] is an in-memory THS register window: status bits are
//! write-1-to-clear, calibration words reset to `0x0800_0800`, and the
//! "hardware" side can inject samples. Every driver-side load and store
//! lands in an access trace so tests can assert on the exact register
//! traffic and its order.
//!
//! [`SimPlatform`] hands out the window plus simulated clock, reset and
//! nvmem cell, with per-step fault injection and a shared [`Journal`] of
//! lifecycle events.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::binding::{RegWindow, ThsNode};
use crate::ports::{Clock, NvmemCell, PlatformDevice, PortError, ResetControl};
use crate::regs::{
    DATA_INT_CTRL, DATA_INT_STAT, MAX_SENSORS, RegisterBus, WINDOW_SIZE, cdata, data,
    data_irq_en, data_irq_sts,
};

const WINDOW_WORDS: usize = WINDOW_SIZE / 4;

// ── Register window ───────────────────────────────────────────

/// One driver-side store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegWrite {
    Word { offset: usize, value: u32 },
    Half { offset: usize, value: u16 },
}

/// One driver-side access, in trace order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegAccess {
    Read(usize),
    Write(RegWrite),
}

pub struct SimRegisters {
    words: [AtomicU32; WINDOW_WORDS],
    log: Mutex<Vec<RegAccess>>,
    on_clear: Mutex<Option<(usize, u32)>>,
}

impl Default for SimRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRegisters {
    /// A window in its power-on state.
    pub fn new() -> Self {
        let regs = Self {
            words: [const { AtomicU32::new(0) }; WINDOW_WORDS],
            log: Mutex::new(Vec::new()),
            on_clear: Mutex::new(None),
        };
        for pair in 0..MAX_SENSORS / 2 {
            regs.poke(cdata(pair), 0x0800_0800);
        }
        regs
    }

    fn slot(&self, offset: usize) -> Option<&AtomicU32> {
        debug_assert!(offset % 4 == 0, "unaligned THS access at {offset:#x}");
        let slot = self.words.get(offset / 4);
        if slot.is_none() {
            warn!("SimRegisters: access outside window at {:#x}", offset);
        }
        slot
    }

    /// Current register content, without logging.
    pub fn peek(&self, offset: usize) -> u32 {
        self.slot(offset).map_or(0, |w| w.load(Ordering::Acquire))
    }

    /// Hardware-side store: not logged, no write-1-to-clear.
    pub fn poke(&self, offset: usize, value: u32) {
        if let Some(w) = self.slot(offset) {
            w.store(value, Ordering::Release);
        }
    }

    /// Latch `raw` into `sensor`'s data register and raise its status bit,
    /// as the THS does at the end of each filtered period.
    ///
    /// Returns `true` when the interrupt for that sensor is enabled, i.e.
    /// when the line would fire.
    pub fn inject_sample(&self, sensor: usize, raw: u32) -> bool {
        self.poke(data(sensor), raw);
        if let Some(w) = self.slot(DATA_INT_STAT) {
            w.fetch_or(data_irq_sts(sensor), Ordering::AcqRel);
        }
        self.peek(DATA_INT_CTRL) & data_irq_en(sensor) != 0
    }

    /// Latch `raw` into `sensor` the moment the driver next clears a
    /// status bit, i.e. a conversion finishing mid-service.
    pub fn inject_on_clear(&self, sensor: usize, raw: u32) {
        if let Ok(mut hook) = self.on_clear.lock() {
            *hook = Some((sensor, raw));
        }
    }

    /// Snapshot of the access trace.
    pub fn accesses(&self) -> Vec<RegAccess> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Stores only, oldest first.
    pub fn writes(&self) -> Vec<RegWrite> {
        self.accesses()
            .into_iter()
            .filter_map(|a| match a {
                RegAccess::Write(w) => Some(w),
                RegAccess::Read(_) => None,
            })
            .collect()
    }

    /// Word stores to `offset`, oldest first.
    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                RegWrite::Word { offset: o, value } if o == offset => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        if let Ok(mut l) = self.log.lock() {
            l.clear();
        }
    }

    fn record(&self, a: RegAccess) {
        if let Ok(mut l) = self.log.lock() {
            l.push(a);
        }
    }
}

impl RegisterBus for SimRegisters {
    fn read32(&self, offset: usize) -> u32 {
        self.record(RegAccess::Read(offset));
        self.peek(offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        self.record(RegAccess::Write(RegWrite::Word { offset, value }));
        let Some(w) = self.slot(offset) else { return };
        if offset != DATA_INT_STAT {
            w.store(value, Ordering::Release);
            return;
        }
        w.fetch_and(!value, Ordering::AcqRel);
        let hook = self.on_clear.lock().ok().and_then(|mut h| h.take());
        if let Some((sensor, raw)) = hook {
            self.inject_sample(sensor, raw);
        }
    }

    fn write16(&self, offset: usize, value: u16) {
        self.record(RegAccess::Write(RegWrite::Half { offset, value }));
        let Some(w) = self.slot(offset) else { return };
        let old = w.load(Ordering::Acquire);
        w.store((old & 0xffff_0000) | u32::from(value), Ordering::Release);
    }
}

// ── Lifecycle journal ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Ioremap,
    IrqRequested(u32),
    IrqFreed(u32),
    ResetDeasserted,
    ResetAsserted,
    ClockEnabled,
    ClockDisabled,
    CellRead(usize),
}

/// Shared, ordered record of resource operations.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<SimEvent>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: SimEvent) {
        if let Ok(mut j) = self.0.lock() {
            j.push(event);
        }
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.0.lock().map(|j| j.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut j) = self.0.lock() {
            j.clear();
        }
    }
}

// ── Clock / reset / nvmem ─────────────────────────────────────

pub struct SimClock {
    journal: Journal,
    fail_enable: Option<PortError>,
}

impl Clock for SimClock {
    fn prepare_enable(&mut self) -> Result<(), PortError> {
        if let Some(e) = self.fail_enable {
            return Err(e);
        }
        self.journal.record(SimEvent::ClockEnabled);
        Ok(())
    }

    fn disable_unprepare(&mut self) {
        self.journal.record(SimEvent::ClockDisabled);
    }
}

pub struct SimReset {
    journal: Journal,
    fail_deassert: Option<PortError>,
}

impl ResetControl for SimReset {
    fn deassert(&mut self) -> Result<(), PortError> {
        if let Some(e) = self.fail_deassert {
            return Err(e);
        }
        self.journal.record(SimEvent::ResetDeasserted);
        Ok(())
    }

    fn assert(&mut self) -> Result<(), PortError> {
        self.journal.record(SimEvent::ResetAsserted);
        Ok(())
    }
}

/// An OTP cell backed by bytes, or one whose reads fail.
#[derive(Debug, Clone)]
pub struct SimCell {
    bytes: heapless::Vec<u8, 64>,
    fail: Option<PortError>,
    journal: Option<Journal>,
}

impl SimCell {
    /// Cell holding `bytes` (truncated to 64).
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.iter().copied().take(64).collect(),
            fail: None,
            journal: None,
        }
    }

    pub fn failing(e: PortError) -> Self {
        Self {
            bytes: heapless::Vec::new(),
            fail: Some(e),
            journal: None,
        }
    }

    fn journaled(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }
}

impl NvmemCell for SimCell {
    fn read(&self, buf: &mut [u8]) -> Result<usize, PortError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        let n = self.bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&self.bytes[..n]);
        if let Some(j) = &self.journal {
            j.record(SimEvent::CellRead(n));
        }
        Ok(n)
    }
}

// ── Platform device ───────────────────────────────────────────

/// Which acquisition step fails, and how.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimFaults {
    pub ioremap: Option<PortError>,
    pub irq: Option<PortError>,
    pub request_irq: Option<PortError>,
    pub clock_get: Option<PortError>,
    pub clock_enable: Option<PortError>,
    pub reset_get: Option<PortError>,
    pub reset_deassert: Option<PortError>,
    /// Cell lookup failure (`Deferred` makes probe retry).
    pub nvmem_get: Option<PortError>,
    /// Cell read failure after a successful lookup.
    pub nvmem_read: Option<PortError>,
}

pub struct SimPlatform {
    name: heapless::String<32>,
    node: ThsNode,
    regs: Arc<SimRegisters>,
    calibration: Option<heapless::Vec<u8, 64>>,
    faults: SimFaults,
    journal: Journal,
    irq_installed: Option<u32>,
}

impl SimPlatform {
    pub fn new(name: &str, node: ThsNode, regs: Arc<SimRegisters>) -> Self {
        Self {
            name: crate::device::short_name(name),
            node,
            regs,
            calibration: None,
            faults: SimFaults::default(),
            journal: Journal::new(),
            irq_installed: None,
        }
    }

    /// Fuse `bytes` into the simulated eFuse calibration cell.
    pub fn with_calibration(mut self, bytes: &[u8]) -> Self {
        self.calibration = Some(bytes.iter().copied().take(64).collect());
        self
    }

    pub fn with_faults(mut self, faults: SimFaults) -> Self {
        self.faults = faults;
        self
    }

    pub fn faults_mut(&mut self) -> &mut SimFaults {
        &mut self.faults
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn registers(&self) -> &Arc<SimRegisters> {
        &self.regs
    }

    /// The IRQ whose handler is currently installed.
    pub fn irq_installed(&self) -> Option<u32> {
        self.irq_installed
    }
}

impl PlatformDevice for SimPlatform {
    type Bus = Arc<SimRegisters>;
    type Clock = SimClock;
    type Reset = SimReset;
    type Cell = SimCell;

    fn name(&self) -> &str {
        &self.name
    }

    fn of_node(&self) -> &ThsNode {
        &self.node
    }

    fn ioremap(&mut self, window: RegWindow) -> Result<Self::Bus, PortError> {
        if let Some(e) = self.faults.ioremap {
            return Err(e);
        }
        if window.size < WINDOW_SIZE as u64 {
            warn!(
                "{}: reg window {:#x} smaller than THS block {:#x}",
                self.name, window.size, WINDOW_SIZE
            );
        }
        self.journal.record(SimEvent::Ioremap);
        info!("{}: mapped simulated window at {:#x}", self.name, window.base);
        Ok(self.regs.clone())
    }

    fn irq(&self, index: usize) -> Result<u32, PortError> {
        if let Some(e) = self.faults.irq {
            return Err(e);
        }
        self.node
            .interrupts
            .get(index)
            .copied()
            .ok_or(PortError::NotFound)
    }

    fn request_threaded_irq(&mut self, irq: u32) -> Result<(), PortError> {
        if let Some(e) = self.faults.request_irq {
            return Err(e);
        }
        if let Some(held) = self.irq_installed {
            warn!("{}: irq {} already has a handler", self.name, held);
            return Err(PortError::Busy);
        }
        self.irq_installed = Some(irq);
        self.journal.record(SimEvent::IrqRequested(irq));
        Ok(())
    }

    fn free_irq(&mut self, irq: u32) {
        if self.irq_installed != Some(irq) {
            warn!("{}: freeing irq {} that was never requested", self.name, irq);
            return;
        }
        self.irq_installed = None;
        self.journal.record(SimEvent::IrqFreed(irq));
    }

    fn clock(&mut self, name: &str) -> Result<Self::Clock, PortError> {
        if let Some(e) = self.faults.clock_get {
            return Err(e);
        }
        if !self.node.clock_names.iter().any(|n| n.as_str() == name) {
            return Err(PortError::NotFound);
        }
        Ok(SimClock {
            journal: self.journal.clone(),
            fail_enable: self.faults.clock_enable,
        })
    }

    fn reset_control(&mut self) -> Result<Self::Reset, PortError> {
        if let Some(e) = self.faults.reset_get {
            return Err(e);
        }
        if self.node.resets.is_empty() {
            return Err(PortError::NotFound);
        }
        Ok(SimReset {
            journal: self.journal.clone(),
            fail_deassert: self.faults.reset_deassert,
        })
    }

    fn nvmem_cell(&mut self, name: &str) -> Result<Self::Cell, PortError> {
        if let Some(e) = self.faults.nvmem_get {
            return Err(e);
        }
        if !self.node.nvmem_cell_names.iter().any(|n| n.as_str() == name) {
            return Err(PortError::NotFound);
        }
        let cell = match (self.faults.nvmem_read, &self.calibration) {
            (Some(e), _) => SimCell::failing(e),
            (None, Some(bytes)) => SimCell::new(bytes),
            (None, None) => return Err(PortError::NotFound),
        };
        Ok(cell.journaled(self.journal.clone()))
    }
}
