//! Memory-mapped register window.
//!
//! The real-hardware [`RegisterBus`]: every access is a volatile load or
//! store at `base + offset`. Offsets outside the mapped length are
//! dropped with a warning rather than touching unrelated memory.

use core::ptr::{read_volatile, write_volatile};

use log::warn;

use crate::regs::RegisterBus;

pub struct Mmio {
    base: usize,
    len: usize,
}

impl Mmio {
    /// Wrap an already-mapped window.
    ///
    /// # Safety
    ///
    /// `base..base + len` must be a valid, exclusively owned mapping of the
    /// THS register block for as long as the `Mmio` lives, and `base` must
    /// be 4-byte aligned.
    pub const unsafe fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    fn in_window(&self, offset: usize, width: usize) -> bool {
        let ok = offset % width == 0 && offset + width <= self.len;
        if !ok {
            warn!("mmio: rejected access at {:#x} (window {:#x})", offset, self.len);
        }
        ok
    }
}

// SAFETY: `Mmio` only holds an address; every access is a single
// volatile load or store.
unsafe impl Send for Mmio {}
unsafe impl Sync for Mmio {}

impl RegisterBus for Mmio {
    fn read32(&self, offset: usize) -> u32 {
        if !self.in_window(offset, 4) {
            return 0;
        }
        // SAFETY: in bounds and aligned per `new`'s contract.
        unsafe { read_volatile((self.base + offset) as *const u32) }
    }

    fn write32(&self, offset: usize, value: u32) {
        if !self.in_window(offset, 4) {
            return;
        }
        // SAFETY: in bounds and aligned per `new`'s contract.
        unsafe { write_volatile((self.base + offset) as *mut u32, value) }
    }

    fn write16(&self, offset: usize, value: u16) {
        if !self.in_window(offset, 2) {
            return;
        }
        // Little-endian: the low half-word sits at the lower address.
        // SAFETY: in bounds and aligned per `new`'s contract.
        unsafe { write_volatile((self.base + offset) as *mut u16, value) }
    }
}
