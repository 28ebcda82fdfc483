//! Two-stage interrupt line.
//!
//! ```text
//!  ┌────────────┐  signal   ┌──────────────────┐  drain   ┌───────────┐
//!  │ top_half() │──────────▶│ deferred worker  │─────────▶│ registers │
//!  │ (hard IRQ) │           │ (one per device) │          │ + zones   │
//!  └────────────┘           └──────────────────┘          └───────────┘
//! ```
//!
//! The top half never touches registers: it only marks work pending.
//! Several edges before the worker runs collapse into one wake-up, which
//! is fine because the worker drains every set status bit.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::trace;

/// Top-half verdict, as the host's IRQ core understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// Not handled (line is shutting down).
    None,
    /// Wake the deferred worker.
    WakeThread,
}

pub struct IrqLine {
    number: u32,
    pending: Signal<CriticalSectionRawMutex, ()>,
    stopping: AtomicBool,
    fired: AtomicU32,
    serviced: AtomicU32,
}

impl core::fmt::Debug for IrqLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IrqLine")
            .field("number", &self.number)
            .field("stopping", &self.is_stopping())
            .field("fired", &self.fired())
            .field("serviced", &self.serviced())
            .finish()
    }
}

impl IrqLine {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            pending: Signal::new(),
            stopping: AtomicBool::new(false),
            fired: AtomicU32::new(0),
            serviced: AtomicU32::new(0),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Hard-IRQ entry. Non-blocking.
    pub fn top_half(&self) -> IrqReturn {
        if self.stopping.load(Ordering::Acquire) {
            return IrqReturn::None;
        }
        self.fired.fetch_add(1, Ordering::Relaxed);
        self.pending.signal(());
        trace!("irq {}: wake thread", self.number);
        IrqReturn::WakeThread
    }

    pub fn is_pending(&self) -> bool {
        self.pending.signaled()
    }

    /// Consume a pending wake-up without waiting.
    pub fn take_pending(&self) -> bool {
        self.pending.try_take().is_some()
    }

    /// Wait for the next wake-up. `false` once the line is stopping.
    pub async fn wait(&self) -> bool {
        if self.stopping.load(Ordering::Acquire) {
            return false;
        }
        self.pending.wait().await;
        !self.stopping.load(Ordering::Acquire)
    }

    /// Make the worker return and ignore further edges.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        self.pending.signal(());
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    pub(crate) fn mark_serviced(&self) {
        self.serviced.fetch_add(1, Ordering::Relaxed);
    }

    /// Edges seen by the top half.
    pub fn fired(&self) -> u32 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Worker passes run.
    pub fn serviced(&self) -> u32 {
        self.serviced.load(Ordering::Relaxed)
    }
}
