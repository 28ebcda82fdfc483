//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements            | Connects to                   |
//! |------------|-----------------------|-------------------------------|
//! | `mmio`     | RegisterBus           | Mapped THS register window    |
//! | `sim`      | RegisterBus           | In-memory register model      |
//! |            | PlatformDevice        | Simulated clk/reset/irq/nvmem |
//! | `log_zone` | ThermalFramework      | Serial log output             |

pub mod log_zone;
pub mod mmio;
pub mod sim;
