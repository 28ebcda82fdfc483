//! THS simulator: probes the driver against simulated hardware.
//!
//! ```text
//! ┌──────────────────────┐  inject_sample  ┌──────────────────┐
//! │ hardware thread      │────────────────▶│  SimRegisters    │
//! │ (samples + top half) │                 └────────▲─────────┘
//! └──────────┬───────────┘                          │ drain
//!            │ signal                      ┌────────┴─────────┐
//!            └────────────────────────────▶│ irq worker       │──▶ LogThermalZones
//!                                          │ (edge-executor)  │
//!                                          └──────────────────┘
//! ```
//!
//! Usage: `ths-sim [node.json] [sampling.json]`. Without arguments the
//! reference H6 node and the default sampling setup are used.
//! `THS_LOG` takes an `env_logger` filter (`debug`, `trace`, ...).

// ── Imports ───────────────────────────────────────────────────
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};

use sun50i_ths::adapters::log_zone::LogThermalZones;
use sun50i_ths::adapters::sim::{SimPlatform, SimRegisters};
use sun50i_ths::binding::ThsNode;
use sun50i_ths::config::SamplingConfig;
use sun50i_ths::registry::{BindOutcome, DriverRegistry};

const DEVICE_NAME: &str = "5070400.thermal-sensor";

/// 30.0 C factory point; CPU sensor read 2345, GPU sensor 2360.
const SIM_CALIBRATION: [u8; 6] = [0x2c, 0x01, 0x29, 0x09, 0x38, 0x09];

/// Raw codes per period for sensors 0 and 1: a warm-up ramp.
const SAMPLES: [[u32; 2]; 6] = [
    [0, 0],
    [2200, 2210],
    [2150, 2170],
    [2100, 2120],
    [2050, 2080],
    [2000, 2040],
];

// ── Logger ────────────────────────────────────────────────────

fn init_logger() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("THS_LOG", "info"))
        .format_target(false)
        .try_init()?;
    Ok(())
}

// ── Inputs ────────────────────────────────────────────────────

fn load_node(path: Option<&str>) -> Result<ThsNode> {
    let node = match path {
        Some(p) => {
            let json = std::fs::read_to_string(p).with_context(|| format!("reading {}", p))?;
            ThsNode::from_json(&json)
        }
        None => ThsNode::h6_reference(),
    };
    node.map_err(|e| anyhow!("devicetree node: {}", e))
}

fn load_config(path: Option<&str>) -> Result<SamplingConfig> {
    let Some(p) = path else {
        return Ok(SamplingConfig::default());
    };
    let json = std::fs::read_to_string(p).with_context(|| format!("reading {}", p))?;
    serde_json::from_str(&json).map_err(|e| anyhow!("sampling config {}: {}", p, e))
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logger()?;
    info!("ths-sim v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let node = load_node(args.first().map(String::as_str))?;
    let config = load_config(args.get(1).map(String::as_str))?;

    // ── 1. Bind ───────────────────────────────────────────────
    let regs = Arc::new(SimRegisters::new());
    let pdev =
        SimPlatform::new(DEVICE_NAME, node, regs.clone()).with_calibration(&SIM_CALIBRATION);
    let zones = LogThermalZones::new();
    let mut registry: DriverRegistry<SimPlatform, LogThermalZones, 2> =
        DriverRegistry::new(zones.clone(), config);

    match registry
        .bind(pdev)
        .map_err(|e| anyhow!("probe failed: {} (errno {})", e, e.errno()))?
    {
        BindOutcome::Bound => {}
        BindOutcome::Deferred(what) => bail!("probe deferred waiting for {}", what),
    }
    let dev = registry
        .get(DEVICE_NAME)
        .ok_or_else(|| anyhow!("{} not bound", DEVICE_NAME))?;
    info!("calibration: {:?}", dev.calibration());

    // ── 2. Run hardware + worker ──────────────────────────────
    let period = Duration::from_millis(u64::from(config.period_ms));
    std::thread::scope(|s| {
        s.spawn(|| {
            for batch in &SAMPLES {
                std::thread::sleep(period);
                let mut fire = false;
                for (sensor, &raw) in batch.iter().enumerate() {
                    fire |= regs.inject_sample(sensor, raw);
                }
                if fire {
                    dev.irq().top_half();
                }
            }
            std::thread::sleep(period);
            dev.irq().stop();
        });

        let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
        futures_lite::future::block_on(executor.run(dev.irq_thread()));
    });

    // Anything raised after the last wake-up.
    let tail = dev.handle_threaded_irq();
    if !tail.is_empty() {
        info!("drained {:#b} after stop", tail.cleared);
    }

    for slot in dev.sensors() {
        match dev.temperature(slot.channel.index()) {
            Ok(mc) => info!("sensor {}: {} mC", slot.channel.index(), mc),
            Err(e) => warn!("sensor {}: {}", slot.channel.index(), e),
        }
    }
    info!(
        "irq {}: {} edge(s), {} worker pass(es), {} notification(s)",
        dev.irq().number(),
        dev.irq().fired(),
        dev.irq().serviced(),
        zones.notifications()
    );

    // ── 3. Unbind ─────────────────────────────────────────────
    registry
        .unbind(DEVICE_NAME)
        .map_err(|e| anyhow!("unbind: {}", e))?;
    Ok(())
}
