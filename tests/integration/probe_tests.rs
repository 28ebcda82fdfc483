//! Probe / remove lifecycle tests.
//!
//! Each test drives `ThsDevice::probe` against a `SimPlatform` and checks
//! the acquired-resource journal, the register file, and the error the
//! host would see.

use sun50i_ths::adapters::sim::{RegWrite, SimEvent, SimFaults, SimPlatform, SimRegisters};
use sun50i_ths::config::SamplingConfig;
use sun50i_ths::device::{CalibrationStatus, DeviceOf};
use sun50i_ths::error::{CalibrationError, Error, InvalidReason, ResourceError, errno};
use sun50i_ths::ports::{PortError, ZoneHandle};
use sun50i_ths::regs::{CTRL0, CTRL2, DATA_INT_CTRL, FILTER, PER, cdata};
use sun50i_ths::sampling::SamplingState;

use crate::mock_hw::{RecordingZones, ZoneCall, calibrated_platform, h6_platform};

type Dev = DeviceOf<SimPlatform, RecordingZones>;

fn probe(pdev: &mut SimPlatform, zones: &RecordingZones) -> Result<Dev, Error> {
    Dev::probe(pdev, zones.clone(), SamplingConfig::default())
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn probe_acquires_in_order_and_arms_sampling() {
    let mut pdev = calibrated_platform();
    let zones = RecordingZones::new();
    let dev = probe(&mut pdev, &zones).unwrap();

    assert_eq!(
        pdev.journal().events(),
        vec![
            SimEvent::Ioremap,
            SimEvent::IrqRequested(15),
            SimEvent::ResetDeasserted,
            SimEvent::ClockEnabled,
            SimEvent::CellRead(6),
        ]
    );

    let regs = pdev.registers();
    assert_eq!(regs.peek(cdata(0)), 0x080c_07fd);
    assert_eq!(regs.peek(CTRL0), 0x01df_002f);
    assert_eq!(regs.peek(FILTER), 0b110);
    assert_eq!(regs.peek(CTRL2), 0b11);
    assert_eq!(regs.peek(PER), 72 << 12);
    assert_eq!(regs.peek(DATA_INT_CTRL), 0b11);
    assert_eq!(dev.sampling_state(), SamplingState::Armed);

    let registered: Vec<u8> = zones
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ZoneCall::Registered { sensor, .. } => Some(sensor),
            _ => None,
        })
        .collect();
    assert_eq!(registered, vec![0, 1]);

    match dev.calibration() {
        CalibrationStatus::Applied(report) => {
            assert_eq!(report.expected_raw, 2348);
            assert_eq!(report.written.len(), 2);
        }
        other => panic!("expected calibration applied, got {:?}", other),
    }
}

#[test]
fn calibration_runs_before_interrupts_are_enabled() {
    let mut pdev = calibrated_platform();
    let zones = RecordingZones::new();
    let _dev = probe(&mut pdev, &zones).unwrap();

    let writes = pdev.registers().writes();
    let first_store_to = |target: usize| {
        writes
            .iter()
            .position(|w| matches!(w, RegWrite::Word { offset, .. } if *offset == target))
            .unwrap()
    };
    let cal = first_store_to(cdata(0));
    let irq_en = first_store_to(DATA_INT_CTRL);
    assert!(cal < irq_en);
}

#[test]
fn remove_asserts_reset_then_gates_clock() {
    let mut pdev = calibrated_platform();
    let dev = probe(&mut pdev, &RecordingZones::new()).unwrap();
    pdev.journal().clear();
    dev.remove(&mut pdev);
    assert_eq!(
        pdev.journal().events(),
        vec![
            SimEvent::ResetAsserted,
            SimEvent::ClockDisabled,
            SimEvent::IrqFreed(15)
        ]
    );
    assert_eq!(pdev.irq_installed(), None);
}

#[test]
fn remove_unregisters_zones_newest_first() {
    let mut pdev = calibrated_platform();
    let zones = RecordingZones::new();
    let dev = probe(&mut pdev, &zones).unwrap();
    let handles: Vec<ZoneHandle> = dev.sensors().iter().map(|s| s.zone).collect();
    dev.remove(&mut pdev);
    assert_eq!(zones.registered(), 0);
    let calls = zones.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[
            ZoneCall::Unregistered(handles[1]),
            ZoneCall::Unregistered(handles[0])
        ]
    );
}

// ── Calibration fallbacks ─────────────────────────────────────

#[test]
fn missing_cell_probes_uncalibrated() {
    let mut pdev = h6_platform();
    pdev.registers().poke(cdata(0), 0x0811_07ee);
    let dev = probe(&mut pdev, &RecordingZones::new()).unwrap();
    assert_eq!(dev.calibration(), &CalibrationStatus::Missing);
    // Nothing touched the calibration word.
    assert_eq!(pdev.registers().peek(cdata(0)), 0x0811_07ee);
}

#[test]
fn unfused_blob_restores_defaults() {
    let mut pdev = h6_platform().with_calibration(&[0, 0, 0x29, 0x09, 0x38, 0x09]);
    pdev.registers().poke(cdata(0), 0x0811_07ee);
    let dev = probe(&mut pdev, &RecordingZones::new()).unwrap();
    assert_eq!(
        dev.calibration(),
        &CalibrationStatus::Defaulted(CalibrationError::Invalid(InvalidReason::Unfused))
    );
    assert_eq!(pdev.registers().peek(cdata(0)), 0x0800_0800);
}

#[test]
fn short_blob_restores_defaults() {
    let mut pdev = h6_platform().with_calibration(&[0x2c, 0x01, 0x29]);
    let dev = probe(&mut pdev, &RecordingZones::new()).unwrap();
    assert_eq!(
        dev.calibration(),
        &CalibrationStatus::Defaulted(CalibrationError::Invalid(InvalidReason::TooShort {
            len: 3,
            need: 6
        }))
    );
    assert_eq!(pdev.registers().peek(cdata(0)), 0x0800_0800);
}

#[test]
fn unreadable_cell_restores_defaults() {
    let mut pdev = calibrated_platform().with_faults(SimFaults {
        nvmem_read: Some(PortError::Io(-5)),
        ..SimFaults::default()
    });
    let dev = probe(&mut pdev, &RecordingZones::new()).unwrap();
    assert_eq!(
        dev.calibration(),
        &CalibrationStatus::Defaulted(CalibrationError::Unavailable)
    );
}

// ── Failure unwinding ─────────────────────────────────────────

#[test]
fn deferred_cell_releases_clock_and_reset() {
    let mut pdev = calibrated_platform().with_faults(SimFaults {
        nvmem_get: Some(PortError::Deferred),
        ..SimFaults::default()
    });
    let err = probe(&mut pdev, &RecordingZones::new()).err().unwrap();
    assert_eq!(err, Error::DeferredRetry("calibration cell"));
    assert_eq!(err.errno(), -errno::EPROBE_DEFER);
    assert_eq!(
        pdev.journal().events(),
        vec![
            SimEvent::Ioremap,
            SimEvent::IrqRequested(15),
            SimEvent::ResetDeasserted,
            SimEvent::ClockEnabled,
            SimEvent::ClockDisabled,
            SimEvent::ResetAsserted,
            SimEvent::IrqFreed(15),
        ]
    );
    assert_eq!(pdev.irq_installed(), None);
}

#[test]
fn clock_enable_failure_reasserts_reset() {
    let mut pdev = calibrated_platform().with_faults(SimFaults {
        clock_enable: Some(PortError::Io(-5)),
        ..SimFaults::default()
    });
    let err = probe(&mut pdev, &RecordingZones::new()).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::ClockEnableFailed));
    assert_eq!(err.errno(), -errno::EIO);
    assert_eq!(
        pdev.journal().events(),
        vec![
            SimEvent::Ioremap,
            SimEvent::IrqRequested(15),
            SimEvent::ResetDeasserted,
            SimEvent::ResetAsserted,
            SimEvent::IrqFreed(15),
        ]
    );
}

#[test]
fn reset_deassert_failure_only_frees_the_irq() {
    let mut pdev = calibrated_platform().with_faults(SimFaults {
        reset_deassert: Some(PortError::Io(-5)),
        ..SimFaults::default()
    });
    let err = probe(&mut pdev, &RecordingZones::new()).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::ResetDeassertFailed));
    assert_eq!(
        pdev.journal().events(),
        vec![
            SimEvent::Ioremap,
            SimEvent::IrqRequested(15),
            SimEvent::IrqFreed(15)
        ]
    );
}

#[test]
fn missing_clock_frees_the_irq() {
    let mut pdev = calibrated_platform().with_faults(SimFaults {
        clock_get: Some(PortError::NotFound),
        ..SimFaults::default()
    });
    let err = probe(&mut pdev, &RecordingZones::new()).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::ClockUnavailable));
    assert_eq!(
        pdev.journal().events(),
        vec![
            SimEvent::Ioremap,
            SimEvent::IrqRequested(15),
            SimEvent::IrqFreed(15)
        ]
    );
}

#[test]
fn zone_failure_unwinds_and_skips_configuration() {
    let mut pdev = calibrated_platform();
    let zones = RecordingZones::failing_on(1, PortError::Io(-22));
    let err = probe(&mut pdev, &zones).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::ZoneRegistrationFailed(1)));
    let ev = pdev.journal().events();
    assert_eq!(
        &ev[ev.len() - 3..],
        &[
            SimEvent::ClockDisabled,
            SimEvent::ResetAsserted,
            SimEvent::IrqFreed(15)
        ]
    );
    // Zone 0 went in before zone 1 was refused; it must not outlive probe.
    assert_eq!(zones.registered(), 0);
    assert_eq!(
        zones.calls().last(),
        Some(&ZoneCall::Unregistered(ZoneHandle(0)))
    );
    assert!(pdev.registers().writes_to(DATA_INT_CTRL).is_empty());
    assert!(pdev.registers().writes_to(CTRL0).is_empty());
}

#[test]
fn deferred_zone_defers_probe() {
    let mut pdev = calibrated_platform();
    let zones = RecordingZones::failing_on(0, PortError::Deferred);
    let err = probe(&mut pdev, &zones).err().unwrap();
    assert!(err.is_deferred());
    assert_eq!(pdev.irq_installed(), None);
}

#[test]
fn deferred_second_zone_leaves_nothing_registered() {
    let mut pdev = calibrated_platform();
    let zones = RecordingZones::failing_on(1, PortError::Deferred);
    let err = probe(&mut pdev, &zones).err().unwrap();
    assert_eq!(err, Error::DeferredRetry("thermal zone"));
    assert_eq!(zones.registered(), 0);
}

#[test]
fn missing_irq_is_enxio() {
    let mut pdev = calibrated_platform().with_faults(SimFaults {
        irq: Some(PortError::NotFound),
        ..SimFaults::default()
    });
    let err = probe(&mut pdev, &RecordingZones::new()).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::IrqUnavailable));
    assert_eq!(err.errno(), -errno::ENXIO);
    assert_eq!(pdev.journal().events(), vec![SimEvent::Ioremap]);
}

#[test]
fn ioremap_failure_touches_nothing() {
    let mut pdev = calibrated_platform().with_faults(SimFaults {
        ioremap: Some(PortError::Busy),
        ..SimFaults::default()
    });
    let err = probe(&mut pdev, &RecordingZones::new()).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::MapFailed));
    assert!(pdev.journal().events().is_empty());
}

#[test]
fn invalid_sampling_config_is_rejected_up_front() {
    let mut pdev = calibrated_platform();
    let config = SamplingConfig {
        filter_type: 7,
        ..SamplingConfig::default()
    };
    let err = Dev::probe(&mut pdev, RecordingZones::new(), config)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.errno(), -errno::EINVAL);
    assert!(pdev.journal().events().is_empty());
}

#[test]
fn node_without_matching_compatible_has_no_match_data() {
    let json = r#"{
        "compatible": ["allwinner,sun8i-h3-ths"],
        "reg": { "base": 29437952, "size": 1024 },
        "interrupts": [31],
        "clock-names": ["bus"],
        "resets": [[1, 42]]
    }"#;
    let node = sun50i_ths::binding::ThsNode::from_json(json).unwrap();
    let mut pdev = SimPlatform::new(
        "1c25000.thermal-sensor",
        node,
        std::sync::Arc::new(SimRegisters::new()),
    );
    let err = probe(&mut pdev, &RecordingZones::new()).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::NoMatchData));
    assert!(pdev.journal().events().is_empty());
}
