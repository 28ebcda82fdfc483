//! Driver registry: bind, deferred probe, unbind.

use std::sync::Arc;

use sun50i_ths::adapters::sim::{SimEvent, SimFaults, SimPlatform, SimRegisters};
use sun50i_ths::binding::ThsNode;
use sun50i_ths::config::SamplingConfig;
use sun50i_ths::error::{Error, RegistryError, ResourceError};
use sun50i_ths::ports::PortError;
use sun50i_ths::registry::{BindOutcome, DriverRegistry};

use crate::mock_hw::{CAL_BLOB, DEVICE, RecordingZones, calibrated_platform};

type Registry = DriverRegistry<SimPlatform, RecordingZones, 4>;

fn registry(zones: &RecordingZones) -> Registry {
    Registry::new(zones.clone(), SamplingConfig::default())
}

fn named(name: &str) -> SimPlatform {
    SimPlatform::new(
        name,
        ThsNode::h6_reference().unwrap(),
        Arc::new(SimRegisters::new()),
    )
    .with_calibration(&CAL_BLOB)
}

#[test]
fn two_instances_share_one_framework() {
    let zones = RecordingZones::new();
    let mut reg = registry(&zones);
    assert_eq!(reg.bind(named("ths0")), Ok(BindOutcome::Bound));
    assert_eq!(reg.bind(named("ths1")), Ok(BindOutcome::Bound));
    assert_eq!(reg.bound_count(), 2);
    assert_eq!(zones.registered(), 4);
    assert_eq!(reg.devices().count(), 2);
}

#[test]
fn unbind_runs_remove_and_returns_the_platform_device() {
    let mut reg = registry(&RecordingZones::new());
    reg.bind(calibrated_platform()).unwrap();
    let pdev = reg.unbind(DEVICE).unwrap();
    let ev = pdev.journal().events();
    assert_eq!(
        &ev[ev.len() - 3..],
        &[
            SimEvent::ResetAsserted,
            SimEvent::ClockDisabled,
            SimEvent::IrqFreed(15)
        ]
    );
    assert!(reg.get(DEVICE).is_none());
}

#[test]
fn repeated_bind_unbind_does_not_grow_the_zone_table() {
    let zones = RecordingZones::new();
    let mut reg = registry(&zones);
    for _ in 0..3 {
        reg.bind(calibrated_platform()).unwrap();
        assert_eq!(zones.registered(), 2);
        reg.unbind(DEVICE).unwrap();
    }
    assert_eq!(reg.bound_count(), 0);
    assert_eq!(zones.registered(), 0);
}

#[test]
fn deferred_calibration_cell_is_retried() {
    let mut reg = registry(&RecordingZones::new());
    let pdev = calibrated_platform().with_faults(SimFaults {
        nvmem_get: Some(PortError::Deferred),
        ..SimFaults::default()
    });
    assert_eq!(
        reg.bind(pdev),
        Ok(BindOutcome::Deferred("calibration cell"))
    );
    assert!(reg.is_deferred(DEVICE));
    assert!(reg.get(DEVICE).is_none());

    // Still deferred on the first retry.
    assert_eq!(reg.retry_deferred(), 0);
    assert_eq!(reg.platform(DEVICE).unwrap().irq_installed(), None);

    reg.platform_mut(DEVICE).unwrap().faults_mut().nvmem_get = None;
    assert_eq!(reg.retry_deferred(), 1);
    let requests = reg
        .platform(DEVICE)
        .unwrap()
        .journal()
        .events()
        .into_iter()
        .filter(|e| matches!(e, SimEvent::IrqRequested(_)))
        .count();
    let frees = reg
        .platform(DEVICE)
        .unwrap()
        .journal()
        .events()
        .into_iter()
        .filter(|e| matches!(e, SimEvent::IrqFreed(_)))
        .count();
    assert_eq!((requests, frees), (3, 2));
    assert_eq!(reg.platform(DEVICE).unwrap().irq_installed(), Some(15));
    let dev = reg.get(DEVICE).unwrap();
    assert!(matches!(
        dev.calibration(),
        sun50i_ths::device::CalibrationStatus::Applied(_)
    ));
}

#[test]
fn hard_failure_on_retry_drops_the_device() {
    let mut reg = registry(&RecordingZones::new());
    let pdev = calibrated_platform().with_faults(SimFaults {
        reset_get: Some(PortError::Deferred),
        ..SimFaults::default()
    });
    reg.bind(pdev).unwrap();
    reg.platform_mut(DEVICE).unwrap().faults_mut().reset_get = Some(PortError::NotFound);
    assert_eq!(reg.retry_deferred(), 0);
    assert_eq!(reg.deferred_count(), 0);
    assert!(!reg.is_bound(DEVICE));
}

#[test]
fn hard_probe_failure_is_returned_not_parked() {
    let mut reg = registry(&RecordingZones::new());
    let pdev = calibrated_platform().with_faults(SimFaults {
        clock_get: Some(PortError::NotFound),
        ..SimFaults::default()
    });
    assert_eq!(
        reg.bind(pdev),
        Err(Error::Resource(ResourceError::ClockUnavailable))
    );
    assert_eq!(reg.deferred_count(), 0);
}

#[test]
fn deferred_device_can_be_unbound() {
    let mut reg = registry(&RecordingZones::new());
    let pdev = calibrated_platform().with_faults(SimFaults {
        irq: Some(PortError::Deferred),
        ..SimFaults::default()
    });
    reg.bind(pdev).unwrap();
    assert!(reg.unbind(DEVICE).is_ok());
    assert_eq!(reg.deferred_count(), 0);
    assert_eq!(
        reg.unbind(DEVICE).err(),
        Some(Error::Registry(RegistryError::NotBound))
    );
}

#[test]
fn rebinding_a_deferred_name_is_rejected() {
    let mut reg = registry(&RecordingZones::new());
    let pdev = calibrated_platform().with_faults(SimFaults {
        irq: Some(PortError::Deferred),
        ..SimFaults::default()
    });
    reg.bind(pdev).unwrap();
    assert_eq!(
        reg.bind(calibrated_platform()),
        Err(Error::Registry(RegistryError::AlreadyBound))
    );
}
