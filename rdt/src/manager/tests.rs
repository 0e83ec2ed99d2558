/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rdt_config::Hw;
use rdt_config::RdtConfig;
use rdt_probe::MockOsProbe;
use rdt_probe::SysfsProbe;
use rdt_test_utils::FakeCat;
use rdt_test_utils::FakeCdp;
use rdt_test_utils::FakeMba;
use rdt_test_utils::FakeMbaCtrl;
use rdt_test_utils::FakeSystem;
use rdt_test_utils::RecordingApply;
use test_log::test;

use crate::CacheLevel;
use crate::CapabilityManager;
use crate::CdpMode;
use crate::CdpRequest;
use crate::CdpState;
use crate::MbaMode;
use crate::MbaRequest;
use crate::MbaState;
use crate::ModeSet;
use crate::RdtError;
use crate::ResetRequest;
use crate::Status;

fn full_system() -> FakeSystem {
    FakeSystem::builder()
        .with_cores(1, 4)
        .with_l3_cat(FakeCat::new(16, 0xfff).with_cdp(FakeCdp::Off))
        .with_l2_cat(FakeCat::new(8, 0xff).with_cdp(FakeCdp::Off))
        .with_mba(FakeMba::new(8).with_ctrl(FakeMbaCtrl::Supported))
        .build()
}

fn l3_only_system() -> FakeSystem {
    FakeSystem::builder()
        .with_l3_cat(FakeCat::new(16, 0xfff))
        .build()
}

fn manager(system: &FakeSystem, applier: &RecordingApply) -> CapabilityManager {
    CapabilityManager::new(
        system.paths().clone(),
        Box::new(SysfsProbe::new()),
        Box::new(applier.clone()),
    )
}

fn initialized(system: &FakeSystem, applier: &RecordingApply) -> CapabilityManager {
    let manager = manager(system, applier);
    manager.init().unwrap();
    manager
}

#[test]
fn init_guard_transitions() {
    let system = full_system();
    let manager = manager(&system, &RecordingApply::new());

    assert!(matches!(
        manager.check_init(true),
        Err(RdtError::NotInitialized)
    ));
    manager.check_init(false).unwrap();

    manager.init().unwrap();
    manager.check_init(true).unwrap();
    assert!(matches!(
        manager.check_init(false),
        Err(RdtError::AlreadyInitialized)
    ));

    manager.fini().unwrap();
    manager.check_init(false).unwrap();
    assert!(matches!(manager.fini(), Err(RdtError::NotInitialized)));
}

#[test]
fn records_require_init() {
    let system = full_system();
    let manager = manager(&system, &RecordingApply::new());

    let guard = manager.lock();
    let status = Status::from(&guard.get_capabilities());
    assert_eq!(status, Status::NotInitialized);
    drop(guard);

    let result = manager.change_l3_cdp(CdpMode::On);
    assert_eq!(Status::from(&result), Status::NotInitialized);
}

#[test]
fn double_init_keeps_original_record() {
    let system = full_system();
    let manager = initialized(&system, &RecordingApply::new());
    let (capabilities, cpu_info) = manager.snapshot().unwrap();

    // a second discovery would see different parameters
    system.write(system.paths().resctrl.join("info/L3/num_closids"), "4\n");

    let result = manager.init();
    assert_eq!(Status::from(&result), Status::AlreadyInitialized);
    assert_eq!(manager.snapshot().unwrap(), (capabilities, cpu_info));
}

#[test]
fn reinit_after_fini_rediscovers() {
    let system = full_system();
    let manager = initialized(&system, &RecordingApply::new());

    system.write(system.paths().resctrl.join("info/L3/num_closids"), "4\n");
    manager.fini().unwrap();
    assert!(matches!(manager.snapshot(), Err(RdtError::NotInitialized)));

    manager.init().unwrap();
    let (capabilities, _) = manager.snapshot().unwrap();
    assert_eq!(capabilities.l3ca().unwrap().num_classes, 4);
}

#[test]
fn failed_discovery_leaves_manager_uninitialized() {
    let system = FakeSystem::builder().build();
    let manager = manager(&system, &RecordingApply::new());

    let result = manager.init();

    assert_eq!(Status::from(&result), Status::DiscoveryError);
    manager.check_init(false).unwrap();
}

#[test]
fn unreadable_topology_is_a_discovery_error() {
    let mut probe = MockOsProbe::new();
    probe.expect_dir_exists().returning(|_| false);
    let manager = CapabilityManager::new(
        rdt_config::SystemPaths::with_root("/fake"),
        Box::new(probe),
        Box::new(RecordingApply::new()),
    );

    let result = manager.init();

    assert_eq!(Status::from(&result), Status::DiscoveryError);
    manager.check_init(false).unwrap();
}

#[test]
fn change_l3_cdp_programs_and_commits() {
    let system = full_system();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);

    manager.change_l3_cdp(CdpMode::On).unwrap();

    let expected = ModeSet {
        l3_cdp: CdpMode::On,
        ..ModeSet::default()
    };
    assert_eq!(applier.applied(), vec![expected]);

    let (capabilities, _) = manager.snapshot().unwrap();
    let l3ca = capabilities.l3ca().unwrap();
    assert_eq!(l3ca.cdp, CdpState::On);
    // the kernel halves classes of service with CDP on
    assert_eq!(l3ca.num_classes, 8);
    assert_eq!(capabilities.cdp_state(CacheLevel::L2), CdpState::Off);
    assert_eq!(capabilities.current_modes(), expected);

    manager.change_l3_cdp(CdpMode::Off).unwrap();
    let (capabilities, _) = manager.snapshot().unwrap();
    assert_eq!(capabilities.l3ca().unwrap().num_classes, 16);
    assert_eq!(applier.applied().len(), 2);
}

#[test]
fn change_l2_cdp_keeps_other_modes() {
    let system = FakeSystem::builder()
        .with_l3_cat(FakeCat::new(16, 0xfff).with_cdp(FakeCdp::On))
        .with_l2_cat(FakeCat::new(8, 0xff).with_cdp(FakeCdp::Off))
        .build();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);

    manager.change_l2_cdp(CdpMode::On).unwrap();

    let expected = ModeSet {
        l3_cdp: CdpMode::On,
        l2_cdp: CdpMode::On,
        mba: MbaMode::Default,
    };
    assert_eq!(applier.applied(), vec![expected]);
    let (capabilities, _) = manager.snapshot().unwrap();
    assert_eq!(capabilities.current_modes(), expected);
}

#[test]
fn change_to_current_mode_is_noop() {
    let system = full_system();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    manager.change_l3_cdp(CdpMode::Off).unwrap();
    manager.change_l2_cdp(CdpMode::Off).unwrap();
    manager.change_mba(MbaMode::Default).unwrap();
    manager.reset(ResetRequest::default()).unwrap();

    assert!(applier.applied().is_empty());
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn unsupported_technology_never_mutates_record() {
    let system = l3_only_system();
    let applier = RecordingApply::new();
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    let results = [
        manager.change_l3_cdp(CdpMode::On),
        manager.change_l3_cdp(CdpMode::Off),
        manager.change_l2_cdp(CdpMode::On),
        manager.change_mba(MbaMode::Ctrl),
        manager.change_mba(MbaMode::Default),
    ];

    for result in results.iter() {
        assert_eq!(Status::from(result), Status::TechnologyUnsupported);
    }
    assert!(applier.applied().is_empty());
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn mba_ctrl_needs_controller_support() {
    let system = FakeSystem::builder().with_mba(FakeMba::new(8)).build();
    let applier = RecordingApply::new();
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    let result = manager.change_mba(MbaMode::Ctrl);

    assert_eq!(Status::from(&result), Status::InvalidConfig);
    assert!(applier.applied().is_empty());
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn mba_switches_to_ctrl_and_back() {
    let system = full_system();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);

    manager.change_mba(MbaMode::Ctrl).unwrap();
    let (capabilities, _) = manager.snapshot().unwrap();
    assert_eq!(capabilities.mba_state(), MbaState::Ctrl);

    manager.change_mba(MbaMode::Default).unwrap();
    let (capabilities, _) = manager.snapshot().unwrap();
    assert_eq!(capabilities.mba_state(), MbaState::Default);
    assert_eq!(applier.applied().len(), 2);
}

#[test]
fn failed_apply_keeps_record() {
    let system = full_system();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    applier.fail_next(true);
    let result = manager.change_l3_cdp(CdpMode::On);

    assert_eq!(Status::from(&result), Status::Resource);
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn failed_refresh_keeps_record() {
    let system = full_system();
    let applier = RecordingApply::new();
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    system.write(system.paths().resctrl.join("info/L3/num_closids"), "sixteen\n");
    let result = manager.change_l3_cdp(CdpMode::On);

    assert_eq!(Status::from(&result), Status::ParseError);
    assert_eq!(applier.applied().len(), 1);
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn vanished_technology_keeps_record() {
    let system = full_system();
    let applier = RecordingApply::new();
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    system.remove(system.paths().resctrl.join("info/MB"));
    let result = manager.change_mba(MbaMode::Ctrl);

    assert!(matches!(result, Err(RdtError::TechnologyVanished { .. })));
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn permission_denied_during_change_aborts_it() {
    use std::os::unix::fs::PermissionsExt;

    let system = full_system();
    let applier = RecordingApply::new();
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    let num_closids = system.paths().resctrl.join("info/L2/num_closids");
    std::fs::set_permissions(&num_closids, std::fs::Permissions::from_mode(0o000)).unwrap();
    // root ignores file permissions
    if std::fs::read(&num_closids).is_ok() {
        return;
    }

    let result = manager.change_l2_cdp(CdpMode::On);

    assert_eq!(Status::from(&result), Status::PermissionDenied);
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn guard_excludes_other_callers() {
    let system = full_system();
    let manager = initialized(&system, &RecordingApply::new());
    let in_critical_section = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let guard = manager.lock();
        in_critical_section.store(true, Ordering::SeqCst);

        let waiter = scope.spawn(|| {
            manager.check_init(true).unwrap();
            in_critical_section.load(Ordering::SeqCst)
        });

        std::thread::sleep(Duration::from_millis(100));
        in_critical_section.store(false, Ordering::SeqCst);
        drop(guard);

        let observed_critical_section = waiter.join().unwrap();
        assert!(!observed_critical_section);
    });
}

#[test]
fn concurrent_changes_are_serialized() {
    let system = full_system();
    let applier = RecordingApply::with_kernel_and_delay(system.kernel(), Duration::from_millis(10));
    let manager = initialized(&system, &applier);
    let (initial, _) = manager.snapshot().unwrap();
    let writers_done = AtomicBool::new(false);

    let observed = std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut observed = Vec::new();
            while !writers_done.load(Ordering::SeqCst) {
                let (capabilities, _) = manager.snapshot().unwrap();
                observed.push(capabilities);
                std::thread::sleep(Duration::from_millis(1));
            }
            observed
        });

        let writers = (0..8)
            .map(|thread_id| {
                let manager = &manager;
                scope.spawn(move || {
                    for round in 0..4 {
                        let mode = if (thread_id + round) % 2 == 0 {
                            CdpMode::On
                        } else {
                            CdpMode::Off
                        };
                        manager.change_l3_cdp(mode).unwrap();
                        manager.change_mba(MbaMode::Ctrl).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for writer in writers {
            writer.join().unwrap();
        }

        writers_done.store(true, Ordering::SeqCst);
        reader.join().unwrap()
    });

    assert!(!applier.applied().is_empty());
    assert_eq!(applier.max_concurrency(), 1);

    let mut committed = applier.applied();
    committed.push(initial.current_modes());
    assert!(!observed.is_empty());
    for capabilities in observed {
        let modes = capabilities.current_modes();
        assert!(committed.contains(&modes), "{modes} was never committed");

        // parameters and mode come from the same commit
        let l3ca = capabilities.l3ca().unwrap();
        let expected_classes = if modes.l3_cdp.is_on() { 8 } else { 16 };
        assert_eq!(l3ca.num_classes, expected_classes, "{modes}");
    }
}

#[test]
fn guard_exposes_records_and_changes() {
    let system = full_system();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);

    let mut guard = manager.lock();
    guard.change_l2_cdp(CdpMode::On).unwrap();
    let (capabilities, cpu_info) = guard.get_capabilities().unwrap();

    assert_eq!(capabilities.cdp_state(CacheLevel::L2), CdpState::On);
    assert_eq!(cpu_info.cores_count(), 4);
}

#[test]
fn reset_validates_everything_before_applying() {
    let system = FakeSystem::builder()
        .with_l3_cat(FakeCat::new(16, 0xfff).with_cdp(FakeCdp::Off))
        .with_mba(FakeMba::new(8))
        .build();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);
    let before = manager.snapshot().unwrap();

    let result = manager.reset(ResetRequest {
        l3_cdp: CdpRequest::On,
        l2_cdp: CdpRequest::Any,
        mba: MbaRequest::Ctrl,
    });
    assert_eq!(Status::from(&result), Status::InvalidConfig);

    let result = manager.reset(ResetRequest {
        l3_cdp: CdpRequest::On,
        l2_cdp: CdpRequest::On,
        mba: MbaRequest::Any,
    });
    assert_eq!(Status::from(&result), Status::TechnologyUnsupported);

    assert!(applier.applied().is_empty());
    assert_eq!(manager.snapshot().unwrap(), before);
}

#[test]
fn reset_programs_all_modes_at_once() {
    let system = full_system();
    let applier = RecordingApply::with_kernel(system.kernel());
    let manager = initialized(&system, &applier);

    manager
        .reset(ResetRequest {
            l3_cdp: CdpRequest::On,
            l2_cdp: CdpRequest::On,
            mba: MbaRequest::Ctrl,
        })
        .unwrap();

    let expected = ModeSet {
        l3_cdp: CdpMode::On,
        l2_cdp: CdpMode::On,
        mba: MbaMode::Ctrl,
    };
    assert_eq!(applier.applied(), vec![expected]);
    let (capabilities, _) = manager.snapshot().unwrap();
    assert_eq!(capabilities.current_modes(), expected);
    assert_eq!(capabilities.l2ca().unwrap().num_classes, 4);
}

#[test]
fn reset_accepts_off_on_absent_technologies() {
    let system = l3_only_system();
    let applier = RecordingApply::new();
    let manager = initialized(&system, &applier);

    manager
        .reset(ResetRequest {
            l3_cdp: CdpRequest::Off,
            l2_cdp: CdpRequest::Off,
            mba: MbaRequest::Default,
        })
        .unwrap();

    assert!(applier.applied().is_empty());
}

#[test]
fn config_without_enforcement_only_records_modes() {
    let system = full_system();
    let config = RdtConfig {
        paths: system.paths().clone(),
        hw: Hw { enforce: false },
        reset: ResetRequest {
            l3_cdp: CdpRequest::On,
            l2_cdp: CdpRequest::Any,
            mba: MbaRequest::Ctrl,
        },
    };
    let manager = CapabilityManager::from_config(&config);
    manager.init().unwrap();

    manager.reset(config.reset).unwrap();

    let (capabilities, _) = manager.snapshot().unwrap();
    assert_eq!(capabilities.cdp_state(CacheLevel::L3), CdpState::On);
    assert_eq!(capabilities.mba_state(), MbaState::Ctrl);
    // nothing was remounted
    assert!(system.paths().resctrl.join("info/L3").exists());
}
