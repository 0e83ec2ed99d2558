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

use std::path::PathBuf;

use maplit::hashmap;
use rdt_shared::types::CdpRequest;
use rdt_shared::types::MbaRequest;
use rdt_shared::types::ResetRequest;

use crate::config_loader::load_config;
use crate::config_loader::load_config_with_env;
use crate::Hw;
use crate::RdtConfig;
use crate::SystemPaths;

fn tests_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("src/tests");
    path
}

#[test]
fn parse_basic_config() {
    let config_path = tests_dir().join("default.toml");

    let actual_config = load_config(config_path.as_os_str().to_str().unwrap()).unwrap();

    let paths = SystemPaths {
        resctrl: tests_dir().join("./root/resctrl"),
        sysfs: PathBuf::from("/sys"),
        procfs: PathBuf::from("/proc"),
    };
    let reset = ResetRequest {
        l3_cdp: CdpRequest::On,
        l2_cdp: CdpRequest::Any,
        mba: MbaRequest::Ctrl,
    };
    let expected_config = RdtConfig {
        paths,
        hw: Hw { enforce: false },
        reset,
    };

    assert_eq!(actual_config, expected_config);
}

#[test]
fn empty_config_resolves_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("rdt.toml");
    std::fs::write(&config_path, "").unwrap();

    let actual_config = load_config(config_path.to_str().unwrap()).unwrap();

    assert_eq!(actual_config, RdtConfig::default());
}

#[test]
fn invalid_mode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("rdt.toml");
    std::fs::write(&config_path, "[reset]\nl2-cdp = \"sometimes\"\n").unwrap();

    let result = load_config(config_path.to_str().unwrap());

    assert!(result.is_err());
}

#[test]
fn missing_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("absent.toml");

    let result = load_config(config_path.to_str().unwrap());

    assert!(result.is_err());
}

#[test]
fn paths_with_root_follow_linux_layout() {
    let paths = SystemPaths::with_root("/tmp/fake");

    assert_eq!(paths.resctrl, PathBuf::from("/tmp/fake/sys/fs/resctrl"));
    assert_eq!(paths.sysfs, PathBuf::from("/tmp/fake/sys"));
    assert_eq!(paths.procfs, PathBuf::from("/tmp/fake/proc"));
}

#[test]
fn environment_overrides_nested_keys() {
    let config_path = tests_dir().join("default.toml");
    let env = hashmap! {
        "RDT_RESET__L3_CDP".to_string() => "off".to_string(),
        "RDT_RESET__L2_CDP".to_string() => "on".to_string(),
        "RDT_HW__ENFORCE".to_string() => "true".to_string(),
        "RDT_PATHS__PROCFS".to_string() => "/fake/proc".to_string(),
        "PATH".to_string() => "/usr/bin".to_string(),
    };

    let actual_config =
        load_config_with_env(config_path.as_os_str().to_str().unwrap(), env).unwrap();

    let expected_reset = ResetRequest {
        l3_cdp: CdpRequest::Off,
        l2_cdp: CdpRequest::On,
        mba: MbaRequest::Ctrl,
    };
    assert_eq!(actual_config.reset, expected_reset);
    assert_eq!(actual_config.hw, Hw { enforce: true });
    assert_eq!(actual_config.paths.procfs, PathBuf::from("/fake/proc"));
    assert_eq!(actual_config.paths.sysfs, PathBuf::from("/sys"));
}

#[test]
fn invalid_environment_override_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("rdt.toml");
    std::fs::write(&config_path, "").unwrap();
    let env = hashmap! {
        "RDT_RESET__MBA".to_string() => "fast".to_string(),
    };

    let result = load_config_with_env(config_path.to_str().unwrap(), env);

    assert!(result.is_err());
}
