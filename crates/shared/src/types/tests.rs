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

use std::str::FromStr;

use super::*;

#[test]
fn modes_parse_and_display() {
    for mode in [CdpMode::Off, CdpMode::On] {
        assert_eq!(CdpMode::from_str(&mode.to_string()), Ok(mode));
    }
    for mode in [MbaMode::Default, MbaMode::Ctrl] {
        assert_eq!(MbaMode::from_str(&mode.to_string()), Ok(mode));
    }
}

#[test]
fn unknown_mode_is_rejected() {
    let error = CdpMode::from_str("enabled").unwrap_err();
    assert_eq!(error.kind, "CDP mode");
    assert_eq!(error.value, "enabled");

    assert!(MbaMode::from_str("Ctrl").is_err());
}

#[test]
fn any_request_keeps_current_mode() {
    assert_eq!(CdpRequest::Any.mode(), None);
    assert_eq!(CdpRequest::On.mode(), Some(CdpMode::On));
    assert_eq!(MbaRequest::Any.mode(), None);
    assert_eq!(MbaRequest::Ctrl.mode(), Some(MbaMode::Ctrl));
}

#[test]
fn technology_per_cache_level() {
    assert_eq!(Technology::cat(CacheLevel::L2), Technology::L2Cat);
    assert_eq!(Technology::cdp(CacheLevel::L3), Technology::L3Cdp);
    assert_eq!(Technology::MbaCtrl.to_string(), "MBA CTRL");
}

#[test]
fn mode_set_display() {
    let modes = ModeSet {
        l3_cdp: CdpMode::On,
        l2_cdp: CdpMode::Off,
        mba: MbaMode::Ctrl,
    };

    assert_eq!(modes.to_string(), "l3 cdp on, l2 cdp off, mba ctrl");
}
