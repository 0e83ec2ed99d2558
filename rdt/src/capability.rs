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

use serde::Serialize;

use crate::CacheLevel;
use crate::CdpMode;
use crate::MbaMode;
use crate::ModeSet;
use crate::Technology;

/// Resource allocation technologies discovered on the system, with their parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    l3ca: Option<CacheAllocation>,
    l2ca: Option<CacheAllocation>,
    mba: Option<MemBwAllocation>,
}

/// Cache Allocation Technology parameters of one cache level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheAllocation {
    /// Number of classes of service, as the kernel reports it for the current CDP mode.
    pub num_classes: u32,
    pub num_ways: u32,
    /// Size of one way in bytes, 0 if the cache geometry is unknown.
    pub way_size: u64,
    /// Ways shared with other agents (e.g. GPU or IO).
    pub way_contention: u64,
    pub non_contiguous_cbm: bool,
    pub cdp: CdpState,
}

/// Memory Bandwidth Allocation parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemBwAllocation {
    pub num_classes: u32,
    pub throttle_max: u32,
    pub throttle_step: u32,
    pub is_linear: bool,
    pub ctrl_supported: bool,
    pub mode: MbaMode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CdpState {
    Unsupported,
    Off,
    On,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MbaState {
    Unsupported,
    Default,
    Ctrl,
}

impl Capabilities {
    pub(crate) fn new(
        l3ca: Option<CacheAllocation>,
        l2ca: Option<CacheAllocation>,
        mba: Option<MemBwAllocation>,
    ) -> Self {
        Self { l3ca, l2ca, mba }
    }

    pub fn l3ca(&self) -> Option<&CacheAllocation> {
        self.l3ca.as_ref()
    }

    pub fn l2ca(&self) -> Option<&CacheAllocation> {
        self.l2ca.as_ref()
    }

    pub fn cache_allocation(&self, level: CacheLevel) -> Option<&CacheAllocation> {
        match level {
            CacheLevel::L2 => self.l2ca(),
            CacheLevel::L3 => self.l3ca(),
        }
    }

    pub fn mba(&self) -> Option<&MemBwAllocation> {
        self.mba.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.l3ca.is_none() && self.l2ca.is_none() && self.mba.is_none()
    }

    pub fn technology(&self, technology: Technology) -> bool {
        match technology {
            Technology::L3Cat => self.l3ca.is_some(),
            Technology::L2Cat => self.l2ca.is_some(),
            Technology::L3Cdp => self.cdp_state(CacheLevel::L3) != CdpState::Unsupported,
            Technology::L2Cdp => self.cdp_state(CacheLevel::L2) != CdpState::Unsupported,
            Technology::Mba => self.mba.is_some(),
            Technology::MbaCtrl => self.mba.map_or(false, |mba| mba.ctrl_supported),
        }
    }

    pub fn cdp_state(&self, level: CacheLevel) -> CdpState {
        self.cache_allocation(level)
            .map_or(CdpState::Unsupported, |cat| cat.cdp)
    }

    pub fn mba_state(&self) -> MbaState {
        match self.mba {
            None => MbaState::Unsupported,
            Some(mba) => mba.mode.into(),
        }
    }

    /// Modes in effect, absent technologies count as off/default.
    pub fn current_modes(&self) -> ModeSet {
        ModeSet {
            l3_cdp: self.cdp_state(CacheLevel::L3).mode().unwrap_or_default(),
            l2_cdp: self.cdp_state(CacheLevel::L2).mode().unwrap_or_default(),
            mba: self.mba.map(|mba| mba.mode).unwrap_or_default(),
        }
    }

    pub(crate) fn set_cache_allocation(&mut self, level: CacheLevel, cat: CacheAllocation) {
        match level {
            CacheLevel::L2 => self.l2ca = Some(cat),
            CacheLevel::L3 => self.l3ca = Some(cat),
        }
    }

    pub(crate) fn set_mba(&mut self, mba: MemBwAllocation) {
        self.mba = Some(mba);
    }
}

impl CdpState {
    /// None for a cache level without CDP.
    pub fn mode(self) -> Option<CdpMode> {
        match self {
            Self::Unsupported => None,
            Self::Off => Some(CdpMode::Off),
            Self::On => Some(CdpMode::On),
        }
    }
}

impl From<CdpMode> for CdpState {
    fn from(mode: CdpMode) -> Self {
        match mode {
            CdpMode::Off => Self::Off,
            CdpMode::On => Self::On,
        }
    }
}

impl From<MbaMode> for MbaState {
    fn from(mode: MbaMode) -> Self {
        match mode {
            MbaMode::Default => Self::Default,
            MbaMode::Ctrl => Self::Ctrl,
        }
    }
}
