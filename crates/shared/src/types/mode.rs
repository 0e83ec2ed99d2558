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

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use super::ParseModeError;

/// Code and Data Prioritization mode of a cache level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CdpMode {
    #[default]
    Off,
    On,
}

/// Memory Bandwidth Allocation mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MbaMode {
    /// Throttling values are percentages of the available bandwidth.
    #[default]
    Default,
    /// Throttling values are MBps, enforced by the kernel software controller.
    Ctrl,
}

/// Modes of every configurable technology at once, as they have to be programmed
/// together (e.g. they all end up in the same resctrl mount options).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModeSet {
    pub l3_cdp: CdpMode,
    pub l2_cdp: CdpMode,
    pub mba: MbaMode,
}

impl CdpMode {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl FromStr for CdpMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            _ => Err(ParseModeError::new("CDP mode", s)),
        }
    }
}

impl FromStr for MbaMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "ctrl" => Ok(Self::Ctrl),
            _ => Err(ParseModeError::new("MBA mode", s)),
        }
    }
}

impl fmt::Display for CdpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::On => write!(f, "on"),
        }
    }
}

impl fmt::Display for MbaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Ctrl => write!(f, "ctrl"),
        }
    }
}

impl fmt::Display for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "l3 cdp {}, l2 cdp {}, mba {}",
            self.l3_cdp, self.l2_cdp, self.mba
        )
    }
}
