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

use serde::Deserialize;
use serde::Serialize;

use super::CdpMode;
use super::MbaMode;

/// Requested CDP mode for an allocation reset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CdpRequest {
    /// Keep whatever is currently in effect.
    #[default]
    Any,
    Off,
    On,
}

/// Requested MBA mode for an allocation reset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MbaRequest {
    /// Keep whatever is currently in effect.
    #[default]
    Any,
    Default,
    Ctrl,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetRequest {
    pub l3_cdp: CdpRequest,
    pub l2_cdp: CdpRequest,
    pub mba: MbaRequest,
}

impl CdpRequest {
    pub fn mode(self) -> Option<CdpMode> {
        match self {
            Self::Any => None,
            Self::Off => Some(CdpMode::Off),
            Self::On => Some(CdpMode::On),
        }
    }
}

impl MbaRequest {
    pub fn mode(self) -> Option<MbaMode> {
        match self {
            Self::Any => None,
            Self::Default => Some(MbaMode::Default),
            Self::Ctrl => Some(MbaMode::Ctrl),
        }
    }
}
