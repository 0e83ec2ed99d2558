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

use std::path::Path;
use std::path::PathBuf;

use eyre::eyre;
use rdt_shared::types::CdpRequest;
use rdt_shared::types::MbaRequest;
use rdt_shared::types::ResetRequest;
use serde::Deserialize;
use serde::Serialize;

use super::defaults::default_enforce;
use super::defaults::default_procfs_path;
use super::defaults::default_resctrl_path;
use super::defaults::default_sysfs_path;
use crate::*;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedRdtConfig {
    #[serde(default)]
    pub paths: UnresolvedPaths,
    #[serde(default)]
    pub hw: UnresolvedHw,
    #[serde(default)]
    pub reset: UnresolvedReset,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedPaths {
    #[serde(default = "default_resctrl_path")]
    pub resctrl: PathBuf,
    #[serde(default = "default_sysfs_path")]
    pub sysfs: PathBuf,
    #[serde(default = "default_procfs_path")]
    pub procfs: PathBuf,
}

impl Default for UnresolvedPaths {
    fn default() -> Self {
        Self {
            resctrl: default_resctrl_path(),
            sysfs: default_sysfs_path(),
            procfs: default_procfs_path(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedHw {
    #[serde(default = "default_enforce")]
    pub enforce: bool,
}

impl Default for UnresolvedHw {
    fn default() -> Self {
        Self {
            enforce: default_enforce(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedReset {
    #[serde(default)]
    pub l3_cdp: CdpRequest,
    #[serde(default)]
    pub l2_cdp: CdpRequest,
    #[serde(default)]
    pub mba: MbaRequest,
}

impl UnresolvedRdtConfig {
    pub fn resolve(self, config_path: impl AsRef<Path>) -> eyre::Result<RdtConfig> {
        let config_dir = config_path.as_ref().parent().ok_or_else(|| {
            eyre!(
                "config resolver was provided with invalid config path: {}",
                config_path.as_ref().display()
            )
        })?;

        let config = RdtConfig {
            paths: self.paths.resolve(config_dir),
            hw: self.hw.resolve(),
            reset: self.reset.resolve(),
        };
        Ok(config)
    }
}

impl UnresolvedPaths {
    pub fn resolve(self, config_dir: &Path) -> SystemPaths {
        SystemPaths {
            resctrl: config_dir.join(self.resctrl),
            sysfs: config_dir.join(self.sysfs),
            procfs: config_dir.join(self.procfs),
        }
    }
}

impl UnresolvedHw {
    pub fn resolve(self) -> Hw {
        Hw {
            enforce: self.enforce,
        }
    }
}

impl UnresolvedReset {
    pub fn resolve(self) -> ResetRequest {
        ResetRequest {
            l3_cdp: self.l3_cdp,
            l2_cdp: self.l2_cdp,
            mba: self.mba,
        }
    }
}
