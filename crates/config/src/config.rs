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

use rdt_shared::types::ResetRequest;

use crate::defaults::default_enforce;
use crate::defaults::default_procfs_path;
use crate::defaults::default_resctrl_path;
use crate::defaults::default_sysfs_path;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RdtConfig {
    pub paths: SystemPaths,
    pub hw: Hw,
    /// Modes requested for an allocation reset.
    pub reset: ResetRequest,
}

/// Roots of the kernel interfaces the manager probes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemPaths {
    /// Mount point of the resctrl filesystem.
    pub resctrl: PathBuf,
    pub sysfs: PathBuf,
    pub procfs: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hw {
    /// If false, mode changes are only validated and recorded, nothing is programmed.
    pub enforce: bool,
}

impl SystemPaths {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            resctrl: root.join("sys/fs/resctrl"),
            sysfs: root.join("sys"),
            procfs: root.join("proc"),
        }
    }
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            resctrl: default_resctrl_path(),
            sysfs: default_sysfs_path(),
            procfs: default_procfs_path(),
        }
    }
}

impl Default for Hw {
    fn default() -> Self {
        Self {
            enforce: default_enforce(),
        }
    }
}
