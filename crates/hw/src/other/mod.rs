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

//! This module is no-op implementation to allow the code to compile on non-Linux platforms.
use std::path::Path;
use std::path::PathBuf;

use rdt_shared::types::CpuInfo;
use rdt_shared::types::ModeSet;

use crate::HwResult;
use crate::ModeApply;

#[derive(Clone, Debug)]
pub struct ResctrlRemount {
    mount_point: PathBuf,
}

impl ResctrlRemount {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

impl ModeApply for ResctrlRemount {
    fn apply(&self, modes: &ModeSet, _cpu_info: &CpuInfo) -> HwResult<()> {
        tracing::warn!("No resctrl on this platform, not programming {modes}");
        Ok(())
    }
}
