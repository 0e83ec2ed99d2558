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

use nix::errno::Errno;
use nix::mount::MntFlags;
use nix::mount::MsFlags;
use rdt_shared::types::CpuInfo;
use rdt_shared::types::ModeSet;

use crate::resctrl_mount_options;
use crate::HwError;
use crate::HwResult;
use crate::ModeApply;

const RESCTRL_FS: &str = "resctrl";

/// Switches modes by remounting the resctrl filesystem with matching options.
///
/// Remounting drops every resource group created under the mount point, the kernel
/// doesn't allow changing these options in place.
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

    fn unmount(&self) -> HwResult<()> {
        match nix::mount::umount2(self.mount_point.as_path(), MntFlags::empty()) {
            Ok(()) => Ok(()),
            // not mounted yet
            Err(Errno::EINVAL) => Ok(()),
            Err(errno) => Err(HwError::unmount(&self.mount_point, errno.into())),
        }
    }

    fn mount(&self, options: String) -> HwResult<()> {
        nix::mount::mount(
            Some(RESCTRL_FS),
            self.mount_point.as_path(),
            Some(RESCTRL_FS),
            MsFlags::empty(),
            Some(options.as_str()),
        )
        .map_err(|errno| HwError::mount(&self.mount_point, options.as_str(), errno.into()))
    }
}

impl ModeApply for ResctrlRemount {
    fn apply(&self, modes: &ModeSet, _cpu_info: &CpuInfo) -> HwResult<()> {
        let options = resctrl_mount_options(modes);
        tracing::info!(
            "Remounting resctrl at {:?} with options {options:?}",
            self.mount_point
        );

        self.unmount()?;
        self.mount(options)
    }
}
