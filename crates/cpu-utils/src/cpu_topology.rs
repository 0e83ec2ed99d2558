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

use nonempty::NonEmpty;
use rdt_probe::OsProbe;
use rdt_probe::ProbeResult;

use crate::errors::CPUTopologyError;
use crate::CTResult;
use crate::CacheInfo;
use crate::CoreInfo;
use crate::CpuInfo;
use crate::CpuVendor;
use crate::LogicalCoreId;
use crate::SocketId;

const CPU_DIR: &str = "devices/system/cpu";
const MAX_CACHE_INDEX: u32 = 16;

/// Reads the CPU topology from sysfs, `/sys/devices/system/cpu/cpu*` entries.
#[derive(Debug)]
pub struct CpuTopology<'probe> {
    probe: &'probe dyn OsProbe,
    cpu_dir: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CacheLevel {
    L2,
    L3,
}

impl<'probe> CpuTopology<'probe> {
    pub fn new(probe: &'probe dyn OsProbe, sysfs_root: impl AsRef<Path>) -> Self {
        Self {
            probe,
            cpu_dir: sysfs_root.as_ref().join(CPU_DIR),
        }
    }

    pub fn discover(&self) -> CTResult<CpuInfo> {
        let mut cores = Vec::new();

        for index in 0u64.. {
            let core_dir = self.cpu_dir.join(format!("cpu{index}"));
            if !self.probe.dir_exists(&core_dir) {
                break;
            }
            if !self.is_online(&core_dir) {
                tracing::debug!("Logical core {index} is offline, skipping");
                continue;
            }

            let core_id = u32::try_from(index)
                .map(LogicalCoreId::new)
                .map_err(|_| CPUTopologyError::logical_core_too_big(index))?;
            cores.push(self.core_info(core_id, &core_dir)?);
        }

        let cores = NonEmpty::from_vec(cores)
            .ok_or_else(|| CPUTopologyError::logical_cores_not_found(&self.cpu_dir))?;

        let first_core_dir = self.cpu_dir.join(format!("cpu{}", cores.head.core_id));
        let l2 = self.cache_info(&first_core_dir, CacheLevel::L2);
        let l3 = self.cache_info(&first_core_dir, CacheLevel::L3);

        let cpu_info = CpuInfo::new(CpuVendor::detect(), cores, l2, l3);
        tracing::debug!(
            "Discovered {} logical cores on {} sockets",
            cpu_info.cores_count(),
            cpu_info.sockets().len()
        );

        Ok(cpu_info)
    }

    fn is_online(&self, core_dir: &Path) -> bool {
        // cpu0 usually can't be offlined and has no such file
        match self.probe.read_u64(&core_dir.join("online"), 10) {
            Ok(value) => value != 0,
            Err(_) => true,
        }
    }

    fn core_info(&self, core_id: LogicalCoreId, core_dir: &Path) -> CTResult<CoreInfo> {
        let socket = self
            .probe
            .read_u64(&core_dir.join("topology/physical_package_id"), 10)?;
        let socket = u32::try_from(socket)
            .map(SocketId::new)
            .map_err(|_| CPUTopologyError::socket_id_too_big(core_id, socket))?;

        let l2_id = self
            .cache_dir(core_dir, CacheLevel::L2)
            .and_then(|dir| self.read_optional_u32(&dir.join("id")));
        let l3_id = self
            .cache_dir(core_dir, CacheLevel::L3)
            .and_then(|dir| self.read_optional_u32(&dir.join("id")));

        Ok(CoreInfo {
            core_id,
            socket,
            l2_id,
            l3_id,
        })
    }

    fn cache_info(&self, core_dir: &Path, level: CacheLevel) -> Option<CacheInfo> {
        let dir = self.cache_dir(core_dir, level)?;

        match self.cache_geometry(&dir) {
            Ok(info) => Some(info),
            Err(error) => {
                tracing::warn!("Failed to read {level:?} cache geometry: {error}");
                None
            }
        }
    }

    fn cache_geometry(&self, cache_dir: &Path) -> CTResult<CacheInfo> {
        let read = |name: &str| -> ProbeResult<u32> {
            let value = self.probe.read_u64(&cache_dir.join(name), 10)?;
            Ok(u32::try_from(value).unwrap_or(u32::MAX))
        };

        CacheInfo::new(
            read("ways_of_associativity")?,
            read("number_of_sets")?,
            read("physical_line_partition")?,
            read("coherency_line_size")?,
        )
        .ok_or_else(|| CPUTopologyError::cache_size_overflow(cache_dir))
    }

    /// Finds the `cache/index*` directory describing a data or unified cache of the level.
    fn cache_dir(&self, core_dir: &Path, level: CacheLevel) -> Option<PathBuf> {
        let wanted_level = match level {
            CacheLevel::L2 => 2,
            CacheLevel::L3 => 3,
        };

        (0..MAX_CACHE_INDEX)
            .map(|index| core_dir.join(format!("cache/index{index}")))
            .take_while(|dir| self.probe.dir_exists(dir))
            .find(|dir| {
                let level_matches = self
                    .probe
                    .read_u64(&dir.join("level"), 10)
                    .map_or(false, |value| value == wanted_level);
                let is_instruction = self
                    .probe
                    .file_contains(&dir.join("type"), "Instruction")
                    .unwrap_or(false);

                level_matches && !is_instruction
            })
    }

    fn read_optional_u32(&self, path: &Path) -> Option<u32> {
        self.probe
            .read_u64(path, 10)
            .ok()
            .and_then(|value| u32::try_from(value).ok())
    }
}
