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

use std::collections::BTreeSet;

use nonempty::NonEmpty;

use crate::CpuVendor;
use crate::LogicalCoreId;
use crate::SocketId;

/// Topology snapshot taken during one discovery pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuInfo {
    vendor: CpuVendor,
    cores: NonEmpty<CoreInfo>,
    l2: Option<CacheInfo>,
    l3: Option<CacheInfo>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CoreInfo {
    pub core_id: LogicalCoreId,
    pub socket: SocketId,
    /// Id of the L2 cache shared by this core, if the kernel exposes it.
    pub l2_id: Option<u32>,
    /// Id of the L3 cache shared by this core, if the kernel exposes it.
    pub l3_id: Option<u32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CacheInfo {
    pub num_ways: u32,
    pub num_sets: u32,
    pub num_partitions: u32,
    pub line_size: u32,
    pub total_size: u64,
    pub way_size: u64,
}

impl CpuInfo {
    pub fn new(
        vendor: CpuVendor,
        cores: NonEmpty<CoreInfo>,
        l2: Option<CacheInfo>,
        l3: Option<CacheInfo>,
    ) -> Self {
        Self {
            vendor,
            cores,
            l2,
            l3,
        }
    }

    pub fn vendor(&self) -> CpuVendor {
        self.vendor
    }

    pub fn cores(&self) -> impl Iterator<Item = &CoreInfo> {
        self.cores.iter()
    }

    pub fn cores_count(&self) -> usize {
        self.cores.len()
    }

    pub fn core(&self, core_id: LogicalCoreId) -> Option<&CoreInfo> {
        self.cores.iter().find(|core| core.core_id == core_id)
    }

    pub fn sockets(&self) -> BTreeSet<SocketId> {
        self.cores.iter().map(|core| core.socket).collect()
    }

    pub fn l2(&self) -> Option<&CacheInfo> {
        self.l2.as_ref()
    }

    pub fn l3(&self) -> Option<&CacheInfo> {
        self.l3.as_ref()
    }
}

impl CacheInfo {
    /// None if the sizes don't fit into u64, i.e. the kernel reported garbage.
    pub fn new(num_ways: u32, num_sets: u32, num_partitions: u32, line_size: u32) -> Option<Self> {
        let total_size = (num_ways as u64)
            .checked_mul(num_sets as u64)?
            .checked_mul(num_partitions as u64)?
            .checked_mul(line_size as u64)?;
        let way_size = total_size.checked_div(num_ways as u64).unwrap_or(0);

        Some(Self {
            num_ways,
            num_sets,
            num_partitions,
            line_size,
            total_size,
            way_size,
        })
    }
}
