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

use rdt_probe::ProbeError;
use thiserror::Error as ThisError;

use crate::LogicalCoreId;

#[derive(Debug, ThisError)]
pub enum CPUTopologyError {
    #[error(transparent)]
    ProbeError(#[from] ProbeError),

    #[error("no online logical cores found under {cpu_dir:?}")]
    LogicalCoresNotFound { cpu_dir: PathBuf },

    #[error("logical core id {index} is too big")]
    LogicalCoreIdTooBig { index: u64 },

    #[error("socket id {value} of logical core {core_id} is too big")]
    SocketIdTooBig { core_id: LogicalCoreId, value: u64 },

    #[error("cache geometry under {cache_dir:?} gives a size that overflows u64")]
    CacheSizeOverflow { cache_dir: PathBuf },
}

impl CPUTopologyError {
    pub fn logical_cores_not_found(cpu_dir: impl Into<PathBuf>) -> Self {
        Self::LogicalCoresNotFound {
            cpu_dir: cpu_dir.into(),
        }
    }

    pub fn logical_core_too_big(index: u64) -> Self {
        Self::LogicalCoreIdTooBig { index }
    }

    pub fn socket_id_too_big(core_id: LogicalCoreId, value: u64) -> Self {
        Self::SocketIdTooBig { core_id, value }
    }

    pub fn cache_size_overflow(cache_dir: impl Into<PathBuf>) -> Self {
        Self::CacheSizeOverflow {
            cache_dir: cache_dir.into(),
        }
    }
}
