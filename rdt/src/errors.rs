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

use cpu_utils::CPUTopologyError;
use rdt_hw::HwError;
use rdt_probe::ProbeError;
use thiserror::Error as ThisError;

use crate::Technology;

#[derive(ThisError, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    TopologyError(#[from] CPUTopologyError),

    #[error("no resource allocation technology found, resctrl at {resctrl:?}")]
    NothingDiscovered { resctrl: PathBuf },
}

#[derive(ThisError, Debug)]
pub enum RdtError {
    #[error("the manager is not initialized")]
    NotInitialized,

    #[error("the manager is already initialized")]
    AlreadyInitialized,

    #[error("{technology} is not supported on this system")]
    TechnologyUnsupported { technology: Technology },

    #[error("invalid {technology} configuration: {reason}")]
    InvalidConfig {
        technology: Technology,
        reason: String,
    },

    #[error("{technology} disappeared from resctrl after a mode change")]
    TechnologyVanished { technology: Technology },

    #[error(transparent)]
    DiscoveryError(#[from] DiscoveryError),

    #[error(transparent)]
    ProbeError(#[from] ProbeError),

    #[error(transparent)]
    HwError(#[from] HwError),
}

/// Coarse outcome codes, e.g. for reporting over an FFI or an RPC boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    NotFound,
    PermissionDenied,
    ParseError,
    NotInitialized,
    AlreadyInitialized,
    TechnologyUnsupported,
    InvalidConfig,
    DiscoveryError,
    Resource,
}

impl RdtError {
    pub fn technology_unsupported(technology: Technology) -> Self {
        Self::TechnologyUnsupported { technology }
    }

    pub fn invalid_config(technology: Technology, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            technology,
            reason: reason.into(),
        }
    }

    pub fn technology_vanished(technology: Technology) -> Self {
        Self::TechnologyVanished { technology }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::NotInitialized => Status::NotInitialized,
            Self::AlreadyInitialized => Status::AlreadyInitialized,
            Self::TechnologyUnsupported { .. } => Status::TechnologyUnsupported,
            Self::InvalidConfig { .. } => Status::InvalidConfig,
            Self::TechnologyVanished { .. } => Status::Resource,
            Self::DiscoveryError(_) => Status::DiscoveryError,
            Self::ProbeError(ProbeError::NotFound { .. }) => Status::NotFound,
            Self::ProbeError(ProbeError::PermissionDenied { .. }) => Status::PermissionDenied,
            Self::ProbeError(ProbeError::Parse { .. }) => Status::ParseError,
            Self::ProbeError(ProbeError::Io { .. }) => Status::Resource,
            Self::HwError(_) => Status::Resource,
        }
    }
}

impl DiscoveryError {
    pub fn nothing_discovered(resctrl: impl Into<PathBuf>) -> Self {
        Self::NothingDiscovered {
            resctrl: resctrl.into(),
        }
    }
}

impl<T> From<&Result<T, RdtError>> for Status {
    fn from(result: &Result<T, RdtError>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(error) => error.status(),
        }
    }
}
