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

use rdt_shared::types::CpuInfo;
use rdt_shared::types::ModeSet;

use crate::HwResult;
use crate::ModeApply;

/// Accepts every mode set without touching the platform, used when enforcement is off.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopApply;

impl ModeApply for NoopApply {
    fn apply(&self, modes: &ModeSet, _cpu_info: &CpuInfo) -> HwResult<()> {
        tracing::debug!("Enforcement is disabled, not programming {modes}");
        Ok(())
    }
}
