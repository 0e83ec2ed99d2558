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

mod mode;
mod request;
mod technology;

#[cfg(test)]
mod tests;

pub use mode::CdpMode;
pub use mode::MbaMode;
pub use mode::ModeSet;
pub use request::CdpRequest;
pub use request::MbaRequest;
pub use request::ResetRequest;
pub use technology::CacheLevel;
pub use technology::Technology;

pub use cpu_utils::CpuInfo;
pub use cpu_utils::LogicalCoreId;
pub use cpu_utils::SocketId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value {value:?}")]
pub struct ParseModeError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseModeError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
