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

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CpuVendor {
    Intel,
    Amd,
    #[default]
    Unknown,
}

impl CpuVendor {
    #[cfg(target_arch = "x86_64")]
    pub fn detect() -> Self {
        use raw_cpuid::CpuId;

        let cpuid = CpuId::new();
        match cpuid.get_vendor_info() {
            Some(vendor_info) if vendor_info.as_str() == "GenuineIntel" => Self::Intel,
            Some(vendor_info) if vendor_info.as_str() == "AuthenticAMD" => Self::Amd,
            _ => Self::Unknown,
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    pub fn detect() -> Self {
        Self::Unknown
    }
}
