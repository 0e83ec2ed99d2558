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

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![deny(
    dead_code,
    nonstandard_style,
    unused_imports,
    unused_mut,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

//! Linux exposes most of the resource control state as tiny text files under /proc,
//! /sys and the resctrl mount. This crate reads them without caching anything,
//! so every call observes the current kernel state.

mod errors;
mod os_probe;
mod sysfs;


pub use errors::ProbeError;
#[cfg(any(test, feature = "mock"))]
pub use os_probe::MockOsProbe;
pub use os_probe::OsProbe;
pub use sysfs::SysfsProbe;

pub type ProbeResult<T> = Result<T, ProbeError>;
