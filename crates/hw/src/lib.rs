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

/// This crate programs allocation modes on platforms that have a way to do it,
/// i.e. Linux with the resctrl filesystem. For everything else it's a no-op.

#[cfg(target_os = "linux")]
#[path = "linux/mod.rs"]
mod hw_impl;
#[cfg(not(target_os = "linux"))]
#[path = "other/mod.rs"]
mod hw_impl;

mod errors;
mod noop;


use std::fmt::Debug;

use rdt_shared::types::CpuInfo;
use rdt_shared::types::ModeSet;

pub use errors::HwError;
pub use hw_impl::*;
pub use noop::NoopApply;

pub type HwResult<T> = Result<T, HwError>;

pub trait ModeApply: Debug + Send + Sync {
    /// Programs the complete set of modes. Called only with modes that were validated
    /// against discovered capabilities; `cpu_info` tells where the programmed state lives.
    fn apply(&self, modes: &ModeSet, cpu_info: &CpuInfo) -> HwResult<()>;
}

/// Resctrl mount options that select the given modes.
pub fn resctrl_mount_options(modes: &ModeSet) -> String {
    let mut options = Vec::new();
    if modes.l3_cdp.is_on() {
        options.push("cdp");
    }
    if modes.l2_cdp.is_on() {
        options.push("cdpl2");
    }
    if modes.mba == rdt_shared::types::MbaMode::Ctrl {
        options.push("mba_MBps");
    }

    options.join(",")
}
