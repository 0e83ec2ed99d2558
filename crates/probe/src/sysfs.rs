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

use crate::OsProbe;
use crate::ProbeError;
use crate::ProbeResult;

/// Probe over the real filesystem of the running OS.
///
/// All I/O is synchronous and blocking: the target files live in pseudo-filesystems
/// and are served from memory by the kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysfsProbe;

impl SysfsProbe {
    pub fn new() -> Self {
        Self
    }
}

impl OsProbe for SysfsProbe {
    fn read_u64(&self, path: &Path, radix: u32) -> ProbeResult<u64> {
        let content = std::fs::read(path).map_err(|error| ProbeError::from_io(path, error))?;
        let value = parse_u64(&content, radix)
            .ok_or_else(|| ProbeError::parse(path, String::from_utf8_lossy(&content), radix))?;

        tracing::debug!("Read {value:#x} from {path:?}");
        Ok(value)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_string(&self, path: &Path) -> ProbeResult<String> {
        let content = std::fs::read(path).map_err(|error| ProbeError::from_io(path, error))?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    fn file_contains(&self, path: &Path, needle: &str) -> ProbeResult<bool> {
        let content = std::fs::read(path).map_err(|error| ProbeError::from_io(path, error))?;
        Ok(contains(&content, needle.as_bytes()))
    }
}

pub(crate) fn parse_u64(content: &[u8], radix: u32) -> Option<u64> {
    if !(2..=36).contains(&radix) {
        return None;
    }

    let content = std::str::from_utf8(content).ok()?.trim();
    let digits = match radix {
        16 => content
            .strip_prefix("0x")
            .or_else(|| content.strip_prefix("0X"))
            .unwrap_or(content),
        _ => content,
    };

    // from_str_radix accepts a leading '+', kernel files never contain one
    if digits.is_empty() || digits.starts_with('+') {
        return None;
    }

    u64::from_str_radix(digits, radix).ok()
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }

    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
