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

use std::fmt::Debug;
use std::path::Path;

use crate::ProbeResult;

/// Abstracts the kernel-exposed virtual filesystem so it can be substituted in tests.
///
/// Implementations must not cache: kernel values change between calls, e.g. a feature
/// directory appears after resctrl is remounted with different options.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait OsProbe: Debug + Send + Sync {
    /// Parses the whole file content as an unsigned integer in the given radix.
    /// Surrounding whitespace and, for radix 16, a `0x` prefix are accepted.
    fn read_u64(&self, path: &Path, radix: u32) -> ProbeResult<u64>;

    /// Returns false on any access error.
    fn file_exists(&self, path: &Path) -> bool;

    /// Returns false on any access error.
    fn dir_exists(&self, path: &Path) -> bool;

    /// Whole file content, invalid UTF-8 sequences are replaced.
    fn read_string(&self, path: &Path) -> ProbeResult<String>;

    /// Checks whether `needle` occurs anywhere in the file content.
    fn file_contains(&self, path: &Path, needle: &str) -> ProbeResult<bool>;
}
