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

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheLevel {
    L2,
    L3,
}

/// Resource allocation technologies the manager knows about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technology {
    L3Cat,
    L3Cdp,
    L2Cat,
    L2Cdp,
    Mba,
    MbaCtrl,
}

impl Technology {
    pub fn cat(level: CacheLevel) -> Self {
        match level {
            CacheLevel::L2 => Self::L2Cat,
            CacheLevel::L3 => Self::L3Cat,
        }
    }

    pub fn cdp(level: CacheLevel) -> Self {
        match level {
            CacheLevel::L2 => Self::L2Cdp,
            CacheLevel::L3 => Self::L3Cdp,
        }
    }
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L2 => write!(f, "L2"),
            Self::L3 => write!(f, "L3"),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::L3Cat => "L3 CAT",
            Self::L3Cdp => "L3 CDP",
            Self::L2Cat => "L2 CAT",
            Self::L2Cdp => "L2 CDP",
            Self::Mba => "MBA",
            Self::MbaCtrl => "MBA CTRL",
        };
        write!(f, "{name}")
    }
}
