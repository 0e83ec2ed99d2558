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

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum HwError {
    #[error("unmounting resctrl at {mount_point:?} there is an error: {io_error:?}")]
    Unmount {
        mount_point: PathBuf,
        io_error: std::io::Error,
    },

    #[error(
        "mounting resctrl at {mount_point:?} with options {options:?} there is an error: {io_error:?}"
    )]
    Mount {
        mount_point: PathBuf,
        options: String,
        io_error: std::io::Error,
    },
}

impl HwError {
    pub fn unmount(mount_point: impl Into<PathBuf>, io_error: std::io::Error) -> Self {
        Self::Unmount {
            mount_point: mount_point.into(),
            io_error,
        }
    }

    pub fn mount(
        mount_point: impl Into<PathBuf>,
        options: impl Into<String>,
        io_error: std::io::Error,
    ) -> Self {
        Self::Mount {
            mount_point: mount_point.into(),
            options: options.into(),
            io_error,
        }
    }
}
