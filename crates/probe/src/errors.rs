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
use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ProbeError {
    #[error("file '{path:?}' not found")]
    NotFound { path: PathBuf },

    #[error("access to '{path:?}' is denied")]
    PermissionDenied { path: PathBuf },

    #[error("content {content:?} of '{path:?}' is not an unsigned integer in base {radix}")]
    Parse {
        path: PathBuf,
        content: String,
        radix: u32,
    },

    #[error("reading '{path:?}' there is an error: {io_error:?}")]
    Io {
        path: PathBuf,
        io_error: std::io::Error,
    },
}

impl ProbeError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied { path: path.into() }
    }

    pub fn parse(path: impl Into<PathBuf>, content: impl Into<String>, radix: u32) -> Self {
        Self::Parse {
            path: path.into(),
            content: content.into(),
            radix,
        }
    }

    pub(crate) fn from_io(path: &Path, io_error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match io_error.kind() {
            ErrorKind::NotFound => Self::not_found(path),
            ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::Io {
                path: path.to_path_buf(),
                io_error,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
