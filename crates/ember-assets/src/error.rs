// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types of the asset pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while pinging, generating, caching or loading image assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Reading or writing a source or cache file failed.
    #[error("i/o on '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The source image could not be decoded.
    #[error("decoding '{path}' failed: {reason}")]
    Decode {
        /// The source file.
        path: PathBuf,
        /// The codec's message.
        reason: String,
    },

    /// A cache container file is malformed.
    #[error("invalid cache container '{path}': {reason}")]
    InvalidContainer {
        /// The cache file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The requested operation is not supported on this platform or format.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
