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

//! Bridge error types.

use thiserror::Error;

/// Errors raised by the shared-texture bridge and its backends.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// `acquire` was called while an acquire is already outstanding.
    #[error("keyed mutex is already acquired")]
    AlreadyAcquired,

    /// A keyed-mutex acquire or release failed in the backend.
    #[error("keyed mutex: {0}")]
    KeyedMutex(String),

    /// Opening, registering, locking or unlocking a GL interop object failed.
    #[error("gl interop: {0}")]
    Interop(String),

    /// A CUDA registration, copy or callback setup failed.
    #[error("cuda: {0}")]
    Cuda(String),
}
