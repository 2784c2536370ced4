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

//! # Ember Interop
//!
//! The cross-GPU shared-texture bridge. A producer (typically a browser
//! compositor in another process) exposes a D3D11 texture through a keyed
//! mutex; this crate transports it into any number of GL render contexts:
//! GL-DX interop on the adapter that owns the texture, CUDA staged copies
//! through pinned host memory for every other adapter. The orchestration
//! (per-frame acquire/release, ref counting, deferred release, per-context
//! failure latching) lives here; the OS backends sit behind traits.

#![warn(missing_docs)]

mod bag;
mod error;
mod texture;
mod traits;

pub use bag::{TextureBag, RETIRE_AFTER_SECS};
pub use error::BridgeError;
pub use texture::{BridgeTexture, SharedTexture};
pub use traits::{
    AdapterId, CopyDone, CudaLink, GlInterop, InteropContext, InteropFactory, PinnedStaging,
    SharedSurface,
};
