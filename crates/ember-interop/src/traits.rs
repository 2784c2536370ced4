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

//! Backend contracts of the shared-texture bridge.
//!
//! The bridge itself is pure orchestration: keyed-mutex bookkeeping, per-
//! context records, ref counting and deferred release. The OS-specific
//! pieces (D3D11 keyed mutex, WGL_NV_DX_interop, the CUDA runtime) sit
//! behind these traits; tests drive the bridge with in-memory fakes.

use crate::error::BridgeError;
use ember_core::{AfterFlushSender, Extent2D, RawTexture};

/// Identifies a GPU adapter (a D3D LUID flattened to 64 bits).
pub type AdapterId = u64;

/// A D3D11 shared texture guarded by a keyed mutex.
///
/// `acquire` claims key 1 with an infinite timeout and blocks until the
/// producer releases; `release` posts key 0 back.
pub trait SharedSurface: Send + Sync {
    /// The adapter the texture's device lives on.
    fn adapter(&self) -> AdapterId;

    /// The texture's pixel size.
    fn extent(&self) -> Extent2D;

    /// Claims the keyed mutex.
    fn acquire(&self) -> Result<(), BridgeError>;

    /// Posts the keyed mutex back to the producer.
    fn release(&self) -> Result<(), BridgeError>;
}

/// A per-context GL-DX interop device with one registered texture.
///
/// All calls happen on the GL thread owning the context; the bridge never
/// moves an open interop object across threads.
pub trait GlInterop: Send {
    /// Registers the shared surface against a GL texture name.
    fn register(&mut self, surface: &dyn SharedSurface) -> Result<RawTexture, BridgeError>;

    /// DX-locks the registered texture so GL may sample it.
    fn lock(&mut self) -> Result<(), BridgeError>;

    /// Releases the DX lock.
    fn unlock(&mut self) -> Result<(), BridgeError>;

    /// Unregisters the texture and closes the interop device.
    fn unregister(&mut self) -> Result<(), BridgeError>;
}

/// Pinned host memory staging one frame of pixels between GPUs.
#[derive(Debug, Default)]
pub struct PinnedStaging {
    /// Tightly packed BGRA pixels.
    pub bytes: Vec<u8>,
    /// The staged surface's size.
    pub extent: Extent2D,
    /// The producer frame number the pixels belong to.
    pub frame: u64,
}

/// Invoked by the CUDA backend when an async upload lands on the consumer
/// GPU. `Ok` carries nothing; the bridge finalizes its own bookkeeping.
pub type CopyDone = Box<dyn FnOnce(Result<(), BridgeError>) + Send>;

/// The cross-GPU copy path for one consumer context.
///
/// CUDA cannot share keyed-mutex textures directly, so the owner side stages
/// device-to-host through pinned memory and each consumer uploads host-to-
/// device into a GL texture registered with CUDA.
pub trait CudaLink: Send {
    /// Copies the owner-side texture into pinned host memory. Runs while
    /// the keyed mutex is held.
    fn stage_to_host(
        &mut self,
        surface: &dyn SharedSurface,
        staging: &mut PinnedStaging,
    ) -> Result<(), BridgeError>;

    /// Begins the async host-to-GL-texture upload on the consumer device and
    /// returns the target GL texture. `done` fires from the backend's stream
    /// callback when the upload completes.
    fn upload_from_host(
        &mut self,
        staging: &PinnedStaging,
        done: CopyDone,
    ) -> Result<RawTexture, BridgeError>;
}

/// Opens backend objects for a render context on demand.
pub trait InteropFactory: Send + Sync {
    /// Opens a GL-DX interop device in the calling context.
    fn open_gl_interop(&self, ctx: &InteropContext) -> Result<Box<dyn GlInterop>, BridgeError>;

    /// Opens a CUDA link between the owner adapter and the calling context.
    fn open_cuda_link(&self, ctx: &InteropContext) -> Result<Box<dyn CudaLink>, BridgeError>;
}

/// What the bridge needs to know about a render thread.
#[derive(Clone)]
pub struct InteropContext {
    /// Stable identity of the render context.
    pub id: u64,
    /// The adapter the context's GL device runs on.
    pub adapter: AdapterId,
    /// The context's after-flush executor; unlocks and copy completions are
    /// reposted here so they run on the owning GL thread.
    pub after_flush: AfterFlushSender,
}

impl std::fmt::Debug for InteropContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteropContext")
            .field("id", &self.id)
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}
