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

//! One shared texture and its per-context interop state.
//!
//! Three mutexes guard a [`SharedTexture`], always taken in this order:
//! the device mutex (backend callouts and per-context records), the ref
//! mutex (`acquired` / `refs` / deferred release), and the pinned-copy
//! mutex (the host staging buffer shared by all cross-GPU consumers).
//! Never the reverse; helpers that need an earlier lock drop what they
//! hold and re-enter.

use crate::error::BridgeError;
use crate::traits::{
    CudaLink, GlInterop, InteropContext, InteropFactory, PinnedStaging, SharedSurface,
};
use ember_core::RawTexture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What a renderer samples from this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeTexture {
    /// The GL texture name valid in the requesting context.
    pub texture: RawTexture,
    /// The producer frame the pixels belong to.
    pub frame: u64,
}

struct ContextRecord {
    interop: Option<Box<dyn GlInterop>>,
    gl_texture: Option<RawTexture>,
    cuda: Option<Box<dyn CudaLink>>,
    copy_texture: Option<RawTexture>,
    // Producer frame the consumer copy holds; 0 = no copy yet.
    copy_frame: u64,
    copy_in_flight: bool,
    // Latched on the first backend failure; the context never retries.
    failed: bool,
    after_flush: ember_core::AfterFlushSender,
}

impl ContextRecord {
    fn new(after_flush: ember_core::AfterFlushSender) -> Self {
        Self {
            interop: None,
            gl_texture: None,
            cuda: None,
            copy_texture: None,
            copy_frame: 0,
            copy_in_flight: false,
            failed: false,
            after_flush,
        }
    }
}

#[derive(Default)]
struct DeviceState {
    contexts: HashMap<u64, ContextRecord>,
}

struct RefState {
    acquired: bool,
    refs: u32,
    frame_num: u64,
    release_pending: bool,
}

struct PinnedCopy {
    staging: PinnedStaging,
}

/// A D3D11 shared texture bridged into one or more GL contexts.
pub struct SharedTexture {
    surface: Arc<dyn SharedSurface>,
    factory: Arc<dyn InteropFactory>,
    device: Mutex<DeviceState>,
    refs: Mutex<RefState>,
    pinned: Mutex<PinnedCopy>,
}

impl SharedTexture {
    /// Wraps a shared surface. Nothing is registered until a context asks
    /// for the texture.
    pub fn new(surface: Arc<dyn SharedSurface>, factory: Arc<dyn InteropFactory>) -> Arc<Self> {
        Arc::new(Self {
            surface,
            factory,
            device: Mutex::new(DeviceState::default()),
            refs: Mutex::new(RefState {
                acquired: false,
                refs: 0,
                frame_num: 0,
                release_pending: false,
            }),
            pinned: Mutex::new(PinnedCopy {
                staging: PinnedStaging::default(),
            }),
        })
    }

    /// The underlying surface.
    pub fn surface(&self) -> &dyn SharedSurface {
        self.surface.as_ref()
    }

    /// The frame number of the most recent acquire.
    pub fn frame_num(&self) -> u64 {
        self.lock_refs().frame_num
    }

    /// Whether the keyed mutex is currently held.
    pub fn is_acquired(&self) -> bool {
        self.lock_refs().acquired
    }

    /// Current count of in-flight renderers and copies.
    pub fn ref_count(&self) -> u32 {
        self.lock_refs().refs
    }

    /// Claims the keyed mutex and advances the frame number. Blocks until
    /// the producer releases its side. Fails if an acquire is already
    /// outstanding.
    pub fn acquire(&self) -> Result<u64, BridgeError> {
        let _device = self.lock_device();
        {
            let refs = self.lock_refs();
            if refs.acquired {
                return Err(BridgeError::AlreadyAcquired);
            }
        }
        self.surface.acquire()?;
        let mut refs = self.lock_refs();
        refs.acquired = true;
        refs.frame_num += 1;
        Ok(refs.frame_num)
    }

    /// Posts the keyed mutex back. If renderers or copies still reference
    /// the texture, the release is deferred until the last one unrefs.
    /// Idempotent when not acquired.
    pub fn release(&self) -> Result<(), BridgeError> {
        let _device = self.lock_device();
        {
            let mut refs = self.lock_refs();
            if !refs.acquired {
                return Ok(());
            }
            if refs.refs > 0 {
                refs.release_pending = true;
                return Ok(());
            }
            refs.acquired = false;
            refs.release_pending = false;
        }
        self.surface.release()
    }

    /// Returns a texture usable in `ctx` this frame, per the bridge
    /// protocol: interop path on the owner adapter, copy path elsewhere.
    /// Backend failures latch the context and are reported as `None`.
    pub fn texture(self: &Arc<Self>, ctx: &InteropContext, allow_copy: bool) -> Option<BridgeTexture> {
        if ctx.adapter == self.surface.adapter() {
            self.texture_interop(ctx)
        } else {
            self.texture_copy(ctx, allow_copy)
        }
    }

    fn texture_interop(self: &Arc<Self>, ctx: &InteropContext) -> Option<BridgeTexture> {
        let mut device = self.lock_device();
        let record = device
            .contexts
            .entry(ctx.id)
            .or_insert_with(|| ContextRecord::new(ctx.after_flush.clone()));
        if record.failed {
            return None;
        }

        if record.interop.is_none() {
            let mut interop = match self.factory.open_gl_interop(ctx) {
                Ok(interop) => interop,
                Err(e) => {
                    log::error!("Opening GL interop for context {} failed: {e}", ctx.id);
                    record.failed = true;
                    return None;
                }
            };
            match interop.register(self.surface.as_ref()) {
                Ok(texture) => {
                    record.gl_texture = Some(texture);
                    record.interop = Some(interop);
                }
                Err(e) => {
                    log::error!("Registering shared texture in context {} failed: {e}", ctx.id);
                    record.failed = true;
                    return None;
                }
            }
        }

        let frame = {
            let mut refs = self.lock_refs();
            if !refs.acquired {
                return None;
            }
            refs.refs += 1;
            refs.frame_num
        };

        let interop = record.interop.as_mut().expect("registered above");
        if let Err(e) = interop.lock() {
            log::error!("DX lock in context {} failed: {e}", ctx.id);
            record.failed = true;
            drop(device);
            self.unref();
            return None;
        }
        let texture = record.gl_texture.expect("registered above");

        // Unlock and unref between this frame's replay segments.
        let this = Arc::clone(self);
        let id = ctx.id;
        let _ = ctx.after_flush.send(Box::new(move |_driver| {
            this.unlock_in_context(id);
            this.unref();
        }));

        Some(BridgeTexture { texture, frame })
    }

    fn texture_copy(self: &Arc<Self>, ctx: &InteropContext, allow_copy: bool) -> Option<BridgeTexture> {
        let mut device = self.lock_device();
        let record = device
            .contexts
            .entry(ctx.id)
            .or_insert_with(|| ContextRecord::new(ctx.after_flush.clone()));
        if record.failed {
            return None;
        }

        let frame = {
            let refs = self.lock_refs();
            refs.frame_num
        };

        if record.copy_frame == frame && frame > 0 {
            if let Some(texture) = record.copy_texture {
                return Some(BridgeTexture { texture, frame });
            }
        }
        if record.copy_in_flight || !allow_copy {
            return None;
        }

        {
            let mut refs = self.lock_refs();
            if !refs.acquired {
                return None;
            }
            // The copy keeps the keyed mutex held until it lands.
            refs.refs += 1;
        }

        if record.cuda.is_none() {
            match self.factory.open_cuda_link(ctx) {
                Ok(link) => record.cuda = Some(link),
                Err(e) => {
                    log::error!("Opening CUDA link for context {} failed: {e}", ctx.id);
                    record.failed = true;
                    drop(device);
                    self.unref();
                    return None;
                }
            }
        }
        let cuda = record.cuda.as_mut().expect("opened above");

        // Owner-side staging is shared by all consumers of this frame.
        {
            let mut pinned = self.lock_pinned();
            if pinned.staging.frame < frame {
                if let Err(e) = cuda.stage_to_host(self.surface.as_ref(), &mut pinned.staging) {
                    log::error!("Device-to-host staging failed: {e}");
                    record.failed = true;
                    drop(pinned);
                    drop(device);
                    self.unref();
                    return None;
                }
                pinned.staging.frame = frame;
            }
        }

        let this = Arc::clone(self);
        let id = ctx.id;
        let sender = ctx.after_flush.clone();
        let done = Box::new(move |result: Result<(), BridgeError>| {
            // Stream callbacks may fire on a CUDA-internal thread; finish on
            // the consumer's GL thread.
            let _ = sender.send(Box::new(move |_driver| {
                this.finish_copy(id, result);
            }));
        });

        let pinned = self.lock_pinned();
        match cuda.upload_from_host(&pinned.staging, done) {
            Ok(texture) => {
                record.copy_texture = Some(texture);
                record.copy_in_flight = true;
                None // the copy lands later; draw with what you had
            }
            Err(e) => {
                log::error!("Host-to-device upload in context {} failed: {e}", ctx.id);
                record.failed = true;
                drop(pinned);
                drop(device);
                self.unref();
                None
            }
        }
    }

    fn finish_copy(self: &Arc<Self>, ctx_id: u64, result: Result<(), BridgeError>) {
        {
            let mut device = self.lock_device();
            if let Some(record) = device.contexts.get_mut(&ctx_id) {
                record.copy_in_flight = false;
                match result {
                    Ok(()) => {
                        record.copy_frame = self.lock_pinned().staging.frame;
                    }
                    Err(e) => {
                        log::error!("Cross-GPU copy into context {ctx_id} failed: {e}");
                        record.failed = true;
                        record.copy_texture = None;
                    }
                }
            }
        }
        self.unref();
    }

    fn unlock_in_context(&self, ctx_id: u64) {
        let mut device = self.lock_device();
        if let Some(record) = device.contexts.get_mut(&ctx_id) {
            if let Some(interop) = record.interop.as_mut() {
                if let Err(e) = interop.unlock() {
                    log::error!("DX unlock in context {ctx_id} failed: {e}");
                    record.failed = true;
                }
            }
        }
    }

    fn unref(&self) {
        let due = {
            let mut refs = self.lock_refs();
            debug_assert!(refs.refs > 0, "unref without a matching ref");
            refs.refs = refs.refs.saturating_sub(1);
            refs.refs == 0 && refs.release_pending
        };
        if due {
            if let Err(e) = self.release() {
                log::error!("Deferred keyed-mutex release failed: {e}");
            }
        }
    }

    fn lock_device(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.device.lock().expect("device lock poisoned")
    }

    fn lock_refs(&self) -> std::sync::MutexGuard<'_, RefState> {
        self.refs.lock().expect("ref lock poisoned")
    }

    fn lock_pinned(&self) -> std::sync::MutexGuard<'_, PinnedCopy> {
        self.pinned.lock().expect("pinned-copy lock poisoned")
    }
}

impl Drop for SharedTexture {
    fn drop(&mut self) {
        // Unregister must happen on each owning GL thread; repost the boxed
        // interop objects to their after-flush executors.
        let mut device = self.lock_device();
        for (id, mut record) in device.contexts.drain() {
            if let Some(mut interop) = record.interop.take() {
                let sent = record.after_flush.send(Box::new(move |_driver| {
                    if let Err(e) = interop.unregister() {
                        log::error!("Unregistering shared texture failed: {e}");
                    }
                }));
                if sent.is_err() {
                    log::warn!("Context {id} is gone; leaking its interop registration.");
                }
            }
        }
    }
}

impl std::fmt::Debug for SharedTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let refs = self.lock_refs();
        f.debug_struct("SharedTexture")
            .field("acquired", &refs.acquired)
            .field("refs", &refs.refs)
            .field("frame_num", &refs.frame_num)
            .finish_non_exhaustive()
    }
}
