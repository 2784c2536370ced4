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

//! Bridge protocol tests against in-memory backends: keyed-mutex acquire
//! semantics, deferred release, the same-GPU interop path, the cross-GPU
//! copy path, failure latching, and bag selection/retirement.

use ember_core::driver::{DrawParams, RawAttachment};
use ember_core::math::Rect;
use ember_core::pipeline::{
    BlendState, BlitFilter, ClearFlags, ClearValue, CullMode, DepthState, FrontFace, StencilState,
    Viewport,
};
use ember_core::resource::{
    AttachmentPoint, BufferKind, DirtyRegion, ProgramDesc, SamplerState, TextureDesc, UsageHint,
    VertexLayout,
};
use ember_core::{
    AfterFlushQueue, DriverError, Extent2D, GlDriver, PixelFormat, RawBuffer, RawFramebuffer,
    RawProgram, RawRenderbuffer, RawTexture, RawVertexArray,
};
use ember_interop::{
    AdapterId, BridgeError, CopyDone, CudaLink, GlInterop, InteropContext, InteropFactory,
    PinnedStaging, SharedSurface, SharedTexture, TextureBag,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

// --------------------------------------------------------------------------
// Stub driver (the bridge's after-flush tasks ignore it)
// --------------------------------------------------------------------------

struct NullDriver;

impl GlDriver for NullDriver {
    fn uniform_offset_alignment(&self) -> usize {
        256
    }
    fn available_vram_kib(&mut self) -> u64 {
        0
    }
    fn set_swap_interval(&mut self, _interval: i32) -> bool {
        true
    }
    fn create_buffer(
        &mut self,
        _kind: BufferKind,
        _size: usize,
        _usage: UsageHint,
    ) -> Result<RawBuffer, DriverError> {
        Ok(RawBuffer(1))
    }
    fn upload_buffer(
        &mut self,
        _buffer: RawBuffer,
        _kind: BufferKind,
        _offset: usize,
        _data: &[u8],
    ) -> Result<(), DriverError> {
        Ok(())
    }
    fn delete_buffer(&mut self, _buffer: RawBuffer) {}
    fn create_texture(&mut self, _desc: &TextureDesc) -> Result<RawTexture, DriverError> {
        Ok(RawTexture(1))
    }
    fn upload_texture(
        &mut self,
        _texture: RawTexture,
        _desc: &TextureDesc,
        _region: DirtyRegion,
        _data: &[u8],
    ) -> Result<(), DriverError> {
        Ok(())
    }
    fn delete_texture(&mut self, _texture: RawTexture) {}
    fn create_program(&mut self, _desc: &ProgramDesc) -> Result<RawProgram, DriverError> {
        Ok(RawProgram(1))
    }
    fn delete_program(&mut self, _program: RawProgram) {}
    fn create_vertex_array(
        &mut self,
        _bindings: &[(RawBuffer, &VertexLayout)],
        _index_buffer: Option<RawBuffer>,
    ) -> Result<RawVertexArray, DriverError> {
        Ok(RawVertexArray(1))
    }
    fn delete_vertex_array(&mut self, _vertex_array: RawVertexArray) {}
    fn create_renderbuffer(
        &mut self,
        _size: Extent2D,
        _format: PixelFormat,
        _sample_count: u32,
    ) -> Result<RawRenderbuffer, DriverError> {
        Ok(RawRenderbuffer(1))
    }
    fn delete_renderbuffer(&mut self, _renderbuffer: RawRenderbuffer) {}
    fn create_framebuffer(
        &mut self,
        _attachments: &[(AttachmentPoint, RawAttachment)],
    ) -> Result<RawFramebuffer, DriverError> {
        Ok(RawFramebuffer(1))
    }
    fn delete_framebuffer(&mut self, _framebuffer: RawFramebuffer) {}
    fn bind_program(&mut self, _program: Option<RawProgram>) {}
    fn bind_vertex_array(&mut self, _vertex_array: Option<RawVertexArray>) {}
    fn bind_framebuffer(&mut self, _framebuffer: Option<RawFramebuffer>) {}
    fn bind_texture(&mut self, _unit: u32, _texture: Option<RawTexture>) {}
    fn apply_sampler(&mut self, _unit: u32, _sampler: &SamplerState) {}
    fn bind_uniform_range(&mut self, _slot: u32, _buffer: RawBuffer, _offset: usize, _size: usize) {
    }
    fn set_blend(&mut self, _state: &BlendState) {}
    fn set_depth(&mut self, _state: &DepthState) {}
    fn set_stencil(&mut self, _state: &StencilState) {}
    fn set_cull(&mut self, _mode: CullMode) {}
    fn set_front_face(&mut self, _front: FrontFace) {}
    fn set_viewport(&mut self, _viewport: &Viewport) {}
    fn set_scissor(&mut self, _rect: Option<Rect>) {}
    fn set_draw_buffers(&mut self, _slots: &[u8]) {}
    fn set_clip_distance(&mut self, _index: u32, _enabled: bool) {}
    fn clear(&mut self, _flags: ClearFlags, _value: &ClearValue) {}
    fn blit(
        &mut self,
        _src: Option<RawFramebuffer>,
        _dst: Option<RawFramebuffer>,
        _src_rect: Rect,
        _dst_rect: Rect,
        _mask: ClearFlags,
        _filter: BlitFilter,
    ) {
    }
    fn draw(&mut self, _params: &DrawParams) -> Result<(), DriverError> {
        Ok(())
    }
    fn check_error(&mut self, _context: &str) -> Result<(), DriverError> {
        Ok(())
    }
}

// --------------------------------------------------------------------------
// In-memory backends
// --------------------------------------------------------------------------

const OWNER_GPU: AdapterId = 0xA;
const OTHER_GPU: AdapterId = 0xB;

#[derive(Default)]
struct FakeSurface {
    adapter: AdapterId,
    extent: Extent2D,
    acquires: AtomicU32,
    releases: AtomicU32,
}

impl FakeSurface {
    fn on(adapter: AdapterId, extent: Extent2D) -> Arc<Self> {
        Arc::new(Self {
            adapter,
            extent,
            ..Self::default()
        })
    }
}

impl SharedSurface for FakeSurface {
    fn adapter(&self) -> AdapterId {
        self.adapter
    }
    fn extent(&self) -> Extent2D {
        self.extent
    }
    fn acquire(&self) -> Result<(), BridgeError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn release(&self) -> Result<(), BridgeError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeInterop {
    locks: Arc<AtomicU32>,
    unlocks: Arc<AtomicU32>,
}

impl GlInterop for FakeInterop {
    fn register(&mut self, _surface: &dyn SharedSurface) -> Result<RawTexture, BridgeError> {
        Ok(RawTexture(7))
    }
    fn lock(&mut self) -> Result<(), BridgeError> {
        self.locks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn unlock(&mut self) -> Result<(), BridgeError> {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn unregister(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
}

struct FakeCuda {
    pending: Arc<Mutex<Vec<CopyDone>>>,
}

impl CudaLink for FakeCuda {
    fn stage_to_host(
        &mut self,
        surface: &dyn SharedSurface,
        staging: &mut PinnedStaging,
    ) -> Result<(), BridgeError> {
        let extent = surface.extent();
        staging.extent = extent;
        staging.bytes = vec![0xCD; (extent.width * extent.height * 4) as usize];
        Ok(())
    }
    fn upload_from_host(
        &mut self,
        _staging: &PinnedStaging,
        done: CopyDone,
    ) -> Result<RawTexture, BridgeError> {
        self.pending.lock().unwrap().push(done);
        Ok(RawTexture(9))
    }
}

#[derive(Default)]
struct FakeFactory {
    fail_interop: bool,
    interop_opens: AtomicU32,
    locks: Arc<AtomicU32>,
    unlocks: Arc<AtomicU32>,
    cuda_pending: Arc<Mutex<Vec<CopyDone>>>,
}

impl InteropFactory for FakeFactory {
    fn open_gl_interop(&self, _ctx: &InteropContext) -> Result<Box<dyn GlInterop>, BridgeError> {
        self.interop_opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_interop {
            return Err(BridgeError::Interop("no WGL_NV_DX_interop".into()));
        }
        Ok(Box::new(FakeInterop {
            locks: Arc::clone(&self.locks),
            unlocks: Arc::clone(&self.unlocks),
        }))
    }
    fn open_cuda_link(&self, _ctx: &InteropContext) -> Result<Box<dyn CudaLink>, BridgeError> {
        Ok(Box::new(FakeCuda {
            pending: Arc::clone(&self.cuda_pending),
        }))
    }
}

fn context_on(adapter: AdapterId, queue: &AfterFlushQueue) -> InteropContext {
    InteropContext {
        id: adapter, // one context per adapter in these tests
        adapter,
        after_flush: queue.sender(),
    }
}

// --------------------------------------------------------------------------
// Tests
// --------------------------------------------------------------------------

#[test]
fn at_most_one_acquire_outstanding() {
    let factory = Arc::new(FakeFactory::default());
    let surface = FakeSurface::on(OWNER_GPU, Extent2D::new(64, 64));
    let shared = SharedTexture::new(surface.clone(), factory);

    assert_eq!(shared.acquire().unwrap(), 1);
    assert!(matches!(shared.acquire(), Err(BridgeError::AlreadyAcquired)));
    assert_eq!(surface.acquires.load(Ordering::SeqCst), 1);

    shared.release().unwrap();
    assert_eq!(shared.acquire().unwrap(), 2);
}

#[test]
fn same_gpu_round_trip() {
    let factory = Arc::new(FakeFactory::default());
    let surface = FakeSurface::on(OWNER_GPU, Extent2D::new(64, 64));
    let shared = SharedTexture::new(surface.clone(), Arc::clone(&factory) as Arc<dyn InteropFactory>);
    let queue = AfterFlushQueue::new();
    let ctx = context_on(OWNER_GPU, &queue);

    // Not acquired yet: nothing to sample.
    assert!(shared.texture(&ctx, false).is_none());

    shared.acquire().unwrap();
    let first = shared.texture(&ctx, false).expect("interop path usable");
    assert_eq!(first.frame, 1);
    assert_eq!(first.texture, RawTexture(7));
    assert_eq!(shared.ref_count(), 1);
    assert_eq!(factory.locks.load(Ordering::SeqCst), 1);

    // Release while a renderer still references: deferred.
    shared.release().unwrap();
    assert_eq!(surface.releases.load(Ordering::SeqCst), 0);
    assert!(shared.is_acquired());

    // Draining after-flush unlocks and drops the last ref; exactly one
    // keyed-mutex release goes out.
    queue.drain(&mut NullDriver);
    assert_eq!(factory.unlocks.load(Ordering::SeqCst), 1);
    assert_eq!(shared.ref_count(), 0);
    assert_eq!(surface.releases.load(Ordering::SeqCst), 1);
    assert!(!shared.is_acquired());

    // Releasing again is idempotent.
    shared.release().unwrap();
    assert_eq!(surface.releases.load(Ordering::SeqCst), 1);

    // Next acquire serves the next frame number.
    shared.acquire().unwrap();
    let second = shared.texture(&ctx, false).expect("interop path usable");
    assert_eq!(second.frame, 2);
    queue.drain(&mut NullDriver);
    shared.release().unwrap();
}

#[test]
fn interop_failure_latches_per_context() {
    let factory = Arc::new(FakeFactory {
        fail_interop: true,
        ..FakeFactory::default()
    });
    let surface = FakeSurface::on(OWNER_GPU, Extent2D::new(32, 32));
    let shared = SharedTexture::new(surface, Arc::clone(&factory) as Arc<dyn InteropFactory>);
    let queue = AfterFlushQueue::new();
    let ctx = context_on(OWNER_GPU, &queue);

    shared.acquire().unwrap();
    assert!(shared.texture(&ctx, false).is_none());
    assert!(shared.texture(&ctx, false).is_none());
    // The failed flag short-circuits; the factory is consulted once.
    assert_eq!(factory.interop_opens.load(Ordering::SeqCst), 1);
}

#[test]
fn cross_gpu_copy_lands_after_callback() {
    let factory = Arc::new(FakeFactory::default());
    let surface = FakeSurface::on(OWNER_GPU, Extent2D::new(16, 16));
    let shared = SharedTexture::new(surface.clone(), Arc::clone(&factory) as Arc<dyn InteropFactory>);
    let queue = AfterFlushQueue::new();
    let ctx = context_on(OTHER_GPU, &queue);

    shared.acquire().unwrap();

    // First request: no copy yet, one is started.
    assert!(shared.texture(&ctx, true).is_none());
    assert_eq!(shared.ref_count(), 1);
    assert_eq!(factory.cuda_pending.lock().unwrap().len(), 1);

    // While in flight, further requests return nothing and start nothing.
    assert!(shared.texture(&ctx, true).is_none());
    assert_eq!(factory.cuda_pending.lock().unwrap().len(), 1);

    // The stream callback fires, reposting completion onto the context's
    // after-flush executor.
    let done = factory.cuda_pending.lock().unwrap().pop().unwrap();
    done(Ok(()));
    assert_eq!(queue.pending(), 1);
    queue.drain(&mut NullDriver);

    // The copy holds the current frame; the keyed mutex ref was dropped.
    let bridged = shared.texture(&ctx, true).expect("copy landed");
    assert_eq!(bridged.frame, 1);
    assert_eq!(bridged.texture, RawTexture(9));
    assert_eq!(shared.ref_count(), 0);

    // A release now goes straight out (no renderers on the owner path).
    shared.release().unwrap();
    assert_eq!(surface.releases.load(Ordering::SeqCst), 1);

    // Next producer frame invalidates the copy until recopied.
    shared.acquire().unwrap();
    assert!(shared.texture(&ctx, false).is_none());
}

#[test]
fn copy_denied_without_allow_copy() {
    let factory = Arc::new(FakeFactory::default());
    let surface = FakeSurface::on(OWNER_GPU, Extent2D::new(16, 16));
    let shared = SharedTexture::new(surface, Arc::clone(&factory) as Arc<dyn InteropFactory>);
    let queue = AfterFlushQueue::new();
    let ctx = context_on(OTHER_GPU, &queue);

    shared.acquire().unwrap();
    assert!(shared.texture(&ctx, false).is_none());
    assert!(factory.cuda_pending.lock().unwrap().is_empty());
    assert_eq!(shared.ref_count(), 0);
}

#[test]
fn bag_serves_newest_and_retires_stale() {
    let factory = Arc::new(FakeFactory::default());
    let queue = AfterFlushQueue::new();
    let ctx = context_on(OWNER_GPU, &queue);

    let old_surface = FakeSurface::on(OWNER_GPU, Extent2D::new(32, 32));
    let old = SharedTexture::new(old_surface, Arc::clone(&factory) as Arc<dyn InteropFactory>);
    let new_surface = FakeSurface::on(OWNER_GPU, Extent2D::new(64, 64));
    let new = SharedTexture::new(new_surface, Arc::clone(&factory) as Arc<dyn InteropFactory>);

    let bag = TextureBag::new();
    bag.add(Arc::clone(&old), 0.0);
    bag.add(Arc::clone(&new), 1.0);

    // Only the old generation has pixels this frame; selection falls back.
    old.acquire().unwrap();
    let picked = bag.select(&ctx, false, 1.5).expect("old generation usable");
    assert_eq!(picked.frame, 1);
    queue.drain(&mut NullDriver);

    // The newest wins as soon as it is usable.
    new.acquire().unwrap();
    let picked = bag.select(&ctx, false, 2.0).expect("new generation usable");
    assert_eq!(picked.texture, RawTexture(7));
    queue.drain(&mut NullDriver);

    // The old generation's size differs from the newest: retired.
    assert_eq!(bag.retire(2.5), 1);
    assert_eq!(bag.len(), 1);

    // The surviving newest entry is never retired by age alone.
    assert_eq!(bag.retire(100.0), 0);
    assert_eq!(bag.len(), 1);
}
