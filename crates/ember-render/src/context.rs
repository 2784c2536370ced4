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

//! The per-context render command pipeline.
//!
//! [`RenderContext`] accumulates draws and pipeline operations for one GL
//! context and replays them in a single flush at end of frame. Opaque draws
//! are regrouped by state key to minimize binds; translucent draws replay
//! in exact submission order; pipeline operations act as barriers that no
//! draw crosses in either direction.
//!
//! Each opaque draw is assigned a strictly decreasing depth value in
//! `[0, 1)` at record time, so submission order resolves overdraw through
//! the depth test instead of painter's sorting. The step between draws is
//! derived from the previous frame's draw count.

use crate::command::{MasterQueue, PipelineCmd, RenderCommand, Segment, StateKey};
use crate::handle::HandleCache;
use crate::pool::RingPools;
use crate::state::StateCache;
use ember_core::pipeline::{
    BlendState, BlitFilter, ClearFlags, ClearValue, CullMode, DepthState, FrontFace,
    PrimitiveTopology, StencilState, Viewport,
};
use ember_core::resource::BufferKind;
use ember_core::{
    AfterFlushQueue, AfterFlushSender, DrawParams, FrameClock, GlDriver, Rect, RenderSettings,
    ResourceId, ResourceManager,
};
use std::sync::Arc;

// Depth assigned to the first draw of a frame, and the span the remaining
// draws are spread across. Keeps every assigned value inside [0, 1).
const DEPTH_FRONT: f32 = 0.99999;
const DEPTH_SPAN: f32 = 0.99998;

/// Streamed vertex data for a draw, carved from the frame's vertex ring.
#[derive(Debug, Clone, Copy)]
pub struct VertexData<'a> {
    /// Raw vertex bytes.
    pub bytes: &'a [u8],
    /// Bytes per vertex.
    pub stride: usize,
}

/// Everything needed to record one draw.
#[derive(Debug, Clone, Copy)]
pub struct DrawSpec<'a> {
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Vertex count for non-indexed draws.
    pub vertex_count: u32,
    /// Streamed geometry, if the vertex array binds a ring slab.
    pub vertices: Option<VertexData<'a>>,
    /// Streamed indices.
    pub indices: Option<&'a [u32]>,
    /// The per-draw uniform block.
    pub uniforms: Option<&'a [u8]>,
    /// Binding slot for the uniform block.
    pub uniform_slot: u32,
    /// Line width or point size.
    pub primitive_size: f32,
}

impl Default for DrawSpec<'_> {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::Triangles,
            vertex_count: 0,
            vertices: None,
            indices: None,
            uniforms: None,
            uniform_slot: 0,
            primitive_size: 1.0,
        }
    }
}

/// One GL context's recording and replay state.
pub struct RenderContext {
    resources: Arc<ResourceManager>,
    clock: Arc<FrameClock>,
    settings: RenderSettings,
    pools: RingPools,
    handles: HandleCache,
    state: StateCache,
    queue: MasterQueue,
    after_flush: AfterFlushQueue,
    uniform_align: usize,
    depth_step: f32,
    depth_calls: u32,
    swap_applied: bool,
}

impl RenderContext {
    /// Creates a context. `uniform_align` is the driver's uniform-buffer
    /// offset alignment, queried once at startup.
    pub fn new(
        resources: Arc<ResourceManager>,
        clock: Arc<FrameClock>,
        settings: RenderSettings,
        uniform_align: usize,
    ) -> Self {
        let pools = RingPools::new(Arc::clone(&resources), settings.ring_growth_cap_bytes);
        let handles = HandleCache::new(Arc::clone(&resources), Arc::clone(&clock));
        Self {
            resources,
            clock,
            settings,
            pools,
            handles,
            state: StateCache::new(),
            queue: MasterQueue::new(),
            after_flush: AfterFlushQueue::new(),
            uniform_align: uniform_align.max(1),
            depth_step: -DEPTH_SPAN,
            depth_calls: 0,
            swap_applied: false,
        }
    }

    /// A sender for queuing work onto this context's after-flush slot.
    pub fn after_flush_sender(&self) -> AfterFlushSender {
        self.after_flush.sender()
    }

    /// The shared resource registry.
    pub fn resources(&self) -> &Arc<ResourceManager> {
        &self.resources
    }

    /// The frame clock.
    pub fn clock(&self) -> &Arc<FrameClock> {
        &self.clock
    }

    /// Draws recorded so far this frame.
    pub fn draw_count(&self) -> usize {
        self.queue.draw_count()
    }

    /// Total bytes currently held by the ring pools.
    pub fn ring_bytes(&self) -> usize {
        self.pools.total_bytes()
    }

    /// Records a draw: carves ring space for its transient data and assigns
    /// its depth. Returns `None` when the ring pools are at their growth
    /// cap, in which case the draw is dropped for this frame.
    pub fn create_render_command(&mut self, spec: &DrawSpec<'_>) -> Option<RenderCommand> {
        let mut params = DrawParams {
            topology: spec.topology,
            indexed: spec.indices.is_some(),
            count: spec.vertex_count,
            index_offset_bytes: 0,
            base_vertex: 0,
            primitive_size: spec.primitive_size,
        };

        let vertices = match spec.vertices {
            Some(data) => {
                debug_assert!(data.stride > 0 && data.bytes.len() % data.stride == 0);
                let count = data.bytes.len() / data.stride;
                let alloc = self
                    .pools
                    .alloc(BufferKind::Vertex, data.stride, count, data.stride)?;
                alloc.write(data.bytes);
                params.base_vertex = alloc.offset_units as i32;
                if !params.indexed {
                    params.count = count as u32;
                }
                Some(alloc)
            }
            None => None,
        };

        let indices = match spec.indices {
            Some(data) => {
                let alloc = self.pools.alloc(
                    BufferKind::Index,
                    std::mem::size_of::<u32>(),
                    data.len(),
                    std::mem::size_of::<u32>(),
                )?;
                alloc.write(bytemuck::cast_slice(data));
                params.index_offset_bytes = alloc.offset_bytes;
                params.count = data.len() as u32;
                Some(alloc)
            }
            None => None,
        };

        let uniforms = match spec.uniforms {
            Some(block) => {
                let rounded = block.len().div_ceil(self.uniform_align) * self.uniform_align;
                let alloc = self
                    .pools
                    .alloc(BufferKind::Uniform, 1, rounded, self.uniform_align)?;
                alloc.write(block);
                Some(alloc)
            }
            None => None,
        };

        let depth = (DEPTH_FRONT + self.depth_step * self.depth_calls as f32).max(0.0);
        self.depth_calls += 1;

        Some(RenderCommand {
            vertices,
            indices,
            uniforms,
            uniform_slot: spec.uniform_slot,
            params,
            depth,
        })
    }

    /// Queues a recorded draw under `key`. Translucent draws keep exact
    /// submission order at replay; opaque draws regroup by key.
    pub fn submit(&mut self, key: StateKey, cmd: RenderCommand, translucent: bool) {
        if translucent {
            self.queue.submit_translucent(key, cmd);
        } else {
            self.queue.submit_opaque(key, cmd);
        }
    }

    // --- pipeline operations (each closes the current segment) ----------

    /// Queues a clear of the bound framebuffer.
    pub fn clear(&mut self, flags: ClearFlags, value: ClearValue) {
        self.queue.push_pipeline(PipelineCmd::Clear(flags, value));
    }

    /// Queues a draw-framebuffer switch (`None` = default framebuffer).
    pub fn set_framebuffer(&mut self, framebuffer: Option<ResourceId>) {
        self.queue
            .push_pipeline(PipelineCmd::SetFramebuffer(framebuffer));
    }

    /// Queues a blend-state change.
    pub fn set_blend(&mut self, state: BlendState) {
        self.queue.push_pipeline(PipelineCmd::SetBlend(state));
    }

    /// Queues a depth-state change.
    pub fn set_depth(&mut self, state: DepthState) {
        self.queue.push_pipeline(PipelineCmd::SetDepth(state));
    }

    /// Queues a stencil-state change.
    pub fn set_stencil(&mut self, state: StencilState) {
        self.queue.push_pipeline(PipelineCmd::SetStencil(state));
    }

    /// Queues a cull-mode change.
    pub fn set_cull(&mut self, mode: CullMode) {
        self.queue.push_pipeline(PipelineCmd::SetCull(mode));
    }

    /// Queues a front-face winding change.
    pub fn set_front_face(&mut self, front: FrontFace) {
        self.queue.push_pipeline(PipelineCmd::SetFrontFace(front));
    }

    /// Queues a viewport change.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.queue.push_pipeline(PipelineCmd::SetViewport(viewport));
    }

    /// Queues a scissor change.
    pub fn set_scissor(&mut self, rect: Option<Rect>) {
        self.queue.push_pipeline(PipelineCmd::SetScissor(rect));
    }

    /// Queues a framebuffer blit.
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &mut self,
        src: Option<ResourceId>,
        dst: Option<ResourceId>,
        src_rect: Rect,
        dst_rect: Rect,
        mask: ClearFlags,
        filter: BlitFilter,
    ) {
        self.queue.push_pipeline(PipelineCmd::Blit {
            src,
            dst,
            src_rect,
            dst_rect,
            mask,
            filter,
        });
    }

    /// Queues a draw-buffer selection for the bound framebuffer.
    pub fn set_draw_buffers(&mut self, slots: Vec<u8>) {
        self.queue.push_pipeline(PipelineCmd::SetDrawBuffers(slots));
    }

    /// Queues a clip-distance toggle.
    pub fn set_clip_distance(&mut self, index: u32, enabled: bool) {
        self.queue
            .push_pipeline(PipelineCmd::SetClipDistance(index, enabled));
    }

    // --- flush ----------------------------------------------------------

    /// Replays the frame against `driver`, then runs deferred work, rewinds
    /// the rings, reaps stale handles, and advances the frame clock.
    pub fn flush(&mut self, driver: &mut dyn GlDriver) {
        if !self.swap_applied {
            if !driver.set_swap_interval(self.settings.swap_interval) {
                log::warn!(
                    "Platform ignored swap interval {}",
                    self.settings.swap_interval
                );
            }
            self.swap_applied = true;
        }

        // Sealing bumps slab generations so the handle cache re-uploads
        // everything written this frame.
        self.pools.seal();
        let draws_this_frame = self.queue.draw_count().max(1);
        let segments = self.queue.take();

        self.state.set_default_state(driver);
        for segment in &segments {
            self.replay_segment(driver, segment);
        }
        let _ = driver.check_error("flush");

        self.after_flush.drain(driver);
        self.pools.rewind();
        self.handles.reap(driver);
        self.clock.advance();

        self.depth_step = -DEPTH_SPAN / draws_this_frame as f32;
        self.depth_calls = 0;
    }

    fn replay_segment(&mut self, driver: &mut dyn GlDriver, segment: &Segment) {
        let mut skip_draws = false;
        if let Some(cmd) = &segment.command {
            skip_draws = !self.apply_pipeline(driver, cmd);
        }
        if skip_draws {
            return;
        }

        for (key, group) in &segment.opaque {
            // Within a group, later submissions replay first; their depth
            // values are nearer, so early-z rejects the overdrawn rest.
            if self.bind_key(driver, key) {
                for cmd in group.iter().rev() {
                    self.replay_draw(driver, cmd);
                }
            }
        }
        for (key, cmd) in &segment.translucent {
            if self.bind_key(driver, key) {
                self.replay_draw(driver, cmd);
            }
        }
    }

    // Applies a pipeline operation. `false` means the segment's target is
    // unusable and its draws must be skipped.
    fn apply_pipeline(&mut self, driver: &mut dyn GlDriver, cmd: &PipelineCmd) -> bool {
        match cmd {
            PipelineCmd::Clear(flags, value) => driver.clear(*flags, value),
            PipelineCmd::SetFramebuffer(target) => {
                return match self.resolve_framebuffer(driver, *target) {
                    Ok(raw) => {
                        self.state.bind_framebuffer(driver, raw);
                        true
                    }
                    Err(()) => false,
                };
            }
            PipelineCmd::SetBlend(state) => self.state.set_blend(driver, state),
            PipelineCmd::SetDepth(state) => self.state.set_depth(driver, state),
            PipelineCmd::SetStencil(state) => self.state.set_stencil(driver, state),
            PipelineCmd::SetCull(mode) => self.state.set_cull(driver, *mode),
            PipelineCmd::SetFrontFace(front) => self.state.set_front_face(driver, *front),
            PipelineCmd::SetViewport(viewport) => driver.set_viewport(viewport),
            PipelineCmd::SetScissor(rect) => driver.set_scissor(*rect),
            PipelineCmd::Blit {
                src,
                dst,
                src_rect,
                dst_rect,
                mask,
                filter,
            } => {
                let (Ok(src), Ok(dst)) = (
                    self.resolve_framebuffer(driver, *src),
                    self.resolve_framebuffer(driver, *dst),
                ) else {
                    return true;
                };
                driver.blit(src, dst, *src_rect, *dst_rect, *mask, *filter);
                // The blit binds the draw framebuffer behind our back.
                self.state.invalidate();
            }
            PipelineCmd::SetDrawBuffers(slots) => driver.set_draw_buffers(slots),
            PipelineCmd::SetClipDistance(index, enabled) => {
                driver.set_clip_distance(*index, *enabled)
            }
        }
        true
    }

    fn resolve_framebuffer(
        &mut self,
        driver: &mut dyn GlDriver,
        target: Option<ResourceId>,
    ) -> Result<Option<ember_core::RawFramebuffer>, ()> {
        match target {
            None => Ok(None),
            Some(id) => {
                let Some(desc) = self.resources.framebuffer(id) else {
                    log::error!("Unknown framebuffer {id:?} in pipeline command");
                    return Err(());
                };
                self.handles.framebuffer(driver, &desc)
            }
        }
    }

    // Binds a state key's program, vertex array, and textures. `false`
    // means a required handle failed and the draws under it are skipped.
    fn bind_key(&mut self, driver: &mut dyn GlDriver, key: &StateKey) -> bool {
        let Some(program_desc) = self.resources.program(key.program) else {
            log::warn!("Draw references released program {:?}", key.program);
            return false;
        };
        let Some(program) = self.handles.program(driver, &program_desc) else {
            return false;
        };
        self.state.bind_program(driver, Some(program));

        let Some(vao_desc) = self.resources.vertex_array(key.vertex_array) else {
            log::warn!("Draw references released vertex array {:?}", key.vertex_array);
            return false;
        };
        let Some(vao) = self.handles.vertex_array(driver, &vao_desc) else {
            return false;
        };
        self.state.bind_vertex_array(driver, Some(vao));

        for (unit, id) in key.textures.iter().enumerate() {
            if id.is_invalid() {
                continue;
            }
            let Some(texture_desc) = self.resources.texture(*id) else {
                log::warn!("Draw references released texture {id:?}");
                return false;
            };
            let Some(texture) = self.handles.texture(driver, &texture_desc) else {
                return false;
            };
            self.state.bind_texture(driver, unit as u32, Some(texture));
        }
        true
    }

    fn replay_draw(&mut self, driver: &mut dyn GlDriver, cmd: &RenderCommand) {
        // Ring slabs upload lazily; touching them here flushes this frame's
        // staged writes before the draw reads them.
        if let Some(alloc) = &cmd.vertices {
            if self.handles.buffer(driver, &alloc.buffer).is_none() {
                return;
            }
        }
        if let Some(alloc) = &cmd.indices {
            if self.handles.buffer(driver, &alloc.buffer).is_none() {
                return;
            }
        }
        if let Some(alloc) = &cmd.uniforms {
            let Some(handle) = self.handles.buffer(driver, &alloc.buffer) else {
                return;
            };
            driver.bind_uniform_range(cmd.uniform_slot, handle.raw(), alloc.offset_bytes, alloc.len);
        }
        if let Err(e) = driver.draw(&cmd.params) {
            log::error!("Draw failed: {e}");
            // The context may be in an unknown state; rebind from scratch.
            self.state.invalidate();
        }
    }
}
