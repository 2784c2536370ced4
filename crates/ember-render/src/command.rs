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

//! Render commands and the master queue they accumulate into.
//!
//! A frame is a sequence of segments. Each segment carries at most one
//! pipeline operation followed by the draws submitted after it; a new
//! pipeline operation closes the current segment. Inside a segment, opaque
//! draws are grouped by their state key so replay binds each program and
//! texture set once, while translucent draws keep exact submission order.

use crate::pool::RingAlloc;
use ember_core::pipeline::{
    BlendState, BlitFilter, ClearFlags, ClearValue, CullMode, DepthState, FrontFace, StencilState,
    Viewport,
};
use ember_core::{DrawParams, Rect, ResourceId};

/// Per-draw texture bindings, in texture-unit order.
pub const MAX_TEXTURE_UNITS: usize = 8;

/// The GPU state a draw needs bound. Draws sharing a key can be replayed
/// back to back without rebinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateKey {
    /// The program descriptor.
    pub program: ResourceId,
    /// The vertex array descriptor.
    pub vertex_array: ResourceId,
    /// Textures bound per unit (`ResourceId::INVALID` = unbound).
    pub textures: [ResourceId; MAX_TEXTURE_UNITS],
}

/// One recorded draw: transient ring data plus draw parameters.
#[derive(Debug)]
pub struct RenderCommand {
    /// Vertex data carved from this frame's vertex ring, if the draw
    /// streams geometry rather than binding a vertex array.
    pub vertices: Option<RingAlloc>,
    /// Index data carved from the index ring.
    pub indices: Option<RingAlloc>,
    /// Per-draw uniform block carved from the uniform ring, bound by range
    /// at replay.
    pub uniforms: Option<RingAlloc>,
    /// The uniform binding slot for `uniforms`.
    pub uniform_slot: u32,
    /// Draw parameters handed to the driver.
    pub params: DrawParams,
    /// The polygon-offset-free depth bias baked into this draw's uniforms;
    /// kept on the command so tests can observe the assigned value.
    pub depth: f32,
}

/// A pipeline operation recorded between draw runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCmd {
    /// Clear the bound framebuffer.
    Clear(ClearFlags, ClearValue),
    /// Switch the draw framebuffer (`None` = default).
    SetFramebuffer(Option<ResourceId>),
    /// Change the blend state.
    SetBlend(BlendState),
    /// Change the depth state.
    SetDepth(DepthState),
    /// Change the stencil state.
    SetStencil(StencilState),
    /// Change the cull mode.
    SetCull(CullMode),
    /// Change the front-face winding.
    SetFrontFace(FrontFace),
    /// Change the viewport.
    SetViewport(Viewport),
    /// Set or clear the scissor rectangle.
    SetScissor(Option<Rect>),
    /// Blit between framebuffers.
    Blit {
        /// Source framebuffer (`None` = default).
        src: Option<ResourceId>,
        /// Destination framebuffer (`None` = default).
        dst: Option<ResourceId>,
        /// Source rectangle.
        src_rect: Rect,
        /// Destination rectangle.
        dst_rect: Rect,
        /// Planes to copy.
        mask: ClearFlags,
        /// Filter for scaled color blits.
        filter: BlitFilter,
    },
    /// Select the color attachment slots fragment outputs write to.
    SetDrawBuffers(Vec<u8>),
    /// Toggle a clip distance plane.
    SetClipDistance(u32, bool),
}

/// One segment of the frame: an optional pipeline operation and the draws
/// submitted after it, up to the next pipeline operation.
#[derive(Debug, Default)]
pub struct Segment {
    /// The operation that opened this segment (`None` for the first).
    pub command: Option<PipelineCmd>,
    /// Opaque draws grouped by state key, in first-submission key order.
    pub opaque: Vec<(StateKey, Vec<RenderCommand>)>,
    /// Translucent draws in exact submission order.
    pub translucent: Vec<(StateKey, RenderCommand)>,
}

impl Segment {
    fn is_empty(&self) -> bool {
        self.command.is_none() && self.opaque.is_empty() && self.translucent.is_empty()
    }

    fn push_opaque(&mut self, key: StateKey, cmd: RenderCommand) {
        // Few distinct keys per segment in practice; linear search keeps
        // group order deterministic.
        match self.opaque.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push(cmd),
            None => self.opaque.push((key, vec![cmd])),
        }
    }
}

/// The frame's accumulated segments, consumed by flush.
#[derive(Debug, Default)]
pub struct MasterQueue {
    segments: Vec<Segment>,
    draw_count: usize,
}

impl MasterQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of draws recorded this frame.
    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Whether anything has been recorded.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(Segment::is_empty)
    }

    /// Records an opaque draw into the current segment.
    pub fn submit_opaque(&mut self, key: StateKey, cmd: RenderCommand) {
        self.draw_count += 1;
        self.current().push_opaque(key, cmd);
    }

    /// Records a translucent draw; submission order is preserved exactly.
    pub fn submit_translucent(&mut self, key: StateKey, cmd: RenderCommand) {
        self.draw_count += 1;
        self.current().translucent.push((key, cmd));
    }

    /// Records a pipeline operation, closing the current segment.
    pub fn push_pipeline(&mut self, cmd: PipelineCmd) {
        self.segments.push(Segment {
            command: Some(cmd),
            ..Segment::default()
        });
    }

    /// Drains the frame for replay, leaving the queue empty.
    pub fn take(&mut self) -> Vec<Segment> {
        self.draw_count = 0;
        std::mem::take(&mut self.segments)
    }

    fn current(&mut self) -> &mut Segment {
        if self.segments.is_empty() {
            self.segments.push(Segment::default());
        }
        self.segments.last_mut().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::pipeline::PrimitiveTopology;
    use ember_core::ResourceManager;

    // Mints distinct, repeatable ids through the manager so state keys
    // compare the way real submissions do.
    fn keys(count: usize) -> Vec<StateKey> {
        let manager = ResourceManager::new();
        let vertex_array = manager
            .create_vertex_array(Vec::new(), None, 0.0)
            .id();
        (0..count)
            .map(|_| StateKey {
                program: manager.create_program(Vec::new(), 0.0).id(),
                vertex_array,
                textures: [ResourceId::INVALID; MAX_TEXTURE_UNITS],
            })
            .collect()
    }

    fn draw() -> RenderCommand {
        RenderCommand {
            vertices: None,
            indices: None,
            uniforms: None,
            uniform_slot: 0,
            params: DrawParams {
                topology: PrimitiveTopology::Triangles,
                indexed: false,
                count: 3,
                index_offset_bytes: 0,
                base_vertex: 0,
                primitive_size: 1.0,
            },
            depth: 0.0,
        }
    }

    #[test]
    fn opaque_draws_group_by_state_key() {
        let k = keys(2);
        let mut queue = MasterQueue::new();
        queue.submit_opaque(k[0].clone(), draw());
        queue.submit_opaque(k[1].clone(), draw());
        queue.submit_opaque(k[0].clone(), draw());

        let segments = queue.take();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].opaque.len(), 2);
        assert_eq!(segments[0].opaque[0].1.len(), 2);
        assert_eq!(segments[0].opaque[1].1.len(), 1);
    }

    #[test]
    fn pipeline_command_closes_segment() {
        let k = keys(1);
        let mut queue = MasterQueue::new();
        queue.submit_opaque(k[0].clone(), draw());
        queue.push_pipeline(PipelineCmd::SetBlend(BlendState::ADD));
        queue.submit_opaque(k[0].clone(), draw());

        let segments = queue.take();
        assert_eq!(segments.len(), 2);
        assert!(segments[0].command.is_none());
        assert!(matches!(
            segments[1].command,
            Some(PipelineCmd::SetBlend(_))
        ));
        assert_eq!(segments[1].opaque[0].1.len(), 1);
    }

    #[test]
    fn translucent_keeps_submission_order() {
        let k = keys(2);
        let mut queue = MasterQueue::new();
        queue.submit_translucent(k[1].clone(), draw());
        queue.submit_translucent(k[0].clone(), draw());
        queue.submit_translucent(k[1].clone(), draw());

        let segments = queue.take();
        let order: Vec<u64> = segments[0]
            .translucent
            .iter()
            .map(|(key, _)| key.program.raw())
            .collect();
        assert_eq!(
            order,
            vec![k[1].program.raw(), k[0].program.raw(), k[1].program.raw()]
        );
    }

    #[test]
    fn take_resets_the_queue() {
        let k = keys(1);
        let mut queue = MasterQueue::new();
        queue.submit_opaque(k[0].clone(), draw());
        assert_eq!(queue.draw_count(), 1);
        let _ = queue.take();
        assert_eq!(queue.draw_count(), 0);
        assert!(queue.is_empty());
    }
}
