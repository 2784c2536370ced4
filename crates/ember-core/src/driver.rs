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

//! The graphics driver contract.
//!
//! The render command pipeline replays its master queue against this trait;
//! `ember-infra` provides the OpenGL implementation and the render crate
//! ships a headless one for tests and CI. A driver instance belongs to the
//! thread that owns its GL context and is deliberately not `Send`; work from
//! other threads reaches it through the after-flush executor.

use crate::error::DriverError;
use crate::math::{Extent2D, Rect};
use crate::pipeline::{
    BlendState, BlitFilter, ClearFlags, ClearValue, CullMode, DepthState, FrontFace,
    PrimitiveTopology, StencilState, Viewport,
};
use crate::resource::{
    AttachmentPoint, BufferKind, DirtyRegion, PixelFormat, ProgramDesc, SamplerState, TextureDesc,
    UsageHint, VertexLayout,
};

/// A GPU buffer object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBuffer(pub u32);

/// A GPU texture object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawTexture(pub u32);

/// A linked GPU program name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawProgram(pub u32);

/// A GPU vertex array object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawVertexArray(pub u32);

/// A GPU framebuffer object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFramebuffer(pub u32);

/// A GPU renderbuffer object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawRenderbuffer(pub u32);

/// What a framebuffer attachment resolves to GPU-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawAttachment {
    /// A texture object.
    Texture(RawTexture),
    /// A renderbuffer object.
    Renderbuffer(RawRenderbuffer),
}

/// Parameters of one draw call, as replayed from a render command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Whether the draw reads the bound index buffer.
    pub indexed: bool,
    /// Index count (indexed) or vertex count (non-indexed).
    pub count: u32,
    /// Byte offset into the index buffer (indexed draws).
    pub index_offset_bytes: usize,
    /// Added to each index, or the first vertex for non-indexed draws.
    pub base_vertex: i32,
    /// Line width or point size, depending on topology.
    pub primitive_size: f32,
}

/// The driver surface consumed by the render command pipeline.
pub trait GlDriver {
    // --- capabilities ---------------------------------------------------

    /// The platform's uniform-buffer offset alignment.
    fn uniform_offset_alignment(&self) -> usize;

    /// Available VRAM in KiB, probed through vendor extensions. Returns 0
    /// when neither the NVIDIA nor the AMD extension is supported; that is
    /// not an error.
    fn available_vram_kib(&mut self) -> u64;

    /// Sets the swap interval. Best-effort; returns whether the platform
    /// honored it.
    fn set_swap_interval(&mut self, interval: i32) -> bool;

    // --- resource management -------------------------------------------

    /// Creates a buffer object of `size` bytes.
    fn create_buffer(
        &mut self,
        kind: BufferKind,
        size: usize,
        usage: UsageHint,
    ) -> Result<RawBuffer, DriverError>;

    /// Uploads `data` at `offset` into a buffer.
    fn upload_buffer(
        &mut self,
        buffer: RawBuffer,
        kind: BufferKind,
        offset: usize,
        data: &[u8],
    ) -> Result<(), DriverError>;

    /// Deletes a buffer object.
    fn delete_buffer(&mut self, buffer: RawBuffer);

    /// Allocates texture storage and applies the descriptor's sampler state.
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<RawTexture, DriverError>;

    /// Uploads pixel data for `region` of the texture. `data` is the full
    /// pixel source; the driver addresses the region within it using the
    /// descriptor's pitch.
    fn upload_texture(
        &mut self,
        texture: RawTexture,
        desc: &TextureDesc,
        region: DirtyRegion,
        data: &[u8],
    ) -> Result<(), DriverError>;

    /// Deletes a texture object.
    fn delete_texture(&mut self, texture: RawTexture);

    /// Compiles and links a program.
    fn create_program(&mut self, desc: &ProgramDesc) -> Result<RawProgram, DriverError>;

    /// Deletes a program object.
    fn delete_program(&mut self, program: RawProgram);

    /// Builds a vertex array object over already-created buffers.
    fn create_vertex_array(
        &mut self,
        bindings: &[(RawBuffer, &VertexLayout)],
        index_buffer: Option<RawBuffer>,
    ) -> Result<RawVertexArray, DriverError>;

    /// Deletes a vertex array object.
    fn delete_vertex_array(&mut self, vertex_array: RawVertexArray);

    /// Creates a renderbuffer.
    fn create_renderbuffer(
        &mut self,
        size: Extent2D,
        format: PixelFormat,
        sample_count: u32,
    ) -> Result<RawRenderbuffer, DriverError>;

    /// Deletes a renderbuffer.
    fn delete_renderbuffer(&mut self, renderbuffer: RawRenderbuffer);

    /// Creates a framebuffer with the given attachments and validates its
    /// completeness.
    fn create_framebuffer(
        &mut self,
        attachments: &[(AttachmentPoint, RawAttachment)],
    ) -> Result<RawFramebuffer, DriverError>;

    /// Deletes a framebuffer object.
    fn delete_framebuffer(&mut self, framebuffer: RawFramebuffer);

    // --- binding --------------------------------------------------------

    /// Binds a program (`None` unbinds).
    fn bind_program(&mut self, program: Option<RawProgram>);

    /// Binds a vertex array (`None` unbinds).
    fn bind_vertex_array(&mut self, vertex_array: Option<RawVertexArray>);

    /// Binds a draw framebuffer (`None` = the window's default framebuffer).
    fn bind_framebuffer(&mut self, framebuffer: Option<RawFramebuffer>);

    /// Binds a texture to a texture unit.
    fn bind_texture(&mut self, unit: u32, texture: Option<RawTexture>);

    /// Applies sampler state to a texture unit.
    fn apply_sampler(&mut self, unit: u32, sampler: &SamplerState);

    /// Binds a byte range of a uniform buffer to an indexed binding slot.
    fn bind_uniform_range(&mut self, slot: u32, buffer: RawBuffer, offset: usize, size: usize);

    // --- fixed-function state -------------------------------------------

    /// Sets the blend state.
    fn set_blend(&mut self, state: &BlendState);

    /// Sets the depth state.
    fn set_depth(&mut self, state: &DepthState);

    /// Sets the stencil state.
    fn set_stencil(&mut self, state: &StencilState);

    /// Sets the cull mode.
    fn set_cull(&mut self, mode: CullMode);

    /// Sets the front-face winding.
    fn set_front_face(&mut self, front: FrontFace);

    /// Sets the viewport.
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Sets or disables the scissor rectangle.
    fn set_scissor(&mut self, rect: Option<Rect>);

    /// Selects which color attachment slots fragment outputs write to.
    /// An empty slice restores the default (the first color buffer).
    fn set_draw_buffers(&mut self, slots: &[u8]);

    /// Enables or disables a clip distance plane.
    fn set_clip_distance(&mut self, index: u32, enabled: bool);

    // --- operations -----------------------------------------------------

    /// Clears the bound framebuffer's selected planes.
    fn clear(&mut self, flags: ClearFlags, value: &ClearValue);

    /// Blits between framebuffers (`None` = default framebuffer).
    #[allow(clippy::too_many_arguments)]
    fn blit(
        &mut self,
        src: Option<RawFramebuffer>,
        dst: Option<RawFramebuffer>,
        src_rect: Rect,
        dst_rect: Rect,
        mask: ClearFlags,
        filter: BlitFilter,
    );

    /// Issues a draw call against the currently bound state.
    fn draw(&mut self, params: &DrawParams) -> Result<(), DriverError>;

    /// Drains the API error queue; logs and returns the first error seen,
    /// tagged with `context`.
    fn check_error(&mut self, context: &str) -> Result<(), DriverError>;
}
