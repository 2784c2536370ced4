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

//! A driver that records instead of rendering.
//!
//! Every call lands in an ordered [`CallRecord`] log, so tests can assert
//! exactly what a flush replayed and in what order. Resource names are
//! handed out from a counter; no GPU is involved.

use ember_core::error::DriverError;
use ember_core::pipeline::{
    BlendState, BlitFilter, ClearFlags, ClearValue, CullMode, DepthState, FrontFace, StencilState,
    Viewport,
};
use ember_core::resource::{
    AttachmentPoint, BufferKind, DirtyRegion, PixelFormat, ProgramDesc, SamplerState, TextureDesc,
    UsageHint, VertexLayout,
};
use ember_core::{
    DrawParams, Extent2D, GlDriver, RawAttachment, RawBuffer, RawFramebuffer, RawProgram,
    RawRenderbuffer, RawTexture, RawVertexArray, Rect,
};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallRecord {
    /// `create_buffer` returning the given name.
    CreateBuffer(RawBuffer, BufferKind, usize),
    /// `upload_buffer` with offset and length.
    UploadBuffer(RawBuffer, usize, usize),
    /// `delete_buffer`.
    DeleteBuffer(RawBuffer),
    /// `create_texture` returning the given name.
    CreateTexture(RawTexture),
    /// `upload_texture` with the region uploaded.
    UploadTexture(RawTexture, DirtyRegion),
    /// `delete_texture`.
    DeleteTexture(RawTexture),
    /// `create_program` returning the given name.
    CreateProgram(RawProgram),
    /// `delete_program`.
    DeleteProgram(RawProgram),
    /// `create_vertex_array` returning the given name.
    CreateVertexArray(RawVertexArray),
    /// `delete_vertex_array`.
    DeleteVertexArray(RawVertexArray),
    /// `create_renderbuffer` returning the given name.
    CreateRenderbuffer(RawRenderbuffer),
    /// `delete_renderbuffer`.
    DeleteRenderbuffer(RawRenderbuffer),
    /// `create_framebuffer` returning the given name.
    CreateFramebuffer(RawFramebuffer),
    /// `delete_framebuffer`.
    DeleteFramebuffer(RawFramebuffer),
    /// `bind_program`.
    BindProgram(Option<RawProgram>),
    /// `bind_vertex_array`.
    BindVertexArray(Option<RawVertexArray>),
    /// `bind_framebuffer`.
    BindFramebuffer(Option<RawFramebuffer>),
    /// `bind_texture`.
    BindTexture(u32, Option<RawTexture>),
    /// `apply_sampler`.
    ApplySampler(u32),
    /// `bind_uniform_range` with slot, buffer, offset, size.
    BindUniformRange(u32, RawBuffer, usize, usize),
    /// `set_blend`.
    SetBlend(BlendState),
    /// `set_depth`.
    SetDepth(DepthState),
    /// `set_stencil`.
    SetStencil(StencilState),
    /// `set_cull`.
    SetCull(CullMode),
    /// `set_front_face`.
    SetFrontFace(FrontFace),
    /// `set_viewport`.
    SetViewport(Viewport),
    /// `set_scissor`.
    SetScissor(Option<Rect>),
    /// `set_draw_buffers`.
    SetDrawBuffers(Vec<u8>),
    /// `set_clip_distance`.
    SetClipDistance(u32, bool),
    /// `clear`.
    Clear(ClearFlags, ClearValue),
    /// `blit`.
    Blit(Option<RawFramebuffer>, Option<RawFramebuffer>),
    /// `draw`.
    Draw(DrawParams),
    /// `set_swap_interval`.
    SetSwapInterval(i32),
}

/// The recording driver.
pub struct HeadlessDriver {
    calls: Vec<CallRecord>,
    next_name: u32,
}

impl HeadlessDriver {
    /// A driver with an empty log.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_name: 1,
        }
    }

    /// The recorded calls so far, in order.
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Clears the log without forgetting handed-out names.
    pub fn reset_log(&mut self) {
        self.calls.clear();
    }

    /// The draws recorded, in replay order.
    pub fn draws(&self) -> Vec<DrawParams> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                CallRecord::Draw(params) => Some(*params),
                _ => None,
            })
            .collect()
    }

    fn fresh(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GlDriver for HeadlessDriver {
    fn uniform_offset_alignment(&self) -> usize {
        256
    }

    fn available_vram_kib(&mut self) -> u64 {
        0
    }

    fn set_swap_interval(&mut self, interval: i32) -> bool {
        self.calls.push(CallRecord::SetSwapInterval(interval));
        true
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        size: usize,
        _usage: UsageHint,
    ) -> Result<RawBuffer, DriverError> {
        let raw = RawBuffer(self.fresh());
        self.calls.push(CallRecord::CreateBuffer(raw, kind, size));
        Ok(raw)
    }

    fn upload_buffer(
        &mut self,
        buffer: RawBuffer,
        _kind: BufferKind,
        offset: usize,
        data: &[u8],
    ) -> Result<(), DriverError> {
        self.calls
            .push(CallRecord::UploadBuffer(buffer, offset, data.len()));
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: RawBuffer) {
        self.calls.push(CallRecord::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self, _desc: &TextureDesc) -> Result<RawTexture, DriverError> {
        let raw = RawTexture(self.fresh());
        self.calls.push(CallRecord::CreateTexture(raw));
        Ok(raw)
    }

    fn upload_texture(
        &mut self,
        texture: RawTexture,
        _desc: &TextureDesc,
        region: DirtyRegion,
        _data: &[u8],
    ) -> Result<(), DriverError> {
        self.calls.push(CallRecord::UploadTexture(texture, region));
        Ok(())
    }

    fn delete_texture(&mut self, texture: RawTexture) {
        self.calls.push(CallRecord::DeleteTexture(texture));
    }

    fn create_program(&mut self, _desc: &ProgramDesc) -> Result<RawProgram, DriverError> {
        let raw = RawProgram(self.fresh());
        self.calls.push(CallRecord::CreateProgram(raw));
        Ok(raw)
    }

    fn delete_program(&mut self, program: RawProgram) {
        self.calls.push(CallRecord::DeleteProgram(program));
    }

    fn create_vertex_array(
        &mut self,
        _bindings: &[(RawBuffer, &VertexLayout)],
        _index_buffer: Option<RawBuffer>,
    ) -> Result<RawVertexArray, DriverError> {
        let raw = RawVertexArray(self.fresh());
        self.calls.push(CallRecord::CreateVertexArray(raw));
        Ok(raw)
    }

    fn delete_vertex_array(&mut self, vertex_array: RawVertexArray) {
        self.calls.push(CallRecord::DeleteVertexArray(vertex_array));
    }

    fn create_renderbuffer(
        &mut self,
        _size: Extent2D,
        _format: PixelFormat,
        _sample_count: u32,
    ) -> Result<RawRenderbuffer, DriverError> {
        let raw = RawRenderbuffer(self.fresh());
        self.calls.push(CallRecord::CreateRenderbuffer(raw));
        Ok(raw)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RawRenderbuffer) {
        self.calls.push(CallRecord::DeleteRenderbuffer(renderbuffer));
    }

    fn create_framebuffer(
        &mut self,
        _attachments: &[(AttachmentPoint, RawAttachment)],
    ) -> Result<RawFramebuffer, DriverError> {
        let raw = RawFramebuffer(self.fresh());
        self.calls.push(CallRecord::CreateFramebuffer(raw));
        Ok(raw)
    }

    fn delete_framebuffer(&mut self, framebuffer: RawFramebuffer) {
        self.calls.push(CallRecord::DeleteFramebuffer(framebuffer));
    }

    fn bind_program(&mut self, program: Option<RawProgram>) {
        self.calls.push(CallRecord::BindProgram(program));
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<RawVertexArray>) {
        self.calls.push(CallRecord::BindVertexArray(vertex_array));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<RawFramebuffer>) {
        self.calls.push(CallRecord::BindFramebuffer(framebuffer));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<RawTexture>) {
        self.calls.push(CallRecord::BindTexture(unit, texture));
    }

    fn apply_sampler(&mut self, unit: u32, _sampler: &SamplerState) {
        self.calls.push(CallRecord::ApplySampler(unit));
    }

    fn bind_uniform_range(&mut self, slot: u32, buffer: RawBuffer, offset: usize, size: usize) {
        self.calls
            .push(CallRecord::BindUniformRange(slot, buffer, offset, size));
    }

    fn set_blend(&mut self, state: &BlendState) {
        self.calls.push(CallRecord::SetBlend(*state));
    }

    fn set_depth(&mut self, state: &DepthState) {
        self.calls.push(CallRecord::SetDepth(*state));
    }

    fn set_stencil(&mut self, state: &StencilState) {
        self.calls.push(CallRecord::SetStencil(*state));
    }

    fn set_cull(&mut self, mode: CullMode) {
        self.calls.push(CallRecord::SetCull(mode));
    }

    fn set_front_face(&mut self, front: FrontFace) {
        self.calls.push(CallRecord::SetFrontFace(front));
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.calls.push(CallRecord::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, rect: Option<Rect>) {
        self.calls.push(CallRecord::SetScissor(rect));
    }

    fn set_draw_buffers(&mut self, slots: &[u8]) {
        self.calls.push(CallRecord::SetDrawBuffers(slots.to_vec()));
    }

    fn set_clip_distance(&mut self, index: u32, enabled: bool) {
        self.calls.push(CallRecord::SetClipDistance(index, enabled));
    }

    fn clear(&mut self, flags: ClearFlags, value: &ClearValue) {
        self.calls.push(CallRecord::Clear(flags, *value));
    }

    fn blit(
        &mut self,
        src: Option<RawFramebuffer>,
        dst: Option<RawFramebuffer>,
        _src_rect: Rect,
        _dst_rect: Rect,
        _mask: ClearFlags,
        _filter: BlitFilter,
    ) {
        self.calls.push(CallRecord::Blit(src, dst));
    }

    fn draw(&mut self, params: &DrawParams) -> Result<(), DriverError> {
        self.calls.push(CallRecord::Draw(*params));
        Ok(())
    }

    fn check_error(&mut self, _context: &str) -> Result<(), DriverError> {
        Ok(())
    }
}
