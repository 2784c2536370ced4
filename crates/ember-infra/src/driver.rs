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

//! The OpenGL implementation of the graphics driver contract.
//!
//! One [`GlBackend`] belongs to one GL context and the thread it is current
//! on. Function pointers are loaded once at construction through the
//! windowing layer's `get_proc_address`; the swap-interval hook is likewise
//! supplied by the windowing layer, since GL itself has no portable way to
//! set it.

use crate::convert;
use crate::vram::VramProbe;
use ember_core::error::DriverError;
use ember_core::pipeline::{
    BlendState, BlitFilter, ClearFlags, ClearValue, CullMode, DepthState, FrontFace,
    PrimitiveTopology, StencilState, Viewport,
};
use ember_core::resource::{
    AttachmentPoint, BufferKind, DirtyRegion, PixelFormat, ProgramDesc, SamplerState, ShaderStage,
    TextureDesc, UsageHint, VertexLayout,
};
use ember_core::{
    DrawParams, Extent2D, GlDriver, RawAttachment, RawBuffer, RawFramebuffer, RawProgram,
    RawRenderbuffer, RawTexture, RawVertexArray, Rect, ResourceId,
};
use gl::types::{GLenum, GLint, GLsizei, GLuint};
use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::ptr;

/// Applies a swap interval; supplied by the windowing layer (wgl/glX/EGL).
pub type SwapIntervalFn = Box<dyn FnMut(i32) -> bool>;

/// The OpenGL driver for one context.
pub struct GlBackend {
    uniform_align: usize,
    vram: VramProbe,
    swap_interval: Option<SwapIntervalFn>,
    // Texture names to their bind targets; sampling state and uploads need
    // the target the texture was created with.
    texture_targets: HashMap<GLuint, GLenum>,
}

impl GlBackend {
    /// Loads GL function pointers through `loader` and queries the static
    /// capabilities. The calling thread must have the context current.
    pub fn new<F>(mut loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        gl::load_with(|symbol| loader(symbol));

        let mut align: GLint = 0;
        unsafe {
            gl::GetIntegerv(gl::UNIFORM_BUFFER_OFFSET_ALIGNMENT, &mut align);
        }

        Self {
            uniform_align: align.max(1) as usize,
            vram: VramProbe::new(),
            swap_interval: None,
            texture_targets: HashMap::new(),
        }
    }

    /// Installs the windowing layer's swap-interval hook.
    pub fn set_swap_interval_fn(&mut self, f: SwapIntervalFn) {
        self.swap_interval = Some(f);
    }

    fn drain_errors(context: &str) -> Result<(), DriverError> {
        let mut first = None;
        loop {
            let code = unsafe { gl::GetError() };
            if code == gl::NO_ERROR {
                break;
            }
            log::error!("GL error {code:#06x} during {context}");
            first.get_or_insert(code);
        }
        match first {
            Some(code) => Err(DriverError::ApiError {
                code,
                context: context.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn apply_sampler_to(target: GLenum, sampler: &SamplerState) {
        unsafe {
            gl::TexParameteri(
                target,
                gl::TEXTURE_MIN_FILTER,
                convert::min_filter(sampler.min_filter, sampler.mip_filter) as GLint,
            );
            gl::TexParameteri(
                target,
                gl::TEXTURE_MAG_FILTER,
                convert::mag_filter(sampler.mag_filter) as GLint,
            );
            gl::TexParameteri(
                target,
                gl::TEXTURE_WRAP_S,
                convert::address_mode(sampler.wrap_u) as GLint,
            );
            gl::TexParameteri(
                target,
                gl::TEXTURE_WRAP_T,
                convert::address_mode(sampler.wrap_v) as GLint,
            );
            if target == gl::TEXTURE_3D {
                gl::TexParameteri(
                    target,
                    gl::TEXTURE_WRAP_R,
                    convert::address_mode(sampler.wrap_w) as GLint,
                );
            }
            let border = [
                sampler.border[0] as f32 / 255.0,
                sampler.border[1] as f32 / 255.0,
                sampler.border[2] as f32 / 255.0,
                sampler.border[3] as f32 / 255.0,
            ];
            gl::TexParameterfv(target, gl::TEXTURE_BORDER_COLOR, border.as_ptr());
        }
    }

    fn compile_shader(desc_id: ResourceId, stage: ShaderStage, source: &str) -> Result<GLuint, DriverError> {
        let kind = match stage {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
            ShaderStage::Geometry => gl::GEOMETRY_SHADER,
        };
        unsafe {
            let shader = gl::CreateShader(kind);
            let c_source = CString::new(source).unwrap_or_default();
            gl::ShaderSource(shader, 1, &c_source.as_ptr(), ptr::null());
            gl::CompileShader(shader);

            let mut status: GLint = 0;
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
            if status == 0 {
                let log = Self::info_log(shader, true);
                gl::DeleteShader(shader);
                return Err(DriverError::ShaderCompile { id: desc_id, log });
            }
            Ok(shader)
        }
    }

    unsafe fn info_log(object: GLuint, shader: bool) -> String {
        let mut len: GLint = 0;
        if shader {
            gl::GetShaderiv(object, gl::INFO_LOG_LENGTH, &mut len);
        } else {
            gl::GetProgramiv(object, gl::INFO_LOG_LENGTH, &mut len);
        }
        let mut buffer = vec![0u8; len.max(1) as usize];
        let mut written: GLsizei = 0;
        if shader {
            gl::GetShaderInfoLog(object, len, &mut written, buffer.as_mut_ptr().cast());
        } else {
            gl::GetProgramInfoLog(object, len, &mut written, buffer.as_mut_ptr().cast());
        }
        buffer.truncate(written.max(0) as usize);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl GlDriver for GlBackend {
    fn uniform_offset_alignment(&self) -> usize {
        self.uniform_align
    }

    fn available_vram_kib(&mut self) -> u64 {
        self.vram.available_kib()
    }

    fn set_swap_interval(&mut self, interval: i32) -> bool {
        match &mut self.swap_interval {
            Some(f) => f(interval),
            None => false,
        }
    }

    fn create_buffer(
        &mut self,
        kind: BufferKind,
        size: usize,
        usage: UsageHint,
    ) -> Result<RawBuffer, DriverError> {
        let target = convert::buffer_target(kind);
        let mut name: GLuint = 0;
        unsafe {
            gl::GenBuffers(1, &mut name);
            gl::BindBuffer(target, name);
            gl::BufferData(target, size as isize, ptr::null(), convert::usage(usage));
        }
        Self::drain_errors("create_buffer")?;
        Ok(RawBuffer(name))
    }

    fn upload_buffer(
        &mut self,
        buffer: RawBuffer,
        kind: BufferKind,
        offset: usize,
        data: &[u8],
    ) -> Result<(), DriverError> {
        let target = convert::buffer_target(kind);
        unsafe {
            gl::BindBuffer(target, buffer.0);
            gl::BufferSubData(
                target,
                offset as isize,
                data.len() as isize,
                data.as_ptr().cast(),
            );
        }
        Self::drain_errors("upload_buffer")
    }

    fn delete_buffer(&mut self, buffer: RawBuffer) {
        unsafe {
            gl::DeleteBuffers(1, &buffer.0);
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<RawTexture, DriverError> {
        let size = desc.size();
        let target = convert::texture_target(desc.dimension(), desc.sample_count());
        let (internal, ..) = convert::pixel_format(desc.format());

        let mut name: GLuint = 0;
        unsafe {
            gl::GenTextures(1, &mut name);
            gl::BindTexture(target, name);
            match target {
                gl::TEXTURE_1D => {
                    gl::TexStorage1D(target, 1, internal, size.width as GLsizei);
                }
                gl::TEXTURE_2D => {
                    gl::TexStorage2D(
                        target,
                        1,
                        internal,
                        size.width as GLsizei,
                        size.height as GLsizei,
                    );
                }
                gl::TEXTURE_2D_MULTISAMPLE => {
                    gl::TexStorage2DMultisample(
                        target,
                        desc.sample_count() as GLsizei,
                        internal,
                        size.width as GLsizei,
                        size.height as GLsizei,
                        gl::TRUE,
                    );
                }
                _ => {
                    gl::TexStorage3D(
                        target,
                        1,
                        internal,
                        size.width as GLsizei,
                        size.height as GLsizei,
                        size.depth as GLsizei,
                    );
                }
            }
        }
        if target != gl::TEXTURE_2D_MULTISAMPLE {
            Self::apply_sampler_to(target, &desc.sampler());
        }
        Self::drain_errors("create_texture")?;
        self.texture_targets.insert(name, target);
        Ok(RawTexture(name))
    }

    fn upload_texture(
        &mut self,
        texture: RawTexture,
        desc: &TextureDesc,
        region: DirtyRegion,
        data: &[u8],
    ) -> Result<(), DriverError> {
        let size = desc.size();
        let format = desc.format();
        let target = self
            .texture_targets
            .get(&texture.0)
            .copied()
            .unwrap_or(gl::TEXTURE_2D);

        // Clamp the region to the texture; DirtyRegion::full() uses MAX.
        let x = region.rect.x.max(0) as u32;
        let y = region.rect.y.max(0) as u32;
        let width = region.rect.width.min(size.width - x.min(size.width));
        let height = region.rect.height.min(size.height - y.min(size.height));
        if width == 0 || height == 0 {
            return Ok(());
        }

        unsafe {
            gl::BindTexture(target, texture.0);
            if format.is_compressed() {
                // Compressed sources are tightly packed whole surfaces.
                let (internal, ..) = convert::pixel_format(format);
                let len = format.surface_size(size.width, size.height).min(data.len());
                gl::CompressedTexSubImage2D(
                    target,
                    0,
                    0,
                    0,
                    size.width as GLsizei,
                    size.height as GLsizei,
                    internal,
                    len as GLsizei,
                    data.as_ptr().cast(),
                );
            } else {
                let (_, upload_format, upload_type) = convert::pixel_format(format);
                let bpp = format.bytes_per_pixel();
                let pitch = if desc.pitch() > 0 {
                    desc.pitch()
                } else {
                    size.width as usize * bpp
                };
                gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
                gl::PixelStorei(gl::UNPACK_ROW_LENGTH, (pitch / bpp.max(1)) as GLint);
                let start = y as usize * pitch + x as usize * bpp;
                gl::TexSubImage2D(
                    target,
                    0,
                    x as GLint,
                    y as GLint,
                    width as GLsizei,
                    height as GLsizei,
                    upload_format,
                    upload_type,
                    data[start..].as_ptr().cast(),
                );
                gl::PixelStorei(gl::UNPACK_ROW_LENGTH, 0);
                gl::PixelStorei(gl::UNPACK_ALIGNMENT, 4);
            }
        }
        Self::drain_errors("upload_texture")
    }

    fn delete_texture(&mut self, texture: RawTexture) {
        self.texture_targets.remove(&texture.0);
        unsafe {
            gl::DeleteTextures(1, &texture.0);
        }
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<RawProgram, DriverError> {
        let mut shaders = Vec::with_capacity(desc.stages().len());
        for stage in desc.stages() {
            match Self::compile_shader(desc.id(), stage.stage, &stage.source) {
                Ok(shader) => shaders.push(shader),
                Err(e) => {
                    for shader in shaders {
                        unsafe { gl::DeleteShader(shader) };
                    }
                    return Err(e);
                }
            }
        }

        unsafe {
            let program = gl::CreateProgram();
            for &shader in &shaders {
                gl::AttachShader(program, shader);
            }
            gl::LinkProgram(program);
            for shader in shaders {
                gl::DetachShader(program, shader);
                gl::DeleteShader(shader);
            }

            let mut status: GLint = 0;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
            if status == 0 {
                let log = Self::info_log(program, false);
                gl::DeleteProgram(program);
                return Err(DriverError::ProgramLink { id: desc.id(), log });
            }
            Ok(RawProgram(program))
        }
    }

    fn delete_program(&mut self, program: RawProgram) {
        unsafe {
            gl::DeleteProgram(program.0);
        }
    }

    fn create_vertex_array(
        &mut self,
        bindings: &[(RawBuffer, &VertexLayout)],
        index_buffer: Option<RawBuffer>,
    ) -> Result<RawVertexArray, DriverError> {
        let mut name: GLuint = 0;
        unsafe {
            gl::GenVertexArrays(1, &mut name);
            gl::BindVertexArray(name);

            let mut location: GLuint = 0;
            for (buffer, layout) in bindings {
                gl::BindBuffer(gl::ARRAY_BUFFER, buffer.0);
                let stride = layout.stride() as GLsizei;
                for attribute in layout.attributes() {
                    gl::EnableVertexAttribArray(location);
                    let ty = convert::component_type(attribute.ty);
                    let offset = attribute.offset as usize as *const c_void;
                    if convert::is_integer(attribute.ty) && !attribute.normalized {
                        gl::VertexAttribIPointer(
                            location,
                            attribute.components as GLint,
                            ty,
                            stride,
                            offset,
                        );
                    } else {
                        gl::VertexAttribPointer(
                            location,
                            attribute.components as GLint,
                            ty,
                            attribute.normalized as u8,
                            stride,
                            offset,
                        );
                    }
                    location += 1;
                }
            }
            if let Some(index) = index_buffer {
                gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, index.0);
            }
            gl::BindVertexArray(0);
        }
        Self::drain_errors("create_vertex_array")?;
        Ok(RawVertexArray(name))
    }

    fn delete_vertex_array(&mut self, vertex_array: RawVertexArray) {
        unsafe {
            gl::DeleteVertexArrays(1, &vertex_array.0);
        }
    }

    fn create_renderbuffer(
        &mut self,
        size: Extent2D,
        format: PixelFormat,
        sample_count: u32,
    ) -> Result<RawRenderbuffer, DriverError> {
        let (internal, ..) = convert::pixel_format(format);
        // 0 samples means non-multisampled storage.
        let samples = if sample_count <= 1 { 0 } else { sample_count };
        let mut name: GLuint = 0;
        unsafe {
            gl::GenRenderbuffers(1, &mut name);
            gl::BindRenderbuffer(gl::RENDERBUFFER, name);
            gl::RenderbufferStorageMultisample(
                gl::RENDERBUFFER,
                samples as GLsizei,
                internal,
                size.width as GLsizei,
                size.height as GLsizei,
            );
        }
        Self::drain_errors("create_renderbuffer")?;
        Ok(RawRenderbuffer(name))
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RawRenderbuffer) {
        unsafe {
            gl::DeleteRenderbuffers(1, &renderbuffer.0);
        }
    }

    fn create_framebuffer(
        &mut self,
        attachments: &[(AttachmentPoint, RawAttachment)],
    ) -> Result<RawFramebuffer, DriverError> {
        let mut name: GLuint = 0;
        unsafe {
            gl::GenFramebuffers(1, &mut name);
            gl::BindFramebuffer(gl::FRAMEBUFFER, name);
            for (point, attachment) in attachments {
                let point = convert::attachment_point(*point);
                match attachment {
                    RawAttachment::Texture(texture) => {
                        let target = self
                            .texture_targets
                            .get(&texture.0)
                            .copied()
                            .unwrap_or(gl::TEXTURE_2D);
                        gl::FramebufferTexture2D(gl::FRAMEBUFFER, point, target, texture.0, 0);
                    }
                    RawAttachment::Renderbuffer(renderbuffer) => {
                        gl::FramebufferRenderbuffer(
                            gl::FRAMEBUFFER,
                            point,
                            gl::RENDERBUFFER,
                            renderbuffer.0,
                        );
                    }
                }
            }
            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            if status != gl::FRAMEBUFFER_COMPLETE {
                gl::DeleteFramebuffers(1, &name);
                return Err(DriverError::IncompleteFramebuffer {
                    id: ResourceId::INVALID,
                    status,
                });
            }
        }
        Ok(RawFramebuffer(name))
    }

    fn delete_framebuffer(&mut self, framebuffer: RawFramebuffer) {
        unsafe {
            gl::DeleteFramebuffers(1, &framebuffer.0);
        }
    }

    fn bind_program(&mut self, program: Option<RawProgram>) {
        unsafe {
            gl::UseProgram(program.map_or(0, |p| p.0));
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<RawVertexArray>) {
        unsafe {
            gl::BindVertexArray(vertex_array.map_or(0, |v| v.0));
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<RawFramebuffer>) {
        unsafe {
            gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, framebuffer.map_or(0, |f| f.0));
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<RawTexture>) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
            match texture {
                Some(texture) => {
                    let target = self
                        .texture_targets
                        .get(&texture.0)
                        .copied()
                        .unwrap_or(gl::TEXTURE_2D);
                    gl::BindTexture(target, texture.0);
                }
                None => gl::BindTexture(gl::TEXTURE_2D, 0),
            }
        }
    }

    fn apply_sampler(&mut self, unit: u32, sampler: &SamplerState) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
        }
        Self::apply_sampler_to(gl::TEXTURE_2D, sampler);
    }

    fn bind_uniform_range(&mut self, slot: u32, buffer: RawBuffer, offset: usize, size: usize) {
        unsafe {
            gl::BindBufferRange(
                gl::UNIFORM_BUFFER,
                slot,
                buffer.0,
                offset as isize,
                size as isize,
            );
        }
    }

    fn set_blend(&mut self, state: &BlendState) {
        unsafe {
            if state.enabled {
                gl::Enable(gl::BLEND);
                gl::BlendFuncSeparate(
                    convert::blend_factor(state.src_color),
                    convert::blend_factor(state.dst_color),
                    convert::blend_factor(state.src_alpha),
                    convert::blend_factor(state.dst_alpha),
                );
                gl::BlendEquation(convert::blend_op(state.op));
            } else {
                gl::Disable(gl::BLEND);
            }
        }
    }

    fn set_depth(&mut self, state: &DepthState) {
        unsafe {
            if state.test {
                gl::Enable(gl::DEPTH_TEST);
                gl::DepthFunc(convert::compare_function(state.function));
            } else {
                gl::Disable(gl::DEPTH_TEST);
            }
            gl::DepthMask(state.write as u8);
        }
    }

    fn set_stencil(&mut self, state: &StencilState) {
        unsafe {
            if !state.enabled {
                gl::Disable(gl::STENCIL_TEST);
                return;
            }
            gl::Enable(gl::STENCIL_TEST);
            for (face, config) in [(gl::FRONT, &state.front), (gl::BACK, &state.back)] {
                gl::StencilFuncSeparate(
                    face,
                    convert::compare_function(config.function),
                    state.reference,
                    state.read_mask,
                );
                gl::StencilOpSeparate(
                    face,
                    convert::stencil_op(config.fail),
                    convert::stencil_op(config.depth_fail),
                    convert::stencil_op(config.pass),
                );
            }
            gl::StencilMask(state.write_mask);
        }
    }

    fn set_cull(&mut self, mode: CullMode) {
        unsafe {
            match mode {
                CullMode::None => gl::Disable(gl::CULL_FACE),
                CullMode::Front => {
                    gl::Enable(gl::CULL_FACE);
                    gl::CullFace(gl::FRONT);
                }
                CullMode::Back => {
                    gl::Enable(gl::CULL_FACE);
                    gl::CullFace(gl::BACK);
                }
            }
        }
    }

    fn set_front_face(&mut self, front: FrontFace) {
        unsafe {
            gl::FrontFace(convert::front_face(front));
        }
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        unsafe {
            gl::Viewport(
                viewport.rect.x,
                viewport.rect.y,
                viewport.rect.width as GLsizei,
                viewport.rect.height as GLsizei,
            );
            gl::DepthRange(viewport.near as f64, viewport.far as f64);
        }
    }

    fn set_scissor(&mut self, rect: Option<Rect>) {
        unsafe {
            match rect {
                Some(rect) => {
                    gl::Enable(gl::SCISSOR_TEST);
                    gl::Scissor(
                        rect.x,
                        rect.y,
                        rect.width as GLsizei,
                        rect.height as GLsizei,
                    );
                }
                None => gl::Disable(gl::SCISSOR_TEST),
            }
        }
    }

    fn set_draw_buffers(&mut self, slots: &[u8]) {
        unsafe {
            if slots.is_empty() {
                gl::DrawBuffer(gl::BACK);
            } else {
                let buffers: Vec<GLenum> = slots
                    .iter()
                    .map(|slot| gl::COLOR_ATTACHMENT0 + *slot as GLenum)
                    .collect();
                gl::DrawBuffers(buffers.len() as GLsizei, buffers.as_ptr());
            }
        }
    }

    fn set_clip_distance(&mut self, index: u32, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::CLIP_DISTANCE0 + index);
            } else {
                gl::Disable(gl::CLIP_DISTANCE0 + index);
            }
        }
    }

    fn clear(&mut self, flags: ClearFlags, value: &ClearValue) {
        unsafe {
            if flags.contains(ClearFlags::COLOR) {
                gl::ClearColor(value.color[0], value.color[1], value.color[2], value.color[3]);
            }
            if flags.contains(ClearFlags::DEPTH) {
                gl::ClearDepth(value.depth as f64);
                gl::DepthMask(gl::TRUE);
            }
            if flags.contains(ClearFlags::STENCIL) {
                gl::ClearStencil(value.stencil);
            }
            gl::Clear(convert::clear_mask(flags));
        }
    }

    fn blit(
        &mut self,
        src: Option<RawFramebuffer>,
        dst: Option<RawFramebuffer>,
        src_rect: Rect,
        dst_rect: Rect,
        mask: ClearFlags,
        filter: BlitFilter,
    ) {
        unsafe {
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, src.map_or(0, |f| f.0));
            gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, dst.map_or(0, |f| f.0));
            gl::BlitFramebuffer(
                src_rect.x,
                src_rect.y,
                src_rect.x + src_rect.width as GLint,
                src_rect.y + src_rect.height as GLint,
                dst_rect.x,
                dst_rect.y,
                dst_rect.x + dst_rect.width as GLint,
                dst_rect.y + dst_rect.height as GLint,
                convert::clear_mask(mask),
                convert::blit_filter(filter),
            );
        }
    }

    fn draw(&mut self, params: &DrawParams) -> Result<(), DriverError> {
        unsafe {
            match params.topology {
                PrimitiveTopology::Points => gl::PointSize(params.primitive_size),
                PrimitiveTopology::Lines | PrimitiveTopology::LineStrip => {
                    gl::LineWidth(params.primitive_size)
                }
                _ => {}
            }
            let mode = convert::topology(params.topology);
            if params.indexed {
                gl::DrawElementsBaseVertex(
                    mode,
                    params.count as GLsizei,
                    gl::UNSIGNED_INT,
                    params.index_offset_bytes as *const c_void,
                    params.base_vertex,
                );
            } else {
                gl::DrawArrays(mode, params.base_vertex, params.count as GLsizei);
            }
        }
        Self::drain_errors("draw")
    }

    fn check_error(&mut self, context: &str) -> Result<(), DriverError> {
        Self::drain_errors(context)
    }
}
