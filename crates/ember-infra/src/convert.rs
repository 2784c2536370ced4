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

//! Mappings from the driver contract's enums to GL constants.

use ember_core::pipeline::{
    BlendFactor, BlendOp, BlitFilter, ClearFlags, CompareFunction, FrontFace, PrimitiveTopology,
    StencilOp,
};
use ember_core::resource::{
    AddressMode, AttachmentPoint, BufferKind, ComponentType, FilterMode, MipFilter, PixelFormat,
    TextureDimension, UsageFrequency, UsageHint, UsageNature,
};
use gl::types::GLenum;

// S3TC internal formats; the gl crate only generates core constants.
pub const COMPRESSED_RGBA_S3TC_DXT1: GLenum = 0x83F1;
pub const COMPRESSED_RGBA_S3TC_DXT3: GLenum = 0x83F2;
pub const COMPRESSED_RGBA_S3TC_DXT5: GLenum = 0x83F3;

pub fn buffer_target(kind: BufferKind) -> GLenum {
    match kind {
        BufferKind::Vertex => gl::ARRAY_BUFFER,
        BufferKind::Index => gl::ELEMENT_ARRAY_BUFFER,
        BufferKind::Uniform => gl::UNIFORM_BUFFER,
    }
}

pub fn usage(hint: UsageHint) -> GLenum {
    match (hint.frequency, hint.nature) {
        (UsageFrequency::Static, UsageNature::Draw) => gl::STATIC_DRAW,
        (UsageFrequency::Static, UsageNature::Read) => gl::STATIC_READ,
        (UsageFrequency::Static, UsageNature::Copy) => gl::STATIC_COPY,
        (UsageFrequency::Dynamic, UsageNature::Draw) => gl::DYNAMIC_DRAW,
        (UsageFrequency::Dynamic, UsageNature::Read) => gl::DYNAMIC_READ,
        (UsageFrequency::Dynamic, UsageNature::Copy) => gl::DYNAMIC_COPY,
        (UsageFrequency::Stream, UsageNature::Draw) => gl::STREAM_DRAW,
        (UsageFrequency::Stream, UsageNature::Read) => gl::STREAM_READ,
        (UsageFrequency::Stream, UsageNature::Copy) => gl::STREAM_COPY,
    }
}

pub fn texture_target(dimension: TextureDimension, sample_count: u32) -> GLenum {
    match (dimension, sample_count) {
        (TextureDimension::D1, _) => gl::TEXTURE_1D,
        (TextureDimension::D2, 0 | 1) => gl::TEXTURE_2D,
        (TextureDimension::D2, _) => gl::TEXTURE_2D_MULTISAMPLE,
        (TextureDimension::D3, _) => gl::TEXTURE_3D,
    }
}

/// `(internal format, upload format, upload component type)`. Compressed
/// formats upload through the compressed path and ignore the latter two.
pub fn pixel_format(format: PixelFormat) -> (GLenum, GLenum, GLenum) {
    match format {
        PixelFormat::R8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
        PixelFormat::Rg8 => (gl::RG8, gl::RG, gl::UNSIGNED_BYTE),
        PixelFormat::Rgb8 => (gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
        PixelFormat::Rgba8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
        PixelFormat::Bgra8 => (gl::RGBA8, gl::BGRA, gl::UNSIGNED_BYTE),
        PixelFormat::Rgba16F => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT),
        PixelFormat::Dxt1 => (COMPRESSED_RGBA_S3TC_DXT1, gl::RGBA, gl::UNSIGNED_BYTE),
        PixelFormat::Dxt3 => (COMPRESSED_RGBA_S3TC_DXT3, gl::RGBA, gl::UNSIGNED_BYTE),
        PixelFormat::Dxt5 => (COMPRESSED_RGBA_S3TC_DXT5, gl::RGBA, gl::UNSIGNED_BYTE),
        PixelFormat::Depth24Stencil8 => (
            gl::DEPTH24_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
        ),
        PixelFormat::Depth32F => (gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT),
    }
}

pub fn min_filter(filter: FilterMode, mip: MipFilter) -> GLenum {
    match (filter, mip) {
        (FilterMode::Nearest, MipFilter::None) => gl::NEAREST,
        (FilterMode::Nearest, MipFilter::Nearest) => gl::NEAREST_MIPMAP_NEAREST,
        (FilterMode::Nearest, MipFilter::Linear) => gl::NEAREST_MIPMAP_LINEAR,
        (FilterMode::Linear, MipFilter::None) => gl::LINEAR,
        (FilterMode::Linear, MipFilter::Nearest) => gl::LINEAR_MIPMAP_NEAREST,
        (FilterMode::Linear, MipFilter::Linear) => gl::LINEAR_MIPMAP_LINEAR,
    }
}

pub fn mag_filter(filter: FilterMode) -> GLenum {
    match filter {
        FilterMode::Nearest => gl::NEAREST,
        FilterMode::Linear => gl::LINEAR,
    }
}

pub fn address_mode(mode: AddressMode) -> GLenum {
    match mode {
        AddressMode::Repeat => gl::REPEAT,
        AddressMode::ClampToEdge => gl::CLAMP_TO_EDGE,
        AddressMode::MirrorRepeat => gl::MIRRORED_REPEAT,
        AddressMode::ClampToBorder => gl::CLAMP_TO_BORDER,
    }
}

pub fn component_type(ty: ComponentType) -> GLenum {
    match ty {
        ComponentType::I8 => gl::BYTE,
        ComponentType::U8 => gl::UNSIGNED_BYTE,
        ComponentType::I16 => gl::SHORT,
        ComponentType::U16 => gl::UNSIGNED_SHORT,
        ComponentType::I32 => gl::INT,
        ComponentType::U32 => gl::UNSIGNED_INT,
        ComponentType::F16 => gl::HALF_FLOAT,
        ComponentType::F32 => gl::FLOAT,
    }
}

pub fn is_integer(ty: ComponentType) -> bool {
    !matches!(ty, ComponentType::F16 | ComponentType::F32)
}

pub fn attachment_point(point: AttachmentPoint) -> GLenum {
    match point {
        AttachmentPoint::Color(slot) => gl::COLOR_ATTACHMENT0 + slot as GLenum,
        AttachmentPoint::Depth => gl::DEPTH_ATTACHMENT,
        AttachmentPoint::Stencil => gl::STENCIL_ATTACHMENT,
        AttachmentPoint::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
    }
}

pub fn blend_factor(factor: BlendFactor) -> GLenum {
    match factor {
        BlendFactor::Zero => gl::ZERO,
        BlendFactor::One => gl::ONE,
        BlendFactor::SrcColor => gl::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => gl::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => gl::DST_COLOR,
        BlendFactor::OneMinusDstColor => gl::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => gl::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => gl::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => gl::ONE_MINUS_DST_ALPHA,
    }
}

pub fn blend_op(op: BlendOp) -> GLenum {
    match op {
        BlendOp::Add => gl::FUNC_ADD,
        BlendOp::Subtract => gl::FUNC_SUBTRACT,
        BlendOp::ReverseSubtract => gl::FUNC_REVERSE_SUBTRACT,
        BlendOp::Min => gl::MIN,
        BlendOp::Max => gl::MAX,
    }
}

pub fn compare_function(function: CompareFunction) -> GLenum {
    match function {
        CompareFunction::Never => gl::NEVER,
        CompareFunction::Less => gl::LESS,
        CompareFunction::Equal => gl::EQUAL,
        CompareFunction::LessEqual => gl::LEQUAL,
        CompareFunction::Greater => gl::GREATER,
        CompareFunction::NotEqual => gl::NOTEQUAL,
        CompareFunction::GreaterEqual => gl::GEQUAL,
        CompareFunction::Always => gl::ALWAYS,
    }
}

pub fn stencil_op(op: StencilOp) -> GLenum {
    match op {
        StencilOp::Keep => gl::KEEP,
        StencilOp::Zero => gl::ZERO,
        StencilOp::Replace => gl::REPLACE,
        StencilOp::IncrementClamp => gl::INCR,
        StencilOp::DecrementClamp => gl::DECR,
        StencilOp::Invert => gl::INVERT,
        StencilOp::IncrementWrap => gl::INCR_WRAP,
        StencilOp::DecrementWrap => gl::DECR_WRAP,
    }
}

pub fn front_face(front: FrontFace) -> GLenum {
    match front {
        FrontFace::CounterClockwise => gl::CCW,
        FrontFace::Clockwise => gl::CW,
    }
}

pub fn topology(topology: PrimitiveTopology) -> GLenum {
    match topology {
        PrimitiveTopology::Points => gl::POINTS,
        PrimitiveTopology::Lines => gl::LINES,
        PrimitiveTopology::LineStrip => gl::LINE_STRIP,
        PrimitiveTopology::Triangles => gl::TRIANGLES,
        PrimitiveTopology::TriangleStrip => gl::TRIANGLE_STRIP,
    }
}

pub fn blit_filter(filter: BlitFilter) -> GLenum {
    match filter {
        BlitFilter::Nearest => gl::NEAREST,
        BlitFilter::Linear => gl::LINEAR,
    }
}

pub fn clear_mask(flags: ClearFlags) -> GLenum {
    let mut mask = 0;
    if flags.contains(ClearFlags::COLOR) {
        mask |= gl::COLOR_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::DEPTH) {
        mask |= gl::DEPTH_BUFFER_BIT;
    }
    if flags.contains(ClearFlags::STENCIL) {
        mask |= gl::STENCIL_BUFFER_BIT;
    }
    mask
}
