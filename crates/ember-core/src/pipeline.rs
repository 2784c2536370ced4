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

//! Fixed-function pipeline state types.
//!
//! These are the concrete option structs the render command pipeline records
//! into queue segments and the driver's state tracker compares against its
//! last-bound values.

use crate::ember_bitflags;
use crate::math::Rect;

/// A source or destination blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0`.
    Zero,
    /// `1`.
    One,
    /// Source color.
    SrcColor,
    /// `1 - source color`.
    OneMinusSrcColor,
    /// Source alpha.
    SrcAlpha,
    /// `1 - source alpha`.
    OneMinusSrcAlpha,
    /// Destination alpha.
    DstAlpha,
    /// `1 - destination alpha`.
    OneMinusDstAlpha,
    /// Destination color.
    DstColor,
    /// `1 - destination color`.
    OneMinusDstColor,
}

/// The equation combining source and destination terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    /// `src + dst`.
    Add,
    /// `src - dst`.
    Subtract,
    /// `dst - src`.
    ReverseSubtract,
    /// `min(src, dst)`.
    Min,
    /// `max(src, dst)`.
    Max,
}

/// Full blend state for the color pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Whether blending is enabled at all.
    pub enabled: bool,
    /// Source factor for the color channels.
    pub src_color: BlendFactor,
    /// Destination factor for the color channels.
    pub dst_color: BlendFactor,
    /// Source factor for alpha.
    pub src_alpha: BlendFactor,
    /// Destination factor for alpha.
    pub dst_alpha: BlendFactor,
    /// Blend equation.
    pub op: BlendOp,
}

impl BlendState {
    /// Blending disabled; source overwrites destination.
    pub const OPAQUE: Self = Self {
        enabled: false,
        src_color: BlendFactor::One,
        dst_color: BlendFactor::Zero,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::Zero,
        op: BlendOp::Add,
    };

    /// Standard premultiplied-alpha "over" compositing.
    pub const ALPHA: Self = Self {
        enabled: true,
        src_color: BlendFactor::SrcAlpha,
        dst_color: BlendFactor::OneMinusSrcAlpha,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
        op: BlendOp::Add,
    };

    /// Additive blending.
    pub const ADD: Self = Self {
        enabled: true,
        src_color: BlendFactor::One,
        dst_color: BlendFactor::One,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::One,
        op: BlendOp::Add,
    };
}

impl Default for BlendState {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// A comparison function for depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if incoming < stored.
    Less,
    /// Passes if equal.
    Equal,
    /// Passes if incoming <= stored.
    LessEqual,
    /// Passes if incoming > stored.
    Greater,
    /// Passes if not equal.
    NotEqual,
    /// Passes if incoming >= stored.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Depth test and write state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Whether the depth test is enabled.
    pub test: bool,
    /// Whether depth writes are enabled.
    pub write: bool,
    /// The comparison applied when the test is enabled.
    pub function: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: true,
            write: true,
            function: CompareFunction::LessEqual,
        }
    }
}

/// What to do with a stencil value on pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    /// Keep the stored value.
    Keep,
    /// Set it to zero.
    Zero,
    /// Replace it with the reference value.
    Replace,
    /// Increment, clamping at max.
    IncrementClamp,
    /// Decrement, clamping at zero.
    DecrementClamp,
    /// Bitwise invert.
    Invert,
    /// Increment with wraparound.
    IncrementWrap,
    /// Decrement with wraparound.
    DecrementWrap,
}

/// Stencil configuration for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    /// The stencil comparison.
    pub function: CompareFunction,
    /// Applied when the stencil test fails.
    pub fail: StencilOp,
    /// Applied when the stencil test passes but the depth test fails.
    pub depth_fail: StencilOp,
    /// Applied when both tests pass.
    pub pass: StencilOp,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            function: CompareFunction::Always,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

/// Full stencil state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilState {
    /// Whether the stencil test is enabled.
    pub enabled: bool,
    /// Front-face configuration.
    pub front: StencilFaceState,
    /// Back-face configuration.
    pub back: StencilFaceState,
    /// Reference value.
    pub reference: i32,
    /// Read mask.
    pub read_mask: u32,
    /// Write mask.
    pub write_mask: u32,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    #[default]
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
}

/// Winding order that defines a front face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise (OpenGL default).
    #[default]
    CounterClockwise,
    /// Clockwise.
    Clockwise,
}

/// A viewport rectangle with depth range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// The rectangle in window coordinates.
    pub rect: Rect,
    /// Near depth bound.
    pub near: f32,
    /// Far depth bound.
    pub far: f32,
}

impl Viewport {
    /// A viewport covering `rect` with the full `[0, 1]` depth range.
    pub const fn of(rect: Rect) -> Self {
        Self {
            rect,
            near: 0.0,
            far: 1.0,
        }
    }
}

ember_bitflags! {
    /// Which attachment planes an operation (clear, blit) touches.
    pub struct ClearFlags: u32 {
        /// The color planes.
        const COLOR = 1 << 0;
        /// The depth plane.
        const DEPTH = 1 << 1;
        /// The stencil plane.
        const STENCIL = 1 << 2;
    }
}

/// Values used when clearing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValue {
    /// Clear color, RGBA.
    pub color: [f32; 4],
    /// Clear depth.
    pub depth: f32,
    /// Clear stencil.
    pub stencil: i32,
}

impl Default for ClearValue {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Filtering applied by a framebuffer blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlitFilter {
    /// Nearest texel.
    Nearest,
    /// Bilinear.
    Linear,
}

/// The primitive topology of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// Point list; primitive size is the point size.
    Points,
    /// Line list; primitive size is the line width.
    Lines,
    /// Line strip.
    LineStrip,
    /// Triangle list.
    Triangles,
    /// Triangle strip.
    TriangleStrip,
}
