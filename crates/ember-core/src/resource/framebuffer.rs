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

//! Framebuffer and renderbuffer descriptors.

use super::{PixelFormat, ResourceId};
use crate::math::Extent2D;
use std::sync::atomic::{AtomicU64, Ordering};

/// Whether a framebuffer targets the window surface or offscreen storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferKind {
    /// The default framebuffer of the owning context's window.
    Window,
    /// An offscreen framebuffer with explicit attachments.
    Offscreen,
}

/// An attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    /// A color attachment slot.
    Color(u8),
    /// The depth attachment.
    Depth,
    /// The stencil attachment.
    Stencil,
    /// The combined depth-stencil attachment.
    DepthStencil,
}

/// What is attached: a texture or a renderbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRef {
    /// A texture descriptor id.
    Texture(ResourceId),
    /// A renderbuffer descriptor id.
    Renderbuffer(ResourceId),
}

/// A framebuffer descriptor.
#[derive(Debug)]
pub struct FramebufferDesc {
    id: ResourceId,
    kind: FramebufferKind,
    size: Extent2D,
    sample_count: u32,
    attachments: Vec<(AttachmentPoint, AttachmentRef)>,
    expiration_secs: f64,
    generation: AtomicU64,
}

impl FramebufferDesc {
    pub(crate) fn new(
        id: ResourceId,
        kind: FramebufferKind,
        size: Extent2D,
        sample_count: u32,
        attachments: Vec<(AttachmentPoint, AttachmentRef)>,
        expiration_secs: f64,
    ) -> Self {
        Self {
            id,
            kind,
            size,
            sample_count,
            attachments,
            expiration_secs,
            generation: AtomicU64::new(1),
        }
    }

    /// The descriptor id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Window or offscreen.
    pub fn kind(&self) -> FramebufferKind {
        self.kind
    }

    /// Size in pixels.
    pub fn size(&self) -> Extent2D {
        self.size
    }

    /// Samples per pixel.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// The attachment map.
    pub fn attachments(&self) -> &[(AttachmentPoint, AttachmentRef)] {
        &self.attachments
    }

    /// Handle expiration window in seconds (0 = persistent).
    pub fn expiration_secs(&self) -> f64 {
        self.expiration_secs
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// A renderbuffer descriptor.
#[derive(Debug)]
pub struct RenderbufferDesc {
    id: ResourceId,
    size: Extent2D,
    format: PixelFormat,
    sample_count: u32,
    expiration_secs: f64,
    generation: AtomicU64,
}

impl RenderbufferDesc {
    pub(crate) fn new(
        id: ResourceId,
        size: Extent2D,
        format: PixelFormat,
        sample_count: u32,
        expiration_secs: f64,
    ) -> Self {
        Self {
            id,
            size,
            format,
            sample_count,
            expiration_secs,
            generation: AtomicU64::new(1),
        }
    }

    /// The descriptor id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Size in pixels.
    pub fn size(&self) -> Extent2D {
        self.size
    }

    /// Storage format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Samples per pixel.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Handle expiration window in seconds (0 = persistent).
    pub fn expiration_secs(&self) -> f64 {
        self.expiration_secs
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
