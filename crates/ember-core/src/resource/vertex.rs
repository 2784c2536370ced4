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

//! Vertex layout and vertex array descriptors.

use super::ResourceId;
use std::sync::atomic::{AtomicU64, Ordering};

/// The component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// Signed 8-bit.
    I8,
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    I16,
    /// Unsigned 16-bit.
    U16,
    /// Signed 32-bit.
    I32,
    /// Unsigned 32-bit.
    U32,
    /// 16-bit float.
    F16,
    /// 32-bit float.
    F32,
}

impl ComponentType {
    /// Size of one component in bytes.
    pub const fn byte_size(&self) -> u32 {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
        }
    }
}

/// One attribute within a vertex layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The attribute name as it appears in shader sources.
    pub name: String,
    /// Number of components (1-4).
    pub components: u8,
    /// Component type.
    pub ty: ComponentType,
    /// Whether integer components are normalized to `[0, 1]` / `[-1, 1]`.
    pub normalized: bool,
    /// Byte offset within the vertex.
    pub offset: u32,
}

impl VertexAttribute {
    /// Size of this attribute in bytes.
    pub const fn byte_size(&self) -> u32 {
        self.components as u32 * self.ty.byte_size()
    }
}

/// An ordered list of attributes; the stride is derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u32,
}

impl VertexLayout {
    /// Builds a layout from its attributes, deriving the stride as the end
    /// of the furthest attribute.
    pub fn new(attributes: Vec<VertexAttribute>) -> Self {
        let stride = attributes
            .iter()
            .map(|a| a.offset + a.byte_size())
            .max()
            .unwrap_or(0);
        Self { attributes, stride }
    }

    /// The attributes in declaration order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// The derived stride in bytes.
    pub fn stride(&self) -> u32 {
        self.stride
    }
}

/// One (buffer, layout) binding of a vertex array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    /// The bound vertex buffer.
    pub buffer: ResourceId,
    /// How its contents are laid out.
    pub layout: VertexLayout,
}

/// A vertex array descriptor: attribute bindings plus an optional index
/// buffer.
#[derive(Debug)]
pub struct VertexArrayDesc {
    id: ResourceId,
    bindings: Vec<VertexBinding>,
    index_buffer: Option<ResourceId>,
    expiration_secs: f64,
    generation: AtomicU64,
}

impl VertexArrayDesc {
    pub(crate) fn new(
        id: ResourceId,
        bindings: Vec<VertexBinding>,
        index_buffer: Option<ResourceId>,
        expiration_secs: f64,
    ) -> Self {
        Self {
            id,
            bindings,
            index_buffer,
            expiration_secs,
            generation: AtomicU64::new(1),
        }
    }

    /// The descriptor id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The attribute bindings.
    pub fn bindings(&self) -> &[VertexBinding] {
        &self.bindings
    }

    /// The bound index buffer, if any.
    pub fn index_buffer(&self) -> Option<ResourceId> {
        self.index_buffer
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_derived_from_furthest_attribute() {
        let layout = VertexLayout::new(vec![
            VertexAttribute {
                name: "position".into(),
                components: 3,
                ty: ComponentType::F32,
                normalized: false,
                offset: 0,
            },
            VertexAttribute {
                name: "uv".into(),
                components: 2,
                ty: ComponentType::U16,
                normalized: true,
                offset: 12,
            },
        ]);
        assert_eq!(layout.stride(), 16);
    }
}
