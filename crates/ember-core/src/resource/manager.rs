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

//! The process-wide resource registry.

use super::{
    AttachmentPoint, AttachmentRef, BufferDesc, BufferKind, FramebufferDesc, FramebufferKind,
    PixelFormat, ProgramDesc, RenderbufferDesc, ResourceId, ShaderSource, TextureDesc,
    TextureInit, UsageHint, VertexArrayDesc, VertexBinding,
};
use crate::math::Extent2D;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A registered descriptor of any subtype.
#[derive(Debug, Clone)]
pub enum AnyDesc {
    /// A buffer.
    Buffer(Arc<BufferDesc>),
    /// A texture.
    Texture(Arc<TextureDesc>),
    /// A vertex array.
    VertexArray(Arc<VertexArrayDesc>),
    /// A program.
    Program(Arc<ProgramDesc>),
    /// A framebuffer.
    Framebuffer(Arc<FramebufferDesc>),
    /// A renderbuffer.
    Renderbuffer(Arc<RenderbufferDesc>),
}

/// The process-wide registry of live resource descriptors.
///
/// Registration and release go through a single mutex; per-thread GPU caches
/// only consult the registry on creation, reconciliation, and reaping, never
/// per draw.
#[derive(Debug)]
pub struct ResourceManager {
    next_id: AtomicU64,
    inner: Mutex<HashMap<ResourceId, AnyDesc>>,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceManager {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            // Id 0 is the invalid sentinel.
            next_id: AtomicU64::new(1),
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn fresh_id(&self) -> ResourceId {
        ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn register(&self, id: ResourceId, desc: AnyDesc) {
        self.inner
            .lock()
            .expect("resource registry lock poisoned")
            .insert(id, desc);
    }

    /// Registers a buffer descriptor.
    pub fn create_buffer(
        &self,
        kind: BufferKind,
        size: usize,
        usage: UsageHint,
        expiration_secs: f64,
    ) -> Arc<BufferDesc> {
        let id = self.fresh_id();
        let desc = Arc::new(BufferDesc::new(id, kind, size, usage, expiration_secs));
        self.register(id, AnyDesc::Buffer(desc.clone()));
        desc
    }

    /// Registers a texture descriptor.
    pub fn create_texture(&self, init: TextureInit) -> Arc<TextureDesc> {
        let id = self.fresh_id();
        let desc = Arc::new(TextureDesc::new(id, init));
        self.register(id, AnyDesc::Texture(desc.clone()));
        desc
    }

    /// Registers a vertex array descriptor.
    pub fn create_vertex_array(
        &self,
        bindings: Vec<VertexBinding>,
        index_buffer: Option<ResourceId>,
        expiration_secs: f64,
    ) -> Arc<VertexArrayDesc> {
        let id = self.fresh_id();
        let desc = Arc::new(VertexArrayDesc::new(
            id,
            bindings,
            index_buffer,
            expiration_secs,
        ));
        self.register(id, AnyDesc::VertexArray(desc.clone()));
        desc
    }

    /// Registers a program descriptor.
    pub fn create_program(
        &self,
        stages: Vec<ShaderSource>,
        expiration_secs: f64,
    ) -> Arc<ProgramDesc> {
        let id = self.fresh_id();
        let desc = Arc::new(ProgramDesc::new(id, stages, expiration_secs));
        self.register(id, AnyDesc::Program(desc.clone()));
        desc
    }

    /// Registers a framebuffer descriptor.
    pub fn create_framebuffer(
        &self,
        kind: FramebufferKind,
        size: Extent2D,
        sample_count: u32,
        attachments: Vec<(AttachmentPoint, AttachmentRef)>,
        expiration_secs: f64,
    ) -> Arc<FramebufferDesc> {
        let id = self.fresh_id();
        let desc = Arc::new(FramebufferDesc::new(
            id,
            kind,
            size,
            sample_count,
            attachments,
            expiration_secs,
        ));
        self.register(id, AnyDesc::Framebuffer(desc.clone()));
        desc
    }

    /// Registers a renderbuffer descriptor.
    pub fn create_renderbuffer(
        &self,
        size: Extent2D,
        format: PixelFormat,
        sample_count: u32,
        expiration_secs: f64,
    ) -> Arc<RenderbufferDesc> {
        let id = self.fresh_id();
        let desc = Arc::new(RenderbufferDesc::new(
            id,
            size,
            format,
            sample_count,
            expiration_secs,
        ));
        self.register(id, AnyDesc::Renderbuffer(desc.clone()));
        desc
    }

    /// Releases a descriptor. Per-thread GPU handles for it are reaped on
    /// each thread's next purge pass. Releasing an unknown id is a warning,
    /// not an error.
    pub fn release(&self, id: ResourceId) -> bool {
        let removed = self
            .inner
            .lock()
            .expect("resource registry lock poisoned")
            .remove(&id)
            .is_some();
        if !removed {
            log::warn!("Releasing unregistered resource {id:?}");
        }
        removed
    }

    /// Whether the id is currently registered.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.inner
            .lock()
            .expect("resource registry lock poisoned")
            .contains_key(&id)
    }

    /// Number of live descriptors.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("resource registry lock poisoned")
            .len()
    }

    /// `true` when no descriptors are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up any descriptor.
    pub fn get(&self, id: ResourceId) -> Option<AnyDesc> {
        self.inner
            .lock()
            .expect("resource registry lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Looks up a buffer descriptor.
    pub fn buffer(&self, id: ResourceId) -> Option<Arc<BufferDesc>> {
        match self.get(id) {
            Some(AnyDesc::Buffer(desc)) => Some(desc),
            _ => None,
        }
    }

    /// Looks up a texture descriptor.
    pub fn texture(&self, id: ResourceId) -> Option<Arc<TextureDesc>> {
        match self.get(id) {
            Some(AnyDesc::Texture(desc)) => Some(desc),
            _ => None,
        }
    }

    /// Looks up a vertex array descriptor.
    pub fn vertex_array(&self, id: ResourceId) -> Option<Arc<VertexArrayDesc>> {
        match self.get(id) {
            Some(AnyDesc::VertexArray(desc)) => Some(desc),
            _ => None,
        }
    }

    /// Looks up a program descriptor.
    pub fn program(&self, id: ResourceId) -> Option<Arc<ProgramDesc>> {
        match self.get(id) {
            Some(AnyDesc::Program(desc)) => Some(desc),
            _ => None,
        }
    }

    /// Looks up a framebuffer descriptor.
    pub fn framebuffer(&self, id: ResourceId) -> Option<Arc<FramebufferDesc>> {
        match self.get(id) {
            Some(AnyDesc::Framebuffer(desc)) => Some(desc),
            _ => None,
        }
    }

    /// Looks up a renderbuffer descriptor.
    pub fn renderbuffer(&self, id: ResourceId) -> Option<Arc<RenderbufferDesc>> {
        match self.get(id) {
            Some(AnyDesc::Renderbuffer(desc)) => Some(desc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_monotonic() {
        let manager = ResourceManager::new();
        let a = manager.create_buffer(BufferKind::Vertex, 16, UsageHint::STATIC_DRAW, 0.0);
        let b = manager.create_buffer(BufferKind::Index, 16, UsageHint::STATIC_DRAW, 0.0);
        assert!(b.id().raw() > a.id().raw());
        assert!(!a.id().is_invalid());
    }

    #[test]
    fn release_forgets_the_descriptor() {
        let manager = ResourceManager::new();
        let buffer = manager.create_buffer(BufferKind::Vertex, 16, UsageHint::STATIC_DRAW, 0.0);
        assert!(manager.contains(buffer.id()));
        assert!(manager.release(buffer.id()));
        assert!(!manager.contains(buffer.id()));
        // Releasing again is a warning, not a panic.
        assert!(!manager.release(buffer.id()));
    }

    #[test]
    fn typed_lookup_rejects_wrong_subtype() {
        let manager = ResourceManager::new();
        let buffer = manager.create_buffer(BufferKind::Vertex, 16, UsageHint::STATIC_DRAW, 0.0);
        assert!(manager.buffer(buffer.id()).is_some());
        assert!(manager.texture(buffer.id()).is_none());
    }
}
