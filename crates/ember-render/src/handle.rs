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

//! The per-thread GPU handle cache.
//!
//! Bridges stable descriptors to ephemeral GPU handles: created lazily on
//! first use, refreshed when the descriptor's generation moves forward,
//! reaped when the descriptor is released or the handle sits idle past its
//! expiration window. Buffer handles are shared (`Arc`) so a vertex array
//! keeps its buffers alive past application release until the VAO itself
//! goes.
//!
//! Creation or upload failures mark the handle invalid; draws referencing
//! it are skipped instead of crashing, and the failure is logged once.

use ahash::AHashMap;
use ember_core::resource::{
    AttachmentRef, BufferDesc, DirtyRegion, FramebufferDesc, FramebufferKind, ProgramDesc,
    RenderbufferDesc, TextureDesc, VertexArrayDesc,
};
use ember_core::{
    FrameClock, GlDriver, RawAttachment, RawFramebuffer, RawProgram, RawRenderbuffer, RawTexture,
    RawVertexArray, ResourceId, ResourceManager,
};
use std::sync::Arc;

/// A shared GPU buffer handle. Vertex arrays hold clones so the underlying
/// GL buffer outlives the descriptor when a VAO still references it.
#[derive(Debug)]
pub struct BufferHandle {
    raw: ember_core::RawBuffer,
}

impl BufferHandle {
    /// The GL buffer name.
    pub fn raw(&self) -> ember_core::RawBuffer {
        self.raw
    }
}

struct Entry<H> {
    handle: Option<H>, // None = creation failed, draws skip
    generation: u64,
    last_used: f64,
    expiration: f64,
}

impl<H> Entry<H> {
    fn expired(&self, now: f64) -> bool {
        self.expiration > 0.0 && now - self.last_used > self.expiration
    }
}

/// The cache itself. One per render context; never crosses threads.
pub struct HandleCache {
    resources: Arc<ResourceManager>,
    clock: Arc<FrameClock>,
    buffers: AHashMap<ResourceId, Entry<Arc<BufferHandle>>>,
    textures: AHashMap<ResourceId, Entry<RawTexture>>,
    programs: AHashMap<ResourceId, Entry<RawProgram>>,
    vertex_arrays: AHashMap<ResourceId, Entry<(RawVertexArray, Vec<Arc<BufferHandle>>)>>,
    framebuffers: AHashMap<ResourceId, Entry<RawFramebuffer>>,
    renderbuffers: AHashMap<ResourceId, Entry<RawRenderbuffer>>,
    // Buffer handles whose descriptor is gone but that a VAO still pins.
    orphans: Vec<Arc<BufferHandle>>,
}

impl HandleCache {
    /// Creates an empty cache.
    pub fn new(resources: Arc<ResourceManager>, clock: Arc<FrameClock>) -> Self {
        Self {
            resources,
            clock,
            buffers: AHashMap::new(),
            textures: AHashMap::new(),
            programs: AHashMap::new(),
            vertex_arrays: AHashMap::new(),
            framebuffers: AHashMap::new(),
            renderbuffers: AHashMap::new(),
            orphans: Vec::new(),
        }
    }

    /// The GPU handle for a buffer descriptor, creating or re-uploading as
    /// needed. `None` when creation has failed.
    pub fn buffer(
        &mut self,
        driver: &mut dyn GlDriver,
        desc: &Arc<BufferDesc>,
    ) -> Option<Arc<BufferHandle>> {
        let now = self.clock.now_secs();
        let generation = desc.generation();

        if let Some(entry) = self.buffers.get_mut(&desc.id()) {
            entry.last_used = now;
            let handle = entry.handle.clone()?;
            if entry.generation < generation {
                let staging = desc.staging();
                if let Err(e) = driver.upload_buffer(handle.raw, desc.kind(), 0, &staging) {
                    log::error!("Buffer {:?} upload failed: {e}", desc.id());
                    entry.handle = None;
                    return None;
                }
                entry.generation = generation;
            }
            return Some(handle);
        }

        let created = driver
            .create_buffer(desc.kind(), desc.size(), desc.usage())
            .and_then(|raw| {
                let staging = desc.staging();
                driver.upload_buffer(raw, desc.kind(), 0, &staging)?;
                Ok(raw)
            });
        let handle = match created {
            Ok(raw) => Some(Arc::new(BufferHandle { raw })),
            Err(e) => {
                log::error!("Buffer {:?} creation failed: {e}", desc.id());
                None
            }
        };
        self.buffers.insert(
            desc.id(),
            Entry {
                handle: handle.clone(),
                generation,
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
        handle
    }

    /// The GPU handle for a texture descriptor. Dirty regions recorded since
    /// the handle's generation are re-uploaded; if the log overflowed, the
    /// whole texture is.
    pub fn texture(
        &mut self,
        driver: &mut dyn GlDriver,
        desc: &Arc<TextureDesc>,
    ) -> Option<RawTexture> {
        let now = self.clock.now_secs();
        let generation = desc.generation();

        if let Some(entry) = self.textures.get_mut(&desc.id()) {
            entry.last_used = now;
            let raw = entry.handle?;
            if entry.generation < generation {
                if let Some(pixels) = desc.pixels() {
                    let regions = desc
                        .regions_since(entry.generation)
                        .unwrap_or_else(|| vec![DirtyRegion::full()]);
                    for region in regions {
                        if let Err(e) =
                            driver.upload_texture(raw, desc, region, pixels.as_bytes())
                        {
                            log::error!("Texture {:?} upload failed: {e}", desc.id());
                            entry.handle = None;
                            return None;
                        }
                    }
                }
                entry.generation = generation;
            }
            return Some(raw);
        }

        let created = driver.create_texture(desc).and_then(|raw| {
            if let Some(pixels) = desc.pixels() {
                driver.upload_texture(raw, desc, DirtyRegion::full(), pixels.as_bytes())?;
            }
            Ok(raw)
        });
        let handle = match created {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::error!("Texture {:?} creation failed: {e}", desc.id());
                None
            }
        };
        self.textures.insert(
            desc.id(),
            Entry {
                handle,
                generation,
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
        handle
    }

    /// The GPU handle for a program descriptor. Programs recompile when the
    /// descriptor's content hash moves.
    pub fn program(
        &mut self,
        driver: &mut dyn GlDriver,
        desc: &Arc<ProgramDesc>,
    ) -> Option<RawProgram> {
        let now = self.clock.now_secs();
        let generation = desc.content_hash();

        if let Some(entry) = self.programs.get_mut(&desc.id()) {
            entry.last_used = now;
            if entry.generation == generation {
                return entry.handle;
            }
            if let Some(old) = entry.handle.take() {
                driver.delete_program(old);
            }
            self.programs.remove(&desc.id());
        }

        let handle = match driver.create_program(desc) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::error!("Program {:?} failed to build: {e}", desc.id());
                None
            }
        };
        self.programs.insert(
            desc.id(),
            Entry {
                handle,
                generation,
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
        handle
    }

    /// The GPU handle for a vertex array descriptor. Builds (and pins) the
    /// underlying buffer handles first.
    pub fn vertex_array(
        &mut self,
        driver: &mut dyn GlDriver,
        desc: &Arc<VertexArrayDesc>,
    ) -> Option<RawVertexArray> {
        let now = self.clock.now_secs();

        if let Some(entry) = self.vertex_arrays.get_mut(&desc.id()) {
            entry.last_used = now;
            let raw = entry.handle.as_ref().map(|(raw, _)| *raw);
            if raw.is_some() {
                // Revalidate the bound buffers so staged content changes
                // still upload through a cached VAO.
                for binding in desc.bindings() {
                    if let Some(buffer_desc) = self.resources.buffer(binding.buffer) {
                        let _ = self.buffer(driver, &buffer_desc);
                    }
                }
                if let Some(id) = desc.index_buffer() {
                    if let Some(buffer_desc) = self.resources.buffer(id) {
                        let _ = self.buffer(driver, &buffer_desc);
                    }
                }
            }
            return raw;
        }

        let mut pinned = Vec::new();
        let mut resolved = Vec::new();
        for binding in desc.bindings() {
            let Some(buffer_desc) = self.resources.buffer(binding.buffer) else {
                log::error!(
                    "Vertex array {:?} references unknown buffer {:?}",
                    desc.id(),
                    binding.buffer
                );
                self.insert_failed_vao(desc, now);
                return None;
            };
            let Some(handle) = self.buffer(driver, &buffer_desc) else {
                self.insert_failed_vao(desc, now);
                return None;
            };
            resolved.push((handle.raw(), &binding.layout));
            pinned.push(handle);
        }
        let index_raw = match desc.index_buffer() {
            Some(id) => {
                let Some(buffer_desc) = self.resources.buffer(id) else {
                    log::error!("Vertex array {:?} references unknown index buffer {:?}", desc.id(), id);
                    self.insert_failed_vao(desc, now);
                    return None;
                };
                let Some(handle) = self.buffer(driver, &buffer_desc) else {
                    self.insert_failed_vao(desc, now);
                    return None;
                };
                let raw = handle.raw();
                pinned.push(handle);
                Some(raw)
            }
            None => None,
        };

        let handle = match driver.create_vertex_array(&resolved, index_raw) {
            Ok(raw) => Some((raw, pinned)),
            Err(e) => {
                log::error!("Vertex array {:?} creation failed: {e}", desc.id());
                None
            }
        };
        let raw = handle.as_ref().map(|(raw, _)| *raw);
        self.vertex_arrays.insert(
            desc.id(),
            Entry {
                handle,
                generation: desc.generation(),
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
        raw
    }

    /// The GPU handle for a renderbuffer descriptor.
    pub fn renderbuffer(
        &mut self,
        driver: &mut dyn GlDriver,
        desc: &Arc<RenderbufferDesc>,
    ) -> Option<RawRenderbuffer> {
        let now = self.clock.now_secs();
        if let Some(entry) = self.renderbuffers.get_mut(&desc.id()) {
            entry.last_used = now;
            return entry.handle;
        }
        let handle =
            match driver.create_renderbuffer(desc.size(), desc.format(), desc.sample_count()) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    log::error!("Renderbuffer {:?} creation failed: {e}", desc.id());
                    None
                }
            };
        self.renderbuffers.insert(
            desc.id(),
            Entry {
                handle,
                generation: desc.generation(),
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
        handle
    }

    /// The GPU handle for a framebuffer descriptor. `Ok(None)` is the
    /// window's default framebuffer; a failed offscreen build yields
    /// `Err(())` so replay can skip the segment's draws.
    pub fn framebuffer(
        &mut self,
        driver: &mut dyn GlDriver,
        desc: &Arc<FramebufferDesc>,
    ) -> Result<Option<RawFramebuffer>, ()> {
        if desc.kind() == FramebufferKind::Window {
            return Ok(None);
        }
        let now = self.clock.now_secs();
        if let Some(entry) = self.framebuffers.get_mut(&desc.id()) {
            entry.last_used = now;
            return entry.handle.map(Some).ok_or(());
        }

        let mut resolved = Vec::new();
        for (point, attachment) in desc.attachments() {
            let raw = match attachment {
                AttachmentRef::Texture(id) => {
                    let Some(texture_desc) = self.resources.texture(*id) else {
                        log::error!(
                            "Framebuffer {:?} references unknown texture {:?}",
                            desc.id(),
                            id
                        );
                        self.insert_failed_framebuffer(desc, now);
                        return Err(());
                    };
                    let Some(raw) = self.texture(driver, &texture_desc) else {
                        self.insert_failed_framebuffer(desc, now);
                        return Err(());
                    };
                    RawAttachment::Texture(raw)
                }
                AttachmentRef::Renderbuffer(id) => {
                    let Some(rb_desc) = self.resources.renderbuffer(*id) else {
                        log::error!(
                            "Framebuffer {:?} references unknown renderbuffer {:?}",
                            desc.id(),
                            id
                        );
                        self.insert_failed_framebuffer(desc, now);
                        return Err(());
                    };
                    let Some(raw) = self.renderbuffer(driver, &rb_desc) else {
                        self.insert_failed_framebuffer(desc, now);
                        return Err(());
                    };
                    RawAttachment::Renderbuffer(raw)
                }
            };
            resolved.push((*point, raw));
        }

        let handle = match driver.create_framebuffer(&resolved) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::error!("Framebuffer {:?} is incomplete: {e}", desc.id());
                None
            }
        };
        self.framebuffers.insert(
            desc.id(),
            Entry {
                handle,
                generation: desc.generation(),
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
        handle.map(Some).ok_or(())
    }

    fn insert_failed_framebuffer(&mut self, desc: &Arc<FramebufferDesc>, now: f64) {
        self.framebuffers.insert(
            desc.id(),
            Entry {
                handle: None,
                generation: desc.generation(),
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
    }

    fn insert_failed_vao(&mut self, desc: &Arc<VertexArrayDesc>, now: f64) {
        self.vertex_arrays.insert(
            desc.id(),
            Entry {
                handle: None,
                generation: desc.generation(),
                last_used: now,
                expiration: desc.expiration_secs(),
            },
        );
    }

    /// Number of live buffer entries (tests).
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live vertex array entries (tests).
    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Walks every map and erases handles whose descriptor has been
    /// released or whose expiration window has passed. Vertex arrays go
    /// first so the buffers they pinned can be collected in the same pass.
    pub fn reap(&mut self, driver: &mut dyn GlDriver) {
        let now = self.clock.now_secs();
        let resources = Arc::clone(&self.resources);

        self.framebuffers.retain(|id, entry| {
            let keep = resources.contains(*id) && !entry.expired(now);
            if !keep {
                if let Some(raw) = entry.handle.take() {
                    driver.delete_framebuffer(raw);
                }
            }
            keep
        });

        self.renderbuffers.retain(|id, entry| {
            let keep = resources.contains(*id) && !entry.expired(now);
            if !keep {
                if let Some(raw) = entry.handle.take() {
                    driver.delete_renderbuffer(raw);
                }
            }
            keep
        });

        self.vertex_arrays.retain(|id, entry| {
            let keep = resources.contains(*id) && !entry.expired(now);
            if !keep {
                if let Some((raw, _pinned)) = entry.handle.take() {
                    driver.delete_vertex_array(raw);
                }
            }
            keep
        });

        let orphans = &mut self.orphans;
        self.buffers.retain(|id, entry| {
            let keep = resources.contains(*id) && !entry.expired(now);
            if !keep {
                if let Some(handle) = entry.handle.take() {
                    orphans.push(handle);
                }
            }
            keep
        });
        // Orphans still pinned by a VAO stay until the VAO goes.
        self.orphans.retain(|handle| {
            if Arc::strong_count(handle) == 1 {
                driver.delete_buffer(handle.raw);
                false
            } else {
                true
            }
        });

        self.textures.retain(|id, entry| {
            let keep = resources.contains(*id) && !entry.expired(now);
            if !keep {
                if let Some(raw) = entry.handle.take() {
                    driver.delete_texture(raw);
                }
            }
            keep
        });

        self.programs.retain(|id, entry| {
            let keep = resources.contains(*id) && !entry.expired(now);
            if !keep {
                if let Some(raw) = entry.handle.take() {
                    driver.delete_program(raw);
                }
            }
            keep
        });
    }
}
