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

//! CPU-side resource descriptors and the process-wide registry.
//!
//! A descriptor is the stable, application-facing identity of a GPU
//! resource: a monotonic id, a generation counter that invalidates GPU-side
//! caches on every content change, and an expiration window after which idle
//! per-thread GPU handles are reaped (0 = persistent). The GPU-side
//! counterparts live in the render crate's per-thread handle cache and are
//! reconciled against these descriptors by comparing generations.

mod buffer;
mod framebuffer;
mod id;
mod manager;
mod program;
mod texture;
mod vertex;

pub use buffer::{BufferDesc, BufferKind, BufferWriter, UsageFrequency, UsageHint, UsageNature};
pub use framebuffer::{
    AttachmentPoint, AttachmentRef, FramebufferDesc, FramebufferKind, RenderbufferDesc,
};
pub use id::ResourceId;
pub use manager::{AnyDesc, ResourceManager};
pub use program::{ProgramDesc, ShaderSource, ShaderStage};
pub use texture::{
    AddressMode, DirtyRegion, FilterMode, MipFilter, PixelFormat, PixelSource, SamplerState,
    TextureDesc, TextureDimension, TextureInit,
};
pub use vertex::{ComponentType, VertexArrayDesc, VertexAttribute, VertexBinding, VertexLayout};
