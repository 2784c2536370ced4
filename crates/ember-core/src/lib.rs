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

//! # Ember Core
//!
//! Foundational crate for the Ember rendering-and-asset engine core. It
//! defines the stable CPU-side resource descriptors, the process-wide
//! resource registry, the graphics driver contract implemented by concrete
//! backends, the fixed-function pipeline state types replayed by the render
//! command pipeline, and the small shared services (frame clock, after-flush
//! executor) the other crates build on.

#![warn(missing_docs)]

pub mod clock;
pub mod driver;
pub mod error;
pub mod executor;
pub mod math;
pub mod pipeline;
pub mod resource;
pub mod settings;
pub mod utils;

pub use clock::FrameClock;
pub use driver::{
    DrawParams, GlDriver, RawAttachment, RawBuffer, RawFramebuffer, RawProgram, RawRenderbuffer,
    RawTexture, RawVertexArray,
};
pub use error::{DriverError, ResourceError};
pub use executor::{AfterFlushQueue, AfterFlushSender, GlTask};
pub use math::{Extent2D, Extent3D, Rect};
pub use resource::{PixelFormat, ResourceId, ResourceManager};
pub use settings::RenderSettings;
