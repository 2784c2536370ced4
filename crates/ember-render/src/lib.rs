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

//! # Ember Render
//!
//! The render command pipeline: per-context recording of draws and
//! pipeline operations, shared ring buffers for transient per-draw data,
//! a per-thread cache mapping stable descriptors to GPU handles, and a
//! grouped replay that minimizes redundant binds. A headless recording
//! driver backs the tests.

#![warn(missing_docs)]

pub mod command;
pub mod context;
pub mod handle;
pub mod headless;
pub mod pool;
pub mod state;

pub use command::{MasterQueue, PipelineCmd, RenderCommand, StateKey, MAX_TEXTURE_UNITS};
pub use context::{DrawSpec, RenderContext, VertexData};
pub use handle::{BufferHandle, HandleCache};
pub use headless::{CallRecord, HeadlessDriver};
pub use pool::{RingAlloc, RingPools, MIN_SLAB_BYTES};
pub use state::StateCache;
