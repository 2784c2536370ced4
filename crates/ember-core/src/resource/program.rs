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

//! Shader program descriptors.

use super::ResourceId;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
    /// Geometry shader.
    Geometry,
}

/// One stage's source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    /// The stage this source compiles as.
    pub stage: ShaderStage,
    /// GLSL source text.
    pub source: String,
}

/// A shader program descriptor: a set of stages plus a content hash that
/// identifies the compiled artifact (e.g. for binary caches).
#[derive(Debug)]
pub struct ProgramDesc {
    id: ResourceId,
    stages: Vec<ShaderSource>,
    content_hash: u64,
    expiration_secs: f64,
    generation: AtomicU64,
}

impl ProgramDesc {
    pub(crate) fn new(id: ResourceId, stages: Vec<ShaderSource>, expiration_secs: f64) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        stages.hash(&mut hasher);
        Self {
            id,
            stages,
            content_hash: hasher.finish(),
            expiration_secs,
            generation: AtomicU64::new(1),
        }
    }

    /// The descriptor id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The stages making up the program.
    pub fn stages(&self) -> &[ShaderSource] {
        &self.stages
    }

    /// A hash over all stage sources.
    pub fn content_hash(&self) -> u64 {
        self.content_hash
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
