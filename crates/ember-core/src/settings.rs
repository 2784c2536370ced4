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

//! Global settings for the rendering core.

use serde::{Deserialize, Serialize};

/// A collection of global settings that affect the rendering core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Desired swap interval (0 = vsync off, 1 = on). Applying it is
    /// best-effort per platform.
    pub swap_interval: i32,
    /// Seconds of disuse after which a non-persistent GPU handle is reaped.
    pub handle_expiration_secs: f64,
    /// Period of the recurring mipmap level release task, in seconds.
    pub release_period_secs: f64,
    /// Whether mipmap sources without an on-disk chain get a DXT-compressed
    /// cache generated in the background.
    pub use_compressed_mipmaps: bool,
    /// Hard cap on ring-buffer slab growth, in bytes, before draws are
    /// dropped instead of allocating further.
    pub ring_growth_cap_bytes: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            swap_interval: 1,
            handle_expiration_secs: 30.0,
            release_period_secs: 5.0,
            use_compressed_mipmaps: true,
            ring_growth_cap_bytes: 256 << 20,
        }
    }
}
