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

//! An application-side bag of shared textures.
//!
//! Producers hand over a new shared handle whenever their surface resizes,
//! so at any moment a consumer may hold several generations. Selection
//! walks newest-first and draws with the first texture the bridge can
//! serve; stale generations age out.

use crate::texture::{BridgeTexture, SharedTexture};
use crate::traits::InteropContext;
use std::sync::{Arc, Mutex};

/// Seconds of disuse after which a non-newest texture is retired.
pub const RETIRE_AFTER_SECS: f64 = 3.0;

struct BagEntry {
    texture: Arc<SharedTexture>,
    last_used_secs: f64,
}

/// Holds every live shared-texture generation for one producer surface.
#[derive(Default)]
pub struct TextureBag {
    // Newest last; selection iterates in reverse.
    entries: Mutex<Vec<BagEntry>>,
}

impl TextureBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a freshly produced shared handle as the newest generation.
    pub fn add(&self, texture: Arc<SharedTexture>, now_secs: f64) {
        self.entries
            .lock()
            .expect("bag lock poisoned")
            .push(BagEntry {
                texture,
                last_used_secs: now_secs,
            });
    }

    /// Number of generations currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("bag lock poisoned").len()
    }

    /// Whether the bag holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Picks the newest texture the bridge can serve in `ctx` and marks it
    /// used. Older generations are left untouched so they age out.
    pub fn select(
        &self,
        ctx: &InteropContext,
        allow_copy: bool,
        now_secs: f64,
    ) -> Option<BridgeTexture> {
        let mut entries = self.entries.lock().expect("bag lock poisoned");
        for entry in entries.iter_mut().rev() {
            if let Some(bridged) = entry.texture.texture(ctx, allow_copy) {
                entry.last_used_secs = now_secs;
                return Some(bridged);
            }
        }
        None
    }

    /// Drops generations that are eligible for release: any texture whose
    /// size differs from the newest one, or that has gone unused for more
    /// than [`RETIRE_AFTER_SECS`]. The newest entry always survives.
    /// Returns how many were dropped.
    pub fn retire(&self, now_secs: f64) -> usize {
        let mut entries = self.entries.lock().expect("bag lock poisoned");
        let Some(newest_extent) = entries.last().map(|e| e.texture.surface().extent()) else {
            return 0;
        };
        let keep_index = entries.len() - 1;
        let before = entries.len();
        let mut index = 0;
        entries.retain(|entry| {
            let newest = index == keep_index;
            index += 1;
            if newest {
                return true;
            }
            let stale = entry.texture.surface().extent() != newest_extent
                || now_secs - entry.last_used_secs > RETIRE_AFTER_SECS;
            if stale {
                log::debug!("Retiring shared texture generation {:?}", entry.texture);
            }
            !stale
        });
        before - entries.len()
    }
}
