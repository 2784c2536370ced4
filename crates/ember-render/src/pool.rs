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

//! Shared ring buffer pools.
//!
//! Draw recording carves vertex, index and uniform storage out of large
//! stream-draw slabs, one pool per `(kind, stride)`. A slab tracks a
//! reservation mark that only ever advances within a frame; `flush` seals
//! the slabs that were written (bumping their descriptor generation so GPU
//! handles re-upload) and `rewind` resets every mark for the next frame.

use ahash::AHashMap;
use ember_core::resource::{BufferDesc, BufferKind, UsageHint};
use ember_core::ResourceManager;
use std::sync::Arc;

/// Minimum slab size. Allocations larger than this get a slab of their own.
pub const MIN_SLAB_BYTES: usize = 1 << 20;

/// One carved-out region of a slab.
#[derive(Debug, Clone)]
pub struct RingAlloc {
    /// The slab the region lives in.
    pub buffer: Arc<BufferDesc>,
    /// Byte offset of the region within the slab.
    pub offset_bytes: usize,
    /// Offset in stride units (vertex pools; equals `offset_bytes` for a
    /// stride of 1).
    pub offset_units: usize,
    /// Region length in bytes.
    pub len: usize,
}

impl RingAlloc {
    /// Writes `bytes` into the region (staging side; uploaded at flush).
    pub fn write(&self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.len);
        let mut view = self
            .buffer
            .map_range(self.offset_bytes..self.offset_bytes + bytes.len());
        view.copy_from_slice(bytes);
    }
}

struct Slab {
    desc: Arc<BufferDesc>,
    reserved: usize,
    // Whether anything was carved since the last flush.
    written: bool,
}

struct Pool {
    slabs: Vec<Slab>,
    current: usize,
}

/// All ring pools of one render context.
pub struct RingPools {
    resources: Arc<ResourceManager>,
    pools: AHashMap<(BufferKind, usize), Pool>,
    total_bytes: usize,
    growth_cap: usize,
}

impl RingPools {
    /// Creates empty pools. `growth_cap` bounds the summed slab bytes; once
    /// reached, allocations fail and the draw is dropped.
    pub fn new(resources: Arc<ResourceManager>, growth_cap: usize) -> Self {
        Self {
            resources,
            pools: AHashMap::new(),
            total_bytes: 0,
            growth_cap,
        }
    }

    /// Total bytes across all slabs.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Carves `count * stride` bytes from the `(kind, stride)` pool,
    /// aligning the start to `align` bytes (uniform pools pass the UBO
    /// offset alignment, vertex pools their stride).
    pub fn alloc(
        &mut self,
        kind: BufferKind,
        stride: usize,
        count: usize,
        align: usize,
    ) -> Option<RingAlloc> {
        let bytes = stride.checked_mul(count)?;
        if bytes == 0 {
            return None;
        }
        let align = align.max(1);

        let pool = self.pools.entry((kind, stride)).or_insert(Pool {
            slabs: Vec::new(),
            current: 0,
        });

        // Advance through existing slabs looking for room.
        while pool.current < pool.slabs.len() {
            let slab = &mut pool.slabs[pool.current];
            let start = slab.reserved.div_ceil(align) * align;
            if start + bytes <= slab.desc.size() {
                slab.reserved = start + bytes;
                slab.written = true;
                return Some(RingAlloc {
                    buffer: Arc::clone(&slab.desc),
                    offset_bytes: start,
                    offset_units: start / stride,
                    len: bytes,
                });
            }
            pool.current += 1;
        }

        // No slab fits; grow, within the cap.
        let slab_size = bytes.max(MIN_SLAB_BYTES);
        if self.total_bytes + slab_size > self.growth_cap {
            log::warn!(
                "Ring pool for {kind:?}/{stride} exhausted ({} of {} bytes); dropping draw.",
                self.total_bytes,
                self.growth_cap
            );
            return None;
        }
        let desc = self
            .resources
            .create_buffer(kind, slab_size, UsageHint::STREAM_DRAW, 0.0);
        self.total_bytes += slab_size;
        log::debug!("New {kind:?}/{stride} ring slab of {slab_size} bytes (id {:?}).", desc.id());
        pool.slabs.push(Slab {
            desc: Arc::clone(&desc),
            reserved: bytes,
            written: true,
        });
        pool.current = pool.slabs.len() - 1;
        Some(RingAlloc {
            buffer: desc,
            offset_bytes: 0,
            offset_units: 0,
            len: bytes,
        })
    }

    /// Seals every slab written this frame: bumps its generation so the
    /// handle cache uploads the staging bytes before replay.
    pub fn seal(&mut self) {
        for pool in self.pools.values_mut() {
            for slab in &mut pool.slabs {
                if slab.written {
                    slab.desc.touch();
                    slab.written = false;
                }
            }
        }
    }

    /// Rewinds every pool to the start; slabs are reused next frame.
    pub fn rewind(&mut self) {
        for pool in self.pools.values_mut() {
            for slab in &mut pool.slabs {
                slab.reserved = 0;
            }
            pool.current = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools(cap: usize) -> RingPools {
        RingPools::new(Arc::new(ResourceManager::new()), cap)
    }

    #[test]
    fn allocations_pack_into_one_slab() {
        let mut pools = pools(usize::MAX);
        let a = pools.alloc(BufferKind::Vertex, 16, 10, 16).unwrap();
        let b = pools.alloc(BufferKind::Vertex, 16, 10, 16).unwrap();
        assert_eq!(a.buffer.id(), b.buffer.id());
        assert_eq!(a.offset_units, 0);
        assert_eq!(b.offset_units, 10);
        assert_eq!(pools.total_bytes(), MIN_SLAB_BYTES);
    }

    #[test]
    fn separate_strides_get_separate_pools() {
        let mut pools = pools(usize::MAX);
        let a = pools.alloc(BufferKind::Vertex, 16, 4, 16).unwrap();
        let b = pools.alloc(BufferKind::Vertex, 32, 4, 32).unwrap();
        assert_ne!(a.buffer.id(), b.buffer.id());
    }

    #[test]
    fn uniform_allocations_respect_alignment() {
        let mut pools = pools(usize::MAX);
        let _ = pools.alloc(BufferKind::Uniform, 1, 100, 256).unwrap();
        let b = pools.alloc(BufferKind::Uniform, 1, 100, 256).unwrap();
        assert_eq!(b.offset_bytes % 256, 0);
        assert_eq!(b.offset_bytes, 256);
    }

    #[test]
    fn oversized_request_gets_its_own_slab() {
        let mut pools = pools(usize::MAX);
        let big = 3 * MIN_SLAB_BYTES;
        let a = pools.alloc(BufferKind::Vertex, 1, big, 1).unwrap();
        assert_eq!(a.len, big);
        assert_eq!(pools.total_bytes(), big);
    }

    #[test]
    fn growth_cap_drops_the_draw() {
        let mut pools = pools(MIN_SLAB_BYTES);
        assert!(pools.alloc(BufferKind::Vertex, 16, 8, 16).is_some());
        // A second slab would blow the cap.
        assert!(pools
            .alloc(BufferKind::Vertex, 16, MIN_SLAB_BYTES, 16)
            .is_none());
    }

    #[test]
    fn rewind_reuses_slabs() {
        let mut pools = pools(usize::MAX);
        let a = pools.alloc(BufferKind::Index, 4, 100, 4).unwrap();
        pools.seal();
        pools.rewind();
        let b = pools.alloc(BufferKind::Index, 4, 100, 4).unwrap();
        assert_eq!(a.buffer.id(), b.buffer.id());
        assert_eq!(b.offset_bytes, 0);
        assert_eq!(pools.total_bytes(), MIN_SLAB_BYTES);
    }

    #[test]
    fn seal_bumps_generation_once_per_written_slab() {
        let mut pools = pools(usize::MAX);
        let a = pools.alloc(BufferKind::Vertex, 16, 4, 16).unwrap();
        let before = a.buffer.generation();
        pools.seal();
        assert_eq!(a.buffer.generation(), before + 1);
        // Untouched slabs are not resealed.
        pools.rewind();
        pools.seal();
        assert_eq!(a.buffer.generation(), before + 1);
    }
}
