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

//! Buffer descriptors.

use super::ResourceId;
use std::ops::{Deref, DerefMut, Range};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// What a buffer binds as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Vertex attribute storage.
    Vertex,
    /// Index storage.
    Index,
    /// Uniform block storage.
    Uniform,
}

/// How often the contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageFrequency {
    /// Written once, used many times.
    Static,
    /// Rewritten roughly every frame.
    Stream,
    /// Rewritten repeatedly within a frame.
    Dynamic,
}

/// What the contents are used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageNature {
    /// Sourced by draw commands.
    Draw,
    /// Read back by the application.
    Read,
    /// Copied between GPU resources.
    Copy,
}

/// The full usage hint (`frequency × nature`), mirroring the GL usage matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsageHint {
    /// Update frequency.
    pub frequency: UsageFrequency,
    /// Access nature.
    pub nature: UsageNature,
}

impl UsageHint {
    /// `STATIC_DRAW`.
    pub const STATIC_DRAW: Self = Self {
        frequency: UsageFrequency::Static,
        nature: UsageNature::Draw,
    };
    /// `STREAM_DRAW` — the hint the shared ring buffer slabs use.
    pub const STREAM_DRAW: Self = Self {
        frequency: UsageFrequency::Stream,
        nature: UsageNature::Draw,
    };
    /// `DYNAMIC_DRAW`.
    pub const DYNAMIC_DRAW: Self = Self {
        frequency: UsageFrequency::Dynamic,
        nature: UsageNature::Draw,
    };
}

/// A CPU-side buffer descriptor with staging storage.
///
/// Application threads write into the staging storage through
/// [`map_range`](Self::map_range); bumping the generation afterwards is what
/// makes per-thread GPU handles re-upload on next use.
#[derive(Debug)]
pub struct BufferDesc {
    id: ResourceId,
    kind: BufferKind,
    usage: UsageHint,
    size: usize,
    expiration_secs: f64,
    generation: AtomicU64,
    data: Mutex<Vec<u8>>,
}

impl BufferDesc {
    pub(crate) fn new(
        id: ResourceId,
        kind: BufferKind,
        size: usize,
        usage: UsageHint,
        expiration_secs: f64,
    ) -> Self {
        Self {
            id,
            kind,
            usage,
            size,
            expiration_secs,
            generation: AtomicU64::new(1),
            data: Mutex::new(vec![0; size]),
        }
    }

    /// The descriptor id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The binding kind.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Total capacity in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The usage hint passed to the driver at handle creation.
    pub fn usage(&self) -> UsageHint {
        self.usage
    }

    /// Seconds of disuse before a per-thread GPU handle may be reaped
    /// (0 = persistent).
    pub fn expiration_secs(&self) -> f64 {
        self.expiration_secs
    }

    /// The current generation. GPU handles cache the generation they last
    /// uploaded and revalidate against this.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Marks the contents changed so GPU-side caches re-upload.
    pub fn touch(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns a writable view of `range` within the staging storage.
    ///
    /// The caller is expected to [`touch`](Self::touch) once it has finished
    /// a batch of writes; the ring buffer pools do this in `flush`.
    pub fn map_range(&self, range: Range<usize>) -> BufferWriter<'_> {
        debug_assert!(range.end <= self.size);
        BufferWriter {
            guard: self.data.lock().expect("buffer staging lock poisoned"),
            range,
        }
    }

    /// Copies `bytes` into the staging storage at `offset` and bumps the
    /// generation.
    pub fn write(&self, offset: usize, bytes: &[u8]) {
        {
            let mut data = self.data.lock().expect("buffer staging lock poisoned");
            data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        self.touch();
    }

    /// Copies a plain-old-data slice into the staging storage at `offset`
    /// and bumps the generation.
    pub fn write_slice<T: bytemuck::NoUninit>(&self, offset: usize, items: &[T]) {
        self.write(offset, bytemuck::cast_slice(items));
    }

    /// Locks the whole staging storage for reading (upload paths).
    pub fn staging(&self) -> MutexGuard<'_, Vec<u8>> {
        self.data.lock().expect("buffer staging lock poisoned")
    }
}

/// A locked, writable sub-range of a buffer's staging storage.
pub struct BufferWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
    range: Range<usize>,
}

impl Deref for BufferWriter<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.guard[self.range.clone()]
    }
}

impl DerefMut for BufferWriter<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.guard[self.range.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_moves_on_write() {
        let desc = BufferDesc::new(
            ResourceId(7),
            BufferKind::Vertex,
            64,
            UsageHint::STREAM_DRAW,
            0.0,
        );
        let g0 = desc.generation();
        desc.write(16, &[1, 2, 3, 4]);
        assert!(desc.generation() > g0);
        assert_eq!(&desc.staging()[16..20], &[1, 2, 3, 4]);
    }

    #[test]
    fn map_range_exposes_only_the_range() {
        let desc = BufferDesc::new(
            ResourceId(8),
            BufferKind::Uniform,
            32,
            UsageHint::STREAM_DRAW,
            0.0,
        );
        {
            let mut w = desc.map_range(8..12);
            assert_eq!(w.len(), 4);
            w.copy_from_slice(&[9, 9, 9, 9]);
        }
        assert_eq!(&desc.staging()[8..12], &[9, 9, 9, 9]);
    }
}
