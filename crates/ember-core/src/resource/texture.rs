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

//! Texture descriptors, pixel formats, and sampler state.

use super::ResourceId;
use crate::math::{Extent3D, Rect};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// The internal pixel format of a texture or renderbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit single channel.
    R8,
    /// 8-bit two channel.
    Rg8,
    /// 24-bit RGB.
    Rgb8,
    /// 32-bit RGBA.
    Rgba8,
    /// 32-bit BGRA (the layout D3D shared surfaces arrive in).
    Bgra8,
    /// 64-bit half-float RGBA.
    Rgba16F,
    /// DXT1 block compression (opaque or 1-bit alpha).
    Dxt1,
    /// DXT3 block compression (explicit alpha).
    Dxt3,
    /// DXT5 block compression (interpolated alpha).
    Dxt5,
    /// Packed 24-bit depth + 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit float depth.
    Depth32F,
}

impl PixelFormat {
    /// Whether this is a block-compressed format.
    pub const fn is_compressed(&self) -> bool {
        matches!(self, Self::Dxt1 | Self::Dxt3 | Self::Dxt5)
    }

    /// Bytes per pixel for uncompressed formats, 0 for compressed ones.
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::R8 => 1,
            Self::Rg8 => 2,
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 | Self::Depth24Stencil8 | Self::Depth32F => 4,
            Self::Rgba16F => 8,
            Self::Dxt1 | Self::Dxt3 | Self::Dxt5 => 0,
        }
    }

    /// Bytes per 4x4 block for compressed formats, 0 otherwise.
    pub const fn bytes_per_block(&self) -> usize {
        match self {
            Self::Dxt1 => 8,
            Self::Dxt3 | Self::Dxt5 => 16,
            _ => 0,
        }
    }

    /// Storage size of a `width x height` image in this format.
    pub const fn surface_size(&self, width: u32, height: u32) -> usize {
        if self.is_compressed() {
            let bw = ((width + 3) / 4) as usize;
            let bh = ((height + 3) / 4) as usize;
            bw * bh * self.bytes_per_block()
        } else {
            width as usize * height as usize * self.bytes_per_pixel()
        }
    }
}

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    /// One-dimensional.
    D1,
    /// Two-dimensional.
    D2,
    /// Three-dimensional (volumetric).
    D3,
}

/// How texture coordinates outside `[0, 1]` resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Wrap around.
    Repeat,
    /// Clamp to the edge texel.
    ClampToEdge,
    /// Wrap, mirroring at integer boundaries.
    MirrorRepeat,
    /// Use the border color.
    ClampToBorder,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Bilinear.
    Linear,
}

/// Filtering between mipmap levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipFilter {
    /// Sample the base level only.
    None,
    /// Nearest level.
    Nearest,
    /// Trilinear blend between adjacent levels.
    Linear,
}

/// Sampling state applied when a texture is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Mip level filter.
    pub mip_filter: MipFilter,
    /// Horizontal address mode.
    pub wrap_u: AddressMode,
    /// Vertical address mode.
    pub wrap_v: AddressMode,
    /// Depth address mode (3D textures).
    pub wrap_w: AddressMode,
    /// Border color, RGBA, used with [`AddressMode::ClampToBorder`].
    pub border: [u8; 4],
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mip_filter: MipFilter::None,
            wrap_u: AddressMode::ClampToEdge,
            wrap_v: AddressMode::ClampToEdge,
            wrap_w: AddressMode::ClampToEdge,
            border: [0, 0, 0, 0],
        }
    }
}

/// Shared, immutable pixel storage a texture descriptor points at.
///
/// The descriptor does not own the pixels in the C++ sense; it shares them.
/// The reference count is what guarantees the data stays valid until every
/// descriptor and in-flight upload referencing it is gone.
#[derive(Debug, Clone)]
pub struct PixelSource(Arc<[u8]>);

impl PixelSource {
    /// Wraps a byte vector.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes.into_boxed_slice()))
    }

    /// The pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A changed region of a texture, pending upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    /// The changed rectangle.
    pub rect: Rect,
    /// The affected depth slice or array layer.
    pub layer: u32,
}

impl DirtyRegion {
    /// A region covering everything.
    pub const fn full() -> Self {
        Self {
            rect: Rect::new(0, 0, u32::MAX, u32::MAX),
            layer: 0,
        }
    }
}

// The dirty log is bounded; past this many pending regions the log collapses
// into a full re-upload.
const DIRTY_LOG_CAP: usize = 32;

#[derive(Debug)]
struct DirtyLog {
    // Handles whose seen generation is older than this must re-upload fully.
    full_since: u64,
    regions: Vec<(u64, DirtyRegion)>,
}

/// Construction parameters for a texture descriptor.
#[derive(Debug, Clone)]
pub struct TextureInit {
    /// Dimensionality.
    pub dimension: TextureDimension,
    /// Size in pixels (depth = 1 for 2D).
    pub size: Extent3D,
    /// Internal pixel format.
    pub format: PixelFormat,
    /// Sampler state.
    pub sampler: SamplerState,
    /// Samples per pixel (1 = no multisampling).
    pub sample_count: u32,
    /// Whether draws sampling this texture must go to the translucent queue.
    pub translucent: bool,
    /// Seconds of disuse before per-thread GPU handles are reaped
    /// (0 = persistent).
    pub expiration_secs: f64,
    /// Initial pixel data, if any.
    pub pixels: Option<PixelSource>,
    /// Line pitch in bytes; 0 means tightly packed.
    pub pitch: usize,
}

impl Default for TextureInit {
    fn default() -> Self {
        Self {
            dimension: TextureDimension::D2,
            size: Extent3D::new(0, 0, 1),
            format: PixelFormat::Rgba8,
            sampler: SamplerState::default(),
            sample_count: 1,
            translucent: false,
            expiration_secs: 0.0,
            pixels: None,
            pitch: 0,
        }
    }
}

/// A CPU-side texture descriptor.
#[derive(Debug)]
pub struct TextureDesc {
    id: ResourceId,
    dimension: TextureDimension,
    size: Extent3D,
    format: PixelFormat,
    sampler: SamplerState,
    sample_count: u32,
    translucent: bool,
    expiration_secs: f64,
    pitch: usize,
    generation: AtomicU64,
    pixels: Mutex<Option<PixelSource>>,
    dirty: Mutex<DirtyLog>,
}

impl TextureDesc {
    pub(crate) fn new(id: ResourceId, init: TextureInit) -> Self {
        Self {
            id,
            dimension: init.dimension,
            size: init.size,
            format: init.format,
            sampler: init.sampler,
            sample_count: init.sample_count,
            translucent: init.translucent,
            expiration_secs: init.expiration_secs,
            pitch: init.pitch,
            generation: AtomicU64::new(1),
            pixels: Mutex::new(init.pixels),
            dirty: Mutex::new(DirtyLog {
                full_since: 1,
                regions: Vec::new(),
            }),
        }
    }

    /// The descriptor id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Dimensionality.
    pub fn dimension(&self) -> TextureDimension {
        self.dimension
    }

    /// Size in pixels.
    pub fn size(&self) -> Extent3D {
        self.size
    }

    /// Internal pixel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Sampler state.
    pub fn sampler(&self) -> SamplerState {
        self.sampler
    }

    /// Samples per pixel.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Whether draws sampling this texture are translucent.
    pub fn translucent(&self) -> bool {
        self.translucent
    }

    /// Handle expiration window in seconds (0 = persistent).
    pub fn expiration_secs(&self) -> f64 {
        self.expiration_secs
    }

    /// Line pitch in bytes (0 = tight).
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The current pixel source, if any.
    pub fn pixels(&self) -> Option<PixelSource> {
        self.pixels.lock().expect("texture pixel lock poisoned").clone()
    }

    /// Replaces the pixel source entirely; every handle fully re-uploads.
    pub fn set_pixels(&self, pixels: PixelSource) {
        *self.pixels.lock().expect("texture pixel lock poisoned") = Some(pixels);
        let gen = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut log = self.dirty.lock().expect("texture dirty lock poisoned");
        log.full_since = gen;
        log.regions.clear();
    }

    /// Records a changed region within the existing pixel source.
    pub fn mark_dirty(&self, region: DirtyRegion) {
        let gen = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut log = self.dirty.lock().expect("texture dirty lock poisoned");
        if log.regions.len() >= DIRTY_LOG_CAP {
            log.full_since = gen;
            log.regions.clear();
        } else {
            log.regions.push((gen, region));
        }
    }

    /// The regions a handle that last uploaded at `seen_generation` must
    /// re-upload, or `None` for "everything".
    pub fn regions_since(&self, seen_generation: u64) -> Option<Vec<DirtyRegion>> {
        let log = self.dirty.lock().expect("texture dirty lock poisoned");
        if seen_generation < log.full_since {
            return None;
        }
        Some(
            log.regions
                .iter()
                .filter(|(gen, _)| *gen > seen_generation)
                .map(|(_, region)| *region)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> TextureDesc {
        TextureDesc::new(
            ResourceId(3),
            TextureInit {
                size: Extent3D::new(16, 16, 1),
                pixels: Some(PixelSource::from_vec(vec![0; 16 * 16 * 4])),
                ..TextureInit::default()
            },
        )
    }

    #[test]
    fn fresh_handle_uploads_fully() {
        let t = desc();
        assert_eq!(t.regions_since(0), None);
    }

    #[test]
    fn dirty_regions_accumulate_per_generation() {
        let t = desc();
        let seen = t.generation();
        t.mark_dirty(DirtyRegion {
            rect: Rect::new(0, 0, 4, 4),
            layer: 0,
        });
        t.mark_dirty(DirtyRegion {
            rect: Rect::new(4, 4, 4, 4),
            layer: 0,
        });
        let regions = t.regions_since(seen).expect("partial upload expected");
        assert_eq!(regions.len(), 2);
        // A handle that has seen the first region only needs the second.
        let regions = t.regions_since(seen + 1).expect("partial upload expected");
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn replacing_pixels_forces_full_upload() {
        let t = desc();
        let seen = t.generation();
        t.set_pixels(PixelSource::from_vec(vec![1; 16 * 16 * 4]));
        assert_eq!(t.regions_since(seen), None);
    }

    #[test]
    fn overflowing_the_log_collapses_to_full() {
        let t = desc();
        let seen = t.generation();
        for _ in 0..64 {
            t.mark_dirty(DirtyRegion::full());
        }
        assert_eq!(t.regions_since(seen), None);
    }

    #[test]
    fn compressed_surface_sizes_round_to_blocks() {
        assert_eq!(PixelFormat::Dxt1.surface_size(4, 4), 8);
        assert_eq!(PixelFormat::Dxt1.surface_size(5, 5), 8 * 4);
        assert_eq!(PixelFormat::Dxt5.surface_size(8, 4), 32);
        assert_eq!(PixelFormat::Rgba8.surface_size(3, 3), 36);
    }
}
