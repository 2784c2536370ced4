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

//! DDS container read/write for the DXT disk cache.
//!
//! Only the subset the cache emits is handled: 2D surfaces, FourCC DXT1/3/5
//! pixel formats, optional mip chain, no DX10 extension header.

use crate::error::AssetError;
use ember_core::PixelFormat;
use std::io::Write;
use std::path::Path;

const MAGIC: u32 = 0x2053_4444; // "DDS "
const HEADER_SIZE: u32 = 124;
const PF_SIZE: u32 = 32;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;

const DDPF_FOURCC: u32 = 0x4;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;

const FOURCC_DXT1: u32 = u32::from_le_bytes(*b"DXT1");
const FOURCC_DXT3: u32 = u32::from_le_bytes(*b"DXT3");
const FOURCC_DXT5: u32 = u32::from_le_bytes(*b"DXT5");

/// An in-memory DDS file: one compressed surface per mip level, level 0
/// first, each level half the previous size (minimum 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsFile {
    /// The block format of every level.
    pub format: PixelFormat,
    /// Level 0 width in pixels.
    pub width: u32,
    /// Level 0 height in pixels.
    pub height: u32,
    /// Compressed payload per level.
    pub levels: Vec<Vec<u8>>,
}

impl DdsFile {
    /// The pixel extent of level `index`.
    pub fn level_extent(&self, index: u32) -> (u32, u32) {
        ((self.width >> index).max(1), (self.height >> index).max(1))
    }
}

fn fourcc_of(format: PixelFormat) -> Result<u32, AssetError> {
    match format {
        PixelFormat::Dxt1 => Ok(FOURCC_DXT1),
        PixelFormat::Dxt3 => Ok(FOURCC_DXT3),
        PixelFormat::Dxt5 => Ok(FOURCC_DXT5),
        other => Err(AssetError::Unsupported(format!(
            "dds cache only stores DXT formats, not {other:?}"
        ))),
    }
}

/// Writes `file` at `path`, creating parent directories as needed. The write
/// goes through a sibling temp name and a rename so readers never observe a
/// half-written entry.
pub fn write(path: &Path, file: &DdsFile) -> Result<(), AssetError> {
    let fourcc = fourcc_of(file.format)?;
    for (index, level) in file.levels.iter().enumerate() {
        let (w, h) = file.level_extent(index as u32);
        let expected = file.format.surface_size(w, h);
        if level.len() != expected {
            return Err(AssetError::InvalidContainer {
                path: path.to_path_buf(),
                reason: format!(
                    "level {index} payload is {} bytes, expected {expected}",
                    level.len()
                ),
            });
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AssetError::io(parent, e))?;
    }

    let mut header = Vec::with_capacity(128);
    let put = |buf: &mut Vec<u8>, v: u32| buf.extend_from_slice(&v.to_le_bytes());

    put(&mut header, MAGIC);
    put(&mut header, HEADER_SIZE);
    put(
        &mut header,
        DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | DDSD_MIPMAPCOUNT | DDSD_LINEARSIZE,
    );
    put(&mut header, file.height);
    put(&mut header, file.width);
    put(
        &mut header,
        file.format.surface_size(file.width, file.height) as u32,
    );
    put(&mut header, 0); // depth
    put(&mut header, file.levels.len() as u32);
    for _ in 0..11 {
        put(&mut header, 0); // reserved
    }
    // DDS_PIXELFORMAT
    put(&mut header, PF_SIZE);
    put(&mut header, DDPF_FOURCC);
    put(&mut header, fourcc);
    for _ in 0..5 {
        put(&mut header, 0); // rgb bit count / masks
    }
    let mut caps = DDSCAPS_TEXTURE;
    if file.levels.len() > 1 {
        caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
    }
    put(&mut header, caps);
    for _ in 0..4 {
        put(&mut header, 0); // caps2..4, reserved2
    }

    let tmp = path.with_extension("dds.tmp");
    let mut out = std::fs::File::create(&tmp).map_err(|e| AssetError::io(&tmp, e))?;
    out.write_all(&header).map_err(|e| AssetError::io(&tmp, e))?;
    for level in &file.levels {
        out.write_all(level).map_err(|e| AssetError::io(&tmp, e))?;
    }
    drop(out);
    std::fs::rename(&tmp, path).map_err(|e| AssetError::io(path, e))?;
    Ok(())
}

/// Reads a DDS cache entry back.
pub fn read(path: &Path) -> Result<DdsFile, AssetError> {
    let bytes = std::fs::read(path).map_err(|e| AssetError::io(path, e))?;
    let bad = |reason: &str| AssetError::InvalidContainer {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if bytes.len() < 128 {
        return Err(bad("shorter than the fixed header"));
    }
    let word = |at: usize| u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap());

    if word(0) != MAGIC {
        return Err(bad("missing 'DDS ' magic"));
    }
    if word(4) != HEADER_SIZE {
        return Err(bad("unexpected header size"));
    }
    let flags = word(8);
    if flags & (DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT)
        != DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT
    {
        return Err(bad("required header flags missing"));
    }
    let height = word(12);
    let width = word(16);
    let mip_count = if flags & DDSD_MIPMAPCOUNT != 0 {
        word(28).max(1)
    } else {
        1
    };
    if width == 0 || height == 0 {
        return Err(bad("degenerate surface size"));
    }

    let pf_flags = word(80);
    if pf_flags & DDPF_FOURCC == 0 {
        return Err(bad("cache entries must carry a FourCC format"));
    }
    let format = match word(84) {
        FOURCC_DXT1 => PixelFormat::Dxt1,
        FOURCC_DXT3 => PixelFormat::Dxt3,
        FOURCC_DXT5 => PixelFormat::Dxt5,
        _ => return Err(bad("unknown FourCC")),
    };

    let mut levels = Vec::with_capacity(mip_count as usize);
    let mut at = 128usize;
    for index in 0..mip_count {
        let w = (width >> index).max(1);
        let h = (height >> index).max(1);
        let size = format.surface_size(w, h);
        let end = at.checked_add(size).ok_or_else(|| bad("payload overflow"))?;
        if end > bytes.len() {
            return Err(bad("payload truncated"));
        }
        levels.push(bytes[at..end].to_vec());
        at = end;
    }

    Ok(DdsFile {
        format,
        width,
        height,
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dxt;

    #[test]
    fn round_trip_preserves_every_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aa").join("entry.dds");

        let mut levels = Vec::new();
        let (mut w, mut h) = (16u32, 8u32);
        loop {
            let rgba: Vec<u8> = (0..w * h)
                .flat_map(|i| [(i % 251) as u8, (i % 13) as u8, 7, 255])
                .collect();
            levels.push(dxt::encode_surface(PixelFormat::Dxt1, w, h, &rgba));
            if w == 1 && h == 1 {
                break;
            }
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        let file = DdsFile {
            format: PixelFormat::Dxt1,
            width: 16,
            height: 8,
            levels,
        };

        write(&path, &file).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.dds");
        let file = DdsFile {
            format: PixelFormat::Dxt5,
            width: 8,
            height: 8,
            levels: vec![vec![0u8; PixelFormat::Dxt5.surface_size(8, 8)]],
        };
        write(&path, &file).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();
        assert!(matches!(
            read(&path),
            Err(AssetError::InvalidContainer { .. })
        ));
    }

    #[test]
    fn wrong_payload_size_refuses_to_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.dds");
        let file = DdsFile {
            format: PixelFormat::Dxt1,
            width: 8,
            height: 8,
            levels: vec![vec![0u8; 3]],
        };
        assert!(matches!(
            write(&path, &file),
            Err(AssetError::InvalidContainer { .. })
        ));
    }
}
