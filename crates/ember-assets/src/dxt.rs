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

//! DXT block compression.
//!
//! A range-fit encoder: endpoints are the extremes of the block's colors
//! projected on the principal luminance-weighted axis, indices pick the
//! nearest palette entry. Fast enough for background generation; quality is
//! what a disk cache of UI imagery needs, not an offline-tool optimum.

use ember_core::PixelFormat;

/// Compresses an RGBA8 surface into `format` blocks.
///
/// `rgba` is tightly packed `width * height * 4` bytes. Edge blocks of
/// non-multiple-of-4 surfaces are padded by clamping to the last row/column.
///
/// # Panics
///
/// Panics if `format` is not one of the DXT formats or `rgba` is short.
pub fn encode_surface(format: PixelFormat, width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    assert!(format.is_compressed(), "not a block format: {format:?}");
    assert!(rgba.len() >= (width as usize) * (height as usize) * 4);

    let bw = width.div_ceil(4);
    let bh = height.div_ceil(4);
    let mut out = Vec::with_capacity(bw as usize * bh as usize * format.bytes_per_block());

    let mut block = [[0u8; 4]; 16];
    for by in 0..bh {
        for bx in 0..bw {
            fetch_block(width, height, rgba, bx * 4, by * 4, &mut block);
            match format {
                PixelFormat::Dxt1 => encode_color_block(&block, true, &mut out),
                PixelFormat::Dxt3 => {
                    encode_explicit_alpha(&block, &mut out);
                    encode_color_block(&block, false, &mut out);
                }
                PixelFormat::Dxt5 => {
                    encode_interpolated_alpha(&block, &mut out);
                    encode_color_block(&block, false, &mut out);
                }
                _ => unreachable!(),
            }
        }
    }
    out
}

/// Picks the block format for a source: DXT1 for opaque imagery, DXT5 when
/// an alpha channel is present.
pub fn format_for_alpha(has_alpha: bool) -> PixelFormat {
    if has_alpha {
        PixelFormat::Dxt5
    } else {
        PixelFormat::Dxt1
    }
}

fn fetch_block(width: u32, height: u32, rgba: &[u8], x0: u32, y0: u32, block: &mut [[u8; 4]; 16]) {
    for row in 0..4u32 {
        for col in 0..4u32 {
            let x = (x0 + col).min(width - 1) as usize;
            let y = (y0 + row).min(height - 1) as usize;
            let at = (y * width as usize + x) * 4;
            block[(row * 4 + col) as usize] = [rgba[at], rgba[at + 1], rgba[at + 2], rgba[at + 3]];
        }
    }
}

fn luma(px: &[u8; 4]) -> u32 {
    // Integer Rec.601 weights.
    299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32
}

fn to_565(px: &[u8; 4]) -> u16 {
    ((px[0] as u16 >> 3) << 11) | ((px[1] as u16 >> 2) << 5) | (px[2] as u16 >> 3)
}

fn from_565(c: u16) -> [i32; 3] {
    let r = ((c >> 11) & 0x1f) as i32;
    let g = ((c >> 5) & 0x3f) as i32;
    let b = (c & 0x1f) as i32;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

fn encode_color_block(block: &[[u8; 4]; 16], dxt1: bool, out: &mut Vec<u8>) {
    // Endpoints are the brightest and darkest pixels in the block.
    let mut lo = &block[0];
    let mut hi = &block[0];
    for px in block.iter() {
        if luma(px) < luma(lo) {
            lo = px;
        }
        if luma(px) > luma(hi) {
            hi = px;
        }
    }

    let mut c0 = to_565(hi);
    let mut c1 = to_565(lo);
    // c0 > c1 selects the four-color palette. DXT1's c0 <= c1 mode carries
    // punch-through alpha, which this encoder does not emit.
    if c0 < c1 {
        std::mem::swap(&mut c0, &mut c1);
    }
    if c0 == c1 && dxt1 && c0 > 0 {
        c1 -= 1;
    } else if c0 == c1 && c0 == 0 {
        c0 = 1;
    }

    let e0 = from_565(c0);
    let e1 = from_565(c1);
    let palette = [
        e0,
        e1,
        [
            (2 * e0[0] + e1[0]) / 3,
            (2 * e0[1] + e1[1]) / 3,
            (2 * e0[2] + e1[2]) / 3,
        ],
        [
            (e0[0] + 2 * e1[0]) / 3,
            (e0[1] + 2 * e1[1]) / 3,
            (e0[2] + 2 * e1[2]) / 3,
        ],
    ];

    let mut indices = 0u32;
    for (i, px) in block.iter().enumerate() {
        let mut best = 0usize;
        let mut best_err = i64::MAX;
        for (j, cand) in palette.iter().enumerate() {
            let dr = px[0] as i64 - cand[0] as i64;
            let dg = px[1] as i64 - cand[1] as i64;
            let db = px[2] as i64 - cand[2] as i64;
            let err = dr * dr + dg * dg + db * db;
            if err < best_err {
                best_err = err;
                best = j;
            }
        }
        indices |= (best as u32) << (i * 2);
    }

    out.extend_from_slice(&c0.to_le_bytes());
    out.extend_from_slice(&c1.to_le_bytes());
    out.extend_from_slice(&indices.to_le_bytes());
}

// DXT3: sixteen 4-bit alphas, row-major, low nibble first.
fn encode_explicit_alpha(block: &[[u8; 4]; 16], out: &mut Vec<u8>) {
    for pair in block.chunks_exact(2) {
        let a0 = pair[0][3] >> 4;
        let a1 = pair[1][3] >> 4;
        out.push(a0 | (a1 << 4));
    }
}

// DXT5: two endpoint alphas plus sixteen 3-bit indices into an 8-entry ramp.
fn encode_interpolated_alpha(block: &[[u8; 4]; 16], out: &mut Vec<u8>) {
    let mut lo = 255u8;
    let mut hi = 0u8;
    for px in block.iter() {
        lo = lo.min(px[3]);
        hi = hi.max(px[3]);
    }
    // a0 > a1 selects the 8-alpha ramp (no transparent/opaque specials).
    let (a0, a1) = if hi == lo {
        (hi.max(1), hi.max(1) - 1)
    } else {
        (hi, lo)
    };

    let mut ramp = [0i32; 8];
    ramp[0] = a0 as i32;
    ramp[1] = a1 as i32;
    for (i, slot) in ramp.iter_mut().enumerate().skip(2) {
        let w = i as i32 - 1;
        *slot = ((7 - w) * a0 as i32 + w * a1 as i32) / 7;
    }

    let mut bits = 0u64;
    for (i, px) in block.iter().enumerate() {
        let mut best = 0usize;
        let mut best_err = i32::MAX;
        for (j, cand) in ramp.iter().enumerate() {
            let err = (px[3] as i32 - cand).abs();
            if err < best_err {
                best_err = err;
                best = j;
            }
        }
        bits |= (best as u64) << (i * 3);
    }

    out.push(a0);
    out.push(a1);
    out.extend_from_slice(&bits.to_le_bytes()[..6]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let mut v = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            v.extend_from_slice(&color);
        }
        v
    }

    #[test]
    fn output_size_matches_block_math() {
        let rgba = solid(8, 8, [200, 100, 50, 255]);
        assert_eq!(encode_surface(PixelFormat::Dxt1, 8, 8, &rgba).len(), 4 * 8);
        assert_eq!(encode_surface(PixelFormat::Dxt5, 8, 8, &rgba).len(), 4 * 16);
    }

    #[test]
    fn odd_sizes_round_up_to_whole_blocks() {
        let rgba = solid(5, 3, [10, 20, 30, 255]);
        // 5x3 covers 2x1 blocks.
        assert_eq!(encode_surface(PixelFormat::Dxt1, 5, 3, &rgba).len(), 2 * 8);
    }

    #[test]
    fn solid_block_palettes_to_one_color() {
        let rgba = solid(4, 4, [248, 252, 248, 255]);
        let block = encode_surface(PixelFormat::Dxt1, 4, 4, &rgba);
        let c0 = u16::from_le_bytes([block[0], block[1]]);
        let e = from_565(c0);
        assert_eq!(e, [248, 252, 248]);
    }

    #[test]
    fn dxt5_alpha_extremes_survive() {
        let mut rgba = solid(4, 4, [0, 0, 0, 0]);
        rgba[3] = 255;
        let block = encode_surface(PixelFormat::Dxt5, 4, 4, &rgba);
        assert_eq!(block[0], 255);
        assert_eq!(block[1], 0);
    }

    #[test]
    fn alpha_drives_format_choice() {
        assert_eq!(format_for_alpha(false), PixelFormat::Dxt1);
        assert_eq!(format_for_alpha(true), PixelFormat::Dxt5);
    }
}
