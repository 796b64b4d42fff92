//! Depth binning: one header word plus a light bit mask per Z-bin.

use crate::{
    config::{BITS_PER_WORD, ZBIN_BATCH_SIZE},
    core::{DepthRange, ViewContext},
    utils::parallel,
};

/// Header stored for a bin no light touched.
pub const EMPTY_HEADER: u32 = encode_header(u16::MAX, u16::MIN);

/// Packs the smallest and largest light index of a bin into one word.
pub const fn encode_header(min: u16, max: u16) -> u32 {
    (min as u32) | ((max as u32) << 16)
}

pub const fn decode_header(header: u32) -> (u16, u16) {
    ((header & 0xFFFF) as u16, (header >> 16) as u16)
}

/// Word index and bit of a light inside a mask.
#[inline]
pub fn light_bit(light_index: usize) -> (usize, u32) {
    (light_index / BITS_PER_WORD, 1u32 << (light_index % BITS_PER_WORD))
}

/// Depth to bin mapping and memory layout of the Z-bin buffer.
///
/// Perspective cameras bin `log2(depth)` to follow their non-uniform depth
/// precision; orthographic cameras bin depth linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZBinLayout {
    pub scale: f32,
    pub offset: f32,
    pub bin_count: usize,
    pub words_per_tile: usize,
    pub orthographic: bool,
}

impl ZBinLayout {
    /// Spreads `bin_count` bins between the view's near and far planes.
    ///
    /// # Panics
    /// Panics if `bin_count` or `words_per_tile` is zero.
    pub fn new(view: &ViewContext, bin_count: usize, words_per_tile: usize) -> Self {
        assert!(bin_count > 0, "bin budget must hold at least one bin");
        assert!(words_per_tile > 0, "bins need at least one mask word");
        // `culling_near` keeps a perspective near plane away from log2(0).
        let near = view.culling_near();
        let far = view.far.max(near * 2.0);
        let bins = bin_count as f32;
        let (scale, offset) = if view.is_orthographic() {
            let scale = bins / (far - near);
            (scale, -near * scale)
        } else {
            let scale = bins / (far / near).log2();
            (scale, -near.log2() * scale)
        };
        Self {
            scale,
            offset,
            bin_count,
            words_per_tile,
            orthographic: view.is_orthographic(),
        }
    }

    /// Words per bin: header plus mask.
    pub fn stride(&self) -> usize {
        1 + self.words_per_tile
    }

    pub fn word_count(&self) -> usize {
        self.bin_count * self.stride()
    }

    pub fn batch_count(&self) -> usize {
        self.bin_count.div_ceil(ZBIN_BATCH_SIZE)
    }

    /// Unclamped bin of a view-space depth. Depths at or behind the camera map
    /// to `i32::MIN` instead of taking `log2` of zero.
    pub fn bin_index(&self, depth: f32) -> i32 {
        let mapped = if self.orthographic {
            depth
        } else if depth > 0.0 {
            depth.log2()
        } else {
            return i32::MIN;
        };
        let bin = (mapped * self.scale + self.offset).floor();
        if bin.is_nan() {
            return i32::MIN;
        }
        bin as i32
    }
}

/// Fills the Z-bin buffer from per-light depth ranges.
pub struct DepthBinner;

impl DepthBinner {
    /// Clears and fills every bin of `bins`, one task per batch of
    /// [`ZBIN_BATCH_SIZE`] bins. Batches own disjoint slices of the buffer, so a
    /// light spanning several batches is written by several tasks without locks.
    pub fn bin(
        layout: &ZBinLayout,
        depth_ranges: &[DepthRange],
        bins: &mut [u32],
        parallel: bool,
    ) {
        let used = layout.word_count().min(bins.len());
        let batch_words = ZBIN_BATCH_SIZE * layout.stride();
        parallel::for_each_chunk_mut(&mut bins[..used], batch_words, parallel, |batch, words| {
            Self::fill_batch(layout, depth_ranges, batch, words);
        });
    }

    /// Clears one batch and sets the bits of every light overlapping it.
    pub fn fill_batch(
        layout: &ZBinLayout,
        depth_ranges: &[DepthRange],
        batch: usize,
        words: &mut [u32],
    ) {
        let stride = layout.stride();
        let batch_bins = words.len() / stride;
        if batch_bins == 0 {
            return;
        }
        let bin_start = (batch * ZBIN_BATCH_SIZE) as i32;
        let bin_end = bin_start + batch_bins as i32 - 1;

        for bin in words.chunks_exact_mut(stride) {
            bin[0] = EMPTY_HEADER;
            bin[1..].fill(0);
        }

        // Light indices past the 16-bit header range cannot be encoded.
        let light_count = depth_ranges.len().min(u16::MAX as usize);
        for (light_index, range) in depth_ranges[..light_count].iter().enumerate() {
            if range.is_empty() {
                continue;
            }
            let min_bin = layout.bin_index(range.min).max(bin_start);
            let max_bin = layout.bin_index(range.max).min(bin_end);
            if min_bin > max_bin {
                continue;
            }

            let (word_index, bit) = light_bit(light_index);
            let index = light_index as u16;
            for bin in min_bin..=max_bin {
                let base = (bin - bin_start) as usize * stride;
                let (lo, hi) = decode_header(words[base]);
                words[base] = encode_header(lo.min(index), hi.max(index));
                words[base + 1 + word_index] |= bit;
            }
        }
    }
}
