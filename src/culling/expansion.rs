//! Turns per-light tile ranges into per-tile light bit masks.

use crate::{
    core::{InclusiveRange, TileGrid},
    culling::zbin::light_bit,
    utils::parallel,
};

/// Lights gathered per pass over a row before bits are written.
const COMPACT_BATCH: usize = 64;

/// Writes the tile mask buffer, one task per tile row.
pub struct TileRangeExpander;

impl TileRangeExpander {
    /// Fills `masks` for `light_count` lights whose ranges were produced by
    /// [`ScreenTiler`](crate::culling::ScreenTiler). Each row task clears and
    /// writes only the `cols * words_per_tile` words of its row.
    pub fn expand(
        grid: &TileGrid,
        words_per_tile: usize,
        tile_ranges: &[InclusiveRange],
        light_count: usize,
        masks: &mut [u32],
        parallel: bool,
    ) {
        let row_words = grid.cols * words_per_tile;
        let used = (row_words * grid.rows).min(masks.len());
        parallel::for_each_chunk_mut(&mut masks[..used], row_words, parallel, |row, words| {
            Self::expand_row(grid, words_per_tile, tile_ranges, light_count, row, words);
        });
    }

    /// Clears one row, then sets the bit of every light whose range covers each tile.
    ///
    /// Lights touching the row are first compacted into a small stack batch, so
    /// the per-tile loop only visits lights that can actually hit the row.
    pub fn expand_row(
        grid: &TileGrid,
        words_per_tile: usize,
        tile_ranges: &[InclusiveRange],
        light_count: usize,
        row: usize,
        words: &mut [u32],
    ) {
        words.fill(0);
        let per_light = grid.ranges_per_light();
        let light_count = light_count.min(tile_ranges.len() / per_light);
        let row_index = row as i16;

        let mut batch = [(0usize, InclusiveRange::EMPTY); COMPACT_BATCH];
        let mut batched = 0;
        for light in 0..light_count {
            let base = light * per_light;
            if !tile_ranges[base].contains(row_index) {
                continue;
            }
            let columns = tile_ranges[base + 1 + row];
            if columns.is_empty() {
                continue;
            }
            batch[batched] = (light, columns);
            batched += 1;
            if batched == COMPACT_BATCH {
                Self::write_bits(&batch, words_per_tile, words);
                batched = 0;
            }
        }
        Self::write_bits(&batch[..batched], words_per_tile, words);
    }

    fn write_bits(lights: &[(usize, InclusiveRange)], words_per_tile: usize, words: &mut [u32]) {
        if lights.is_empty() {
            return;
        }
        for (col, tile) in words.chunks_exact_mut(words_per_tile).enumerate() {
            let col = col as i16;
            for &(light, columns) in lights {
                if columns.contains(col) {
                    let (word, bit) = light_bit(light);
                    tile[word] |= bit;
                }
            }
        }
    }
}
