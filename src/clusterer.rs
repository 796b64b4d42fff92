//! Frame orchestration: runs the culling phases over recycled buffers and
//! publishes them, with the scalar parameters the shading stage needs.

use std::time::{Duration, Instant};

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use log::debug;

use crate::{
    config::{ClusteringMode, LightClusterConfig, BITS_PER_WORD},
    core::{DepthRange, InclusiveRange, LightDescriptor, TileGrid, ViewContext},
    culling::{
        decode_header, light_bit, DepthBinner, LightBoundsExtractor, ScreenTiler,
        TileRangeExpander, ZBinLayout,
    },
    utils::{
        logging::{ScopedTimer, TruncationLog},
        parallel,
        profiling::CullingProfiler,
        WorkerPool,
    },
};

/// Set in [`FrameParams::flags`] when depth bins are linear.
pub const FLAG_ORTHOGRAPHIC: u32 = 1 << 0;
/// Set in [`FrameParams::flags`] when no bins or masks were produced.
pub const FLAG_BRUTE_FORCE: u32 = 1 << 1;

/// Scalars uploaded next to the bin and mask buffers, laid out for a uniform block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameParams {
    pub zbin_scale: f32,
    pub zbin_offset: f32,
    /// Viewport size in tiles.
    pub tile_scale: [f32; 2],
    pub tile_resolution: [u32; 2],
    pub tile_width: u32,
    pub words_per_tile: u32,
    pub bin_count: u32,
    pub light_count: u32,
    pub flags: u32,
    pub _padding: u32,
}

impl FrameParams {
    fn binned(grid: &TileGrid, layout: &ZBinLayout, light_count: usize) -> Self {
        Self {
            zbin_scale: layout.scale,
            zbin_offset: layout.offset,
            tile_scale: grid.tile_scale.to_array(),
            tile_resolution: [grid.cols as u32, grid.rows as u32],
            tile_width: grid.tile_width,
            words_per_tile: layout.words_per_tile as u32,
            bin_count: layout.bin_count as u32,
            light_count: light_count as u32,
            flags: if grid.orthographic { FLAG_ORTHOGRAPHIC } else { 0 },
            _padding: 0,
        }
    }

    fn brute_force(light_count: usize, orthographic: bool) -> Self {
        let mut params = Self::zeroed();
        params.light_count = light_count as u32;
        params.flags = FLAG_BRUTE_FORCE | if orthographic { FLAG_ORTHOGRAPHIC } else { 0 };
        params
    }

    pub fn is_orthographic(&self) -> bool {
        self.flags & FLAG_ORTHOGRAPHIC != 0
    }

    pub fn is_brute_force(&self) -> bool {
        self.flags & FLAG_BRUTE_FORCE != 0
    }

    /// Bin of a fragment's view depth, clamped to the bin range.
    /// `None` without bins or for depths a perspective camera cannot see.
    pub fn bin_index(&self, depth: f32) -> Option<usize> {
        if self.bin_count == 0 {
            return None;
        }
        let mapped = if self.is_orthographic() {
            depth
        } else if depth > 0.0 {
            depth.log2()
        } else {
            return None;
        };
        let bin = (mapped * self.zbin_scale + self.zbin_offset).floor();
        if bin.is_nan() {
            return None;
        }
        Some(bin.clamp(0.0, (self.bin_count - 1) as f32) as usize)
    }

    /// Tile of a pixel position (origin at the bottom-left of the viewport).
    pub fn tile_index(&self, pixel: Vec2) -> Option<usize> {
        if self.tile_width == 0 || !pixel.is_finite() || pixel.min_element() < 0.0 {
            return None;
        }
        let col = (pixel.x / self.tile_width as f32) as usize;
        let row = (pixel.y / self.tile_width as f32) as usize;
        let [cols, rows] = self.tile_resolution.map(|count| count as usize);
        (col < cols && row < rows).then_some(row * cols + col)
    }
}

/// Read-only view of one frame's clustering buffers.
#[derive(Debug, Clone, Copy)]
pub struct ClusterOutput<'a> {
    pub params: FrameParams,
    /// `bin_count` bins of one header word followed by `words_per_tile` mask words.
    pub zbins: &'a [u32],
    /// `words_per_tile` words per tile, tile index `row * cols + col`.
    pub tile_masks: &'a [u32],
}

impl<'a> ClusterOutput<'a> {
    fn words_per_tile(&self) -> usize {
        self.params.words_per_tile as usize
    }

    /// Mask words of tile `(col, row)`; empty outside the grid.
    pub fn tile_mask(&self, col: usize, row: usize) -> &'a [u32] {
        let [cols, rows] = self.params.tile_resolution.map(|count| count as usize);
        if col >= cols || row >= rows {
            return &[];
        }
        let start = (row * cols + col) * self.words_per_tile();
        self.tile_masks
            .get(start..start + self.words_per_tile())
            .unwrap_or(&[])
    }

    /// Header and mask words of one bin; empty past the last bin.
    pub fn bin_words(&self, bin: usize) -> &'a [u32] {
        let stride = 1 + self.words_per_tile();
        self.zbins
            .get(bin * stride..(bin + 1) * stride)
            .unwrap_or(&[])
    }

    /// `(min, max)` light index recorded in a bin.
    pub fn bin_header(&self, bin: usize) -> Option<(u16, u16)> {
        self.bin_words(bin).first().map(|&header| decode_header(header))
    }

    pub fn light_in_tile(&self, light: usize, col: usize, row: usize) -> bool {
        mask_has(self.tile_mask(col, row), light)
    }

    pub fn light_in_bin(&self, light: usize, bin: usize) -> bool {
        self.bin_words(bin)
            .get(1..)
            .is_some_and(|mask| mask_has(mask, light))
    }

    /// Lights a fragment at `pixel` and view `depth` has to shade, in index order.
    ///
    /// Mirrors the shading-stage lookup: the bin mask is ANDed with the tile mask,
    /// scanning only the words between the bin header's min and max light index.
    /// In brute-force mode every light is returned.
    pub fn lights_for_fragment(&self, pixel: Vec2, depth: f32) -> Vec<usize> {
        if self.params.is_brute_force() {
            return (0..self.params.light_count as usize).collect();
        }
        let (Some(bin), Some(tile)) = (self.params.bin_index(depth), self.params.tile_index(pixel))
        else {
            return Vec::new();
        };
        let Some((min, max)) = self.bin_header(bin) else {
            return Vec::new();
        };
        if min > max {
            return Vec::new();
        }

        let bin_mask = &self.bin_words(bin)[1..];
        let words = self.words_per_tile();
        let tile_mask = self
            .tile_masks
            .get(tile * words..(tile + 1) * words)
            .unwrap_or(&[]);

        let (min, max) = (min as usize, max as usize);
        let mut lights = Vec::new();
        for word in min / BITS_PER_WORD..=max / BITS_PER_WORD {
            let (Some(&binned), Some(&tiled)) = (bin_mask.get(word), tile_mask.get(word)) else {
                break;
            };
            let mut bits = binned & tiled;
            while bits != 0 {
                let light = word * BITS_PER_WORD + bits.trailing_zeros() as usize;
                if (min..=max).contains(&light) {
                    lights.push(light);
                }
                bits &= bits - 1;
            }
        }
        lights
    }
}

fn mask_has(mask: &[u32], light: usize) -> bool {
    let (word, bit) = light_bit(light);
    mask.get(word).is_some_and(|&value| value & bit != 0)
}

/// Owns the clustering buffers and runs the per-frame culling pass.
///
/// Buffers are allocated for the configured capacity once and recycled every
/// frame; the phases clear the parts they write, so nothing is re-zeroed up front.
#[derive(Debug)]
pub struct LightClusterer {
    config: LightClusterConfig,
    pool: WorkerPool,
    depth_ranges: Vec<DepthRange>,
    tile_ranges: Vec<InclusiveRange>,
    zbins: Vec<u32>,
    tile_masks: Vec<u32>,
    truncation: TruncationLog,
    profiler: CullingProfiler,
}

impl LightClusterer {
    /// # Panics
    /// Panics if `config` fails [`LightClusterConfig::validate`].
    pub fn new(config: LightClusterConfig) -> Self {
        config.validate();
        let mut clusterer = Self {
            pool: WorkerPool::new(config.worker_threads),
            config,
            depth_ranges: Vec::new(),
            tile_ranges: Vec::new(),
            zbins: Vec::new(),
            tile_masks: Vec::new(),
            truncation: TruncationLog::default(),
            profiler: CullingProfiler::default(),
        };
        clusterer.allocate();
        clusterer
    }

    /// Replaces the configuration. Buffers are reallocated only when a
    /// capacity setting changes.
    ///
    /// # Panics
    /// Panics if `config` fails [`LightClusterConfig::validate`].
    pub fn set_config(&mut self, config: LightClusterConfig) {
        config.validate();
        let reallocate = self.config.capacity_differs(&config);
        if config.worker_threads != self.config.worker_threads {
            self.pool = WorkerPool::new(config.worker_threads);
        }
        self.config = config;
        if reallocate {
            self.allocate();
        }
    }

    pub fn config(&self) -> &LightClusterConfig {
        &self.config
    }

    /// Enables or disables parallel execution of the culling phases.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.config.parallel = enabled;
    }

    /// Returns whether the culling phases currently run in parallel.
    pub fn parallel_enabled(&self) -> bool {
        self.config.parallel && cfg!(feature = "parallel")
    }

    /// Timings and counters of the last [`cull`](Self::cull).
    pub fn profiler(&self) -> &CullingProfiler {
        &self.profiler
    }

    fn allocate(&mut self) {
        debug!(
            "allocating light cluster buffers: {} lights, {} bin words, {} tile words",
            self.config.max_lights, self.config.max_zbin_words, self.config.max_tile_words
        );
        self.depth_ranges = vec![DepthRange::EMPTY; self.config.max_lights];
        let ranges = self.config.max_lights * (1 + self.config.max_tile_rows());
        self.tile_ranges = vec![InclusiveRange::EMPTY; ranges];
        self.zbins = vec![0; self.config.max_zbin_words];
        self.tile_masks = vec![0; self.config.max_tile_words];
    }

    /// Clusters `lights` for one camera. Lights past `max_lights` are dropped.
    ///
    /// The returned buffers stay valid until the next call.
    pub fn cull(&mut self, lights: &[LightDescriptor], view: &ViewContext) -> ClusterOutput<'_> {
        let _timer = ScopedTimer::new("light_cluster::cull");
        let frame_start = Instant::now();
        self.profiler.reset();

        // Excess lights are truncated, not an error.
        self.truncation.record(lights.len(), self.config.max_lights);
        let lights = &lights[..lights.len().min(self.config.max_lights)];
        self.profiler.light_count = lights.len();
        self.profiler.dropped_light_count = self.truncation.dropped();

        if self.config.mode == ClusteringMode::BruteForce {
            self.profiler.total_frame_time = frame_start.elapsed();
            return ClusterOutput {
                params: FrameParams::brute_force(lights.len(), view.is_orthographic()),
                zbins: &[],
                tile_masks: &[],
            };
        }

        let words_per_tile = self.config.words_per_tile();
        let requested = view.tile_width.max(self.config.min_tile_width);
        let tile_width = self.config.tile_width_for(view.viewport, view.tile_width);
        if tile_width != requested {
            debug!(
                "tile width widened from {requested} to {tile_width} px to fit {} tile words",
                self.config.max_tile_words
            );
        }
        let grid = TileGrid::new(view, tile_width);
        let layout = ZBinLayout::new(view, self.config.bin_count(), words_per_tile);
        let tile_words = (grid.tile_count() * words_per_tile).min(self.tile_masks.len());
        // The widened grid fits `max_tile_words`, so it has at most `max_tile_rows` rows.
        let range_count = lights.len() * grid.ranges_per_light();
        debug_assert!(range_count <= self.tile_ranges.len());

        let parallel = self.parallel_enabled();
        let Self {
            pool,
            depth_ranges,
            tile_ranges,
            zbins,
            tile_masks,
            profiler,
            ..
        } = self;
        let depth_ranges = &mut depth_ranges[..lights.len()];
        let tile_ranges = &mut tile_ranges[..range_count];
        let tile_masks = &mut tile_masks[..tile_words];

        pool.install(|| {
            {
                let _timer =
                    ScopedTimer::accumulating("light_cluster::bounds", &mut profiler.bounds_time);
                LightBoundsExtractor::extract(lights, &view.view, depth_ranges, parallel);
            }

            let depth_ranges = &*depth_ranges;
            let (binning_time, tiling_time) = parallel::join(
                parallel,
                || {
                    timed("light_cluster::binning", || {
                        DepthBinner::bin(&layout, depth_ranges, zbins, parallel)
                    })
                },
                || {
                    timed("light_cluster::tiling", || {
                        ScreenTiler::tile(&grid, lights, tile_ranges, parallel)
                    })
                },
            );
            profiler.binning_time = binning_time;
            profiler.tiling_time = tiling_time;

            let _timer =
                ScopedTimer::accumulating("light_cluster::expansion", &mut profiler.expansion_time);
            TileRangeExpander::expand(
                &grid,
                words_per_tile,
                tile_ranges,
                lights.len(),
                tile_masks,
                parallel,
            );
        });

        self.profiler.tile_count = grid.tile_count();
        self.profiler.bin_count = layout.bin_count;
        self.profiler.tile_width = tile_width;
        self.profiler.total_frame_time = frame_start.elapsed();

        ClusterOutput {
            params: FrameParams::binned(&grid, &layout, lights.len()),
            zbins: &self.zbins[..layout.word_count()],
            tile_masks: &self.tile_masks[..tile_words],
        }
    }
}

fn timed(phase: &'static str, work: impl FnOnce()) -> Duration {
    let mut time = Duration::ZERO;
    {
        let _timer = ScopedTimer::accumulating(phase, &mut time);
        work();
    }
    time
}
