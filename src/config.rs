//! Global configuration constants and the per-clusterer capacity settings.

use serde::{Deserialize, Serialize};

/// Default number of lights that can be binned and tiled in one frame.
pub const DEFAULT_MAX_LIGHTS: usize = 256;

/// Default word budget shared by all Z-bins (headers included).
pub const DEFAULT_MAX_ZBIN_WORDS: usize = 1024 * 4;

/// Default word budget shared by all tile masks.
pub const DEFAULT_MAX_TILE_WORDS: usize = 4096 * 4;

/// Smallest tile width (in pixels) tried when fitting the tile grid into the word budget.
pub const DEFAULT_MIN_TILE_WIDTH: u32 = 8;

/// Number of Z-bins cleared and filled by one binning task.
pub const ZBIN_BATCH_SIZE: usize = 128;

/// Near distance substituted for a zero (or negative) perspective near plane.
pub const MIN_PERSPECTIVE_NEAR: f32 = 1.0e-4;

/// Number of light bits packed into one mask word.
pub const BITS_PER_WORD: usize = 32;

/// How lights are handed to the shading stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClusteringMode {
    /// Lights are binned along depth and tiled across the screen.
    #[default]
    Binned,
    /// No bins or tile masks are produced. The shading stage iterates every
    /// light in `0..FrameParams::light_count` for every fragment.
    BruteForce,
}

/// Capacity and scheduling settings of a [`crate::LightClusterer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightClusterConfig {
    /// Lights past this count are dropped for the frame.
    pub max_lights: usize,
    /// Total words available to the Z-bin buffer.
    pub max_zbin_words: usize,
    /// Total words available to the tile-mask buffer.
    pub max_tile_words: usize,
    /// Lower bound for the tile width picked each frame.
    pub min_tile_width: u32,
    pub mode: ClusteringMode,
    /// Runs the culling phases on the rayon pool when the `parallel` feature is enabled.
    pub parallel: bool,
    /// Size of a dedicated worker pool. Zero uses the global rayon pool.
    pub worker_threads: usize,
}

impl Default for LightClusterConfig {
    fn default() -> Self {
        Self {
            max_lights: DEFAULT_MAX_LIGHTS,
            max_zbin_words: DEFAULT_MAX_ZBIN_WORDS,
            max_tile_words: DEFAULT_MAX_TILE_WORDS,
            min_tile_width: DEFAULT_MIN_TILE_WIDTH,
            mode: ClusteringMode::Binned,
            parallel: true,
            worker_threads: 0,
        }
    }
}

impl LightClusterConfig {
    /// Mask words needed to hold one bit per light.
    pub fn words_per_tile(&self) -> usize {
        self.max_lights.div_ceil(BITS_PER_WORD).max(1)
    }

    /// Number of Z-bins that fit into the word budget, one header word per bin.
    pub fn bin_count(&self) -> usize {
        self.max_zbin_words / (1 + self.words_per_tile())
    }

    /// Returns true if switching to `other` requires new buffers.
    pub fn capacity_differs(&self, other: &LightClusterConfig) -> bool {
        self.max_lights != other.max_lights
            || self.max_zbin_words != other.max_zbin_words
            || self.max_tile_words != other.max_tile_words
    }

    /// Upper bound on tile rows of any grid that [`tile_width_for`](Self::tile_width_for)
    /// accepts, since such a grid holds at most `max_tile_words` words.
    pub fn max_tile_rows(&self) -> usize {
        self.max_tile_words / self.words_per_tile().max(1)
    }

    /// Smallest tile width, doubling from `requested`, whose grid fits into `max_tile_words`.
    pub fn tile_width_for(&self, viewport: [u32; 2], requested: u32) -> u32 {
        let words = self.words_per_tile();
        let mut width = requested.max(self.min_tile_width).max(1);
        loop {
            let cols = viewport[0].div_ceil(width) as usize;
            let rows = viewport[1].div_ceil(width) as usize;
            if cols * rows * words <= self.max_tile_words || (cols == 1 && rows == 1) {
                return width;
            }
            width = width.saturating_mul(2);
        }
    }

    /// Rejects configurations the culling pass cannot honor.
    ///
    /// # Panics
    /// Panics on a zero light capacity, more lights than a 16-bit bin header can
    /// index, a zero tile width or a word budget that cannot hold a single bin or tile.
    pub fn validate(&self) {
        assert!(self.max_lights > 0, "max_lights must be positive");
        assert!(
            self.max_lights <= u16::MAX as usize,
            "max_lights {} exceeds the 16-bit bin header range",
            self.max_lights
        );
        assert!(self.min_tile_width > 0, "min_tile_width must be positive");
        assert!(
            self.bin_count() > 0,
            "max_zbin_words {} cannot hold a single bin of {} words",
            self.max_zbin_words,
            1 + self.words_per_tile()
        );
        assert!(
            self.max_tile_words >= self.words_per_tile(),
            "max_tile_words {} cannot hold a single tile of {} words",
            self.max_tile_words,
            self.words_per_tile()
        );
    }
}
