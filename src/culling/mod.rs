//! The four culling passes, in execution order: depth bounds, Z-binning,
//! screen tiling and tile mask expansion.

pub mod bounds;
pub mod expansion;
pub mod tiling;
pub mod zbin;

pub use bounds::LightBoundsExtractor;
pub use expansion::TileRangeExpander;
pub use tiling::ScreenTiler;
pub use zbin::{decode_header, encode_header, light_bit, DepthBinner, ZBinLayout, EMPTY_HEADER};
