//! Core types describing lights, cameras, and the range encodings shared by every culling phase.

pub mod light;
pub mod range;
pub mod view;

pub use light::{LightDescriptor, LightKind, SpotCone, ViewLight};
pub use range::{DepthRange, InclusiveRange};
pub use view::{tile_index, ProjectionKind, TileGrid, ViewContext};
