//! Light Cluster – CPU-side light clustering for forward renderers.
//!
//! Each frame the visible point and spot lights are bucketed along camera depth
//! into Z-bins and across the screen into a tile grid. The resulting bit-mask
//! buffers let the shading stage look up the lights that may touch a fragment
//! from its depth and screen tile instead of looping over every light.
//!
//! ```no_run
//! use light_cluster::{
//!     LightClusterConfig, LightClusterer, LightDescriptor, Mat4, Vec2, Vec3, ViewContext,
//! };
//!
//! let mut clusterer = LightClusterer::new(LightClusterConfig::default());
//! let view = ViewContext::perspective(
//!     Mat4::look_at_rh(Vec3::new(0.0, 2.0, 8.0), Vec3::ZERO, Vec3::Y),
//!     1.0,
//!     0.1,
//!     100.0,
//!     [1920, 1080],
//!     16,
//! );
//! let lights = [LightDescriptor::point(Vec3::ZERO, 4.0)];
//! let output = clusterer.cull(&lights, &view);
//! let lit = output.lights_for_fragment(Vec2::new(960.0, 540.0), 8.0);
//! # let _ = lit;
//! ```

pub mod clusterer;
pub mod config;
pub mod core;
pub mod culling;
pub mod utils;

pub use glam::{Mat4, Vec2, Vec3};

pub use clusterer::{
    ClusterOutput, FrameParams, LightClusterer, FLAG_BRUTE_FORCE, FLAG_ORTHOGRAPHIC,
};
pub use config::{ClusteringMode, LightClusterConfig};
pub use core::{
    DepthRange, InclusiveRange, LightDescriptor, LightKind, ProjectionKind, TileGrid, ViewContext,
};
pub use culling::{
    DepthBinner, LightBoundsExtractor, ScreenTiler, TileRangeExpander, ZBinLayout, EMPTY_HEADER,
};
pub use utils::profiling::CullingProfiler;
