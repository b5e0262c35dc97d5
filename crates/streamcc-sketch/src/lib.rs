// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Linear sketches for streaming connectivity.
//!
//! The crate exposes:
//! - [`SketchParams`]: the sketch shape derived from the vertex count and
//!   the failure factor.
//! - [`Sketch`]: one L0-sampling sketch over the edge coordinate space.
//! - [`Supernode`]: the per-vertex bank of independent sketches consumed
//!   one per Borůvka round.

pub mod bucket;
pub mod hashing;
pub mod params;
pub mod sketch;
pub mod supernode;

pub use params::SketchParams;
pub use sketch::{Sketch, SketchSample};
pub use supernode::{CutSample, Supernode};
