// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Connected components of a fully dynamic graph stream.
//!
//! Edge insertions and deletions arrive as an unbounded stream and are
//! folded into per-vertex L0 sketches, so the whole structure uses
//! polylogarithmic memory per vertex. A connectivity query emulates
//! Borůvka's algorithm over the sketches: every round samples one cut edge
//! per active component and unions the endpoints, so the answer is exact
//! on the surviving edge set with the sketch failure probability bounded
//! by the configured failure factor.
//!
//! ```
//! use streamcc::{Graph, StreamConfig, UpdateOp};
//!
//! let graph = Graph::new(4, StreamConfig::with_seed(7));
//! graph.update((0, 1), UpdateOp::Insert)?;
//! graph.update((2, 3), UpdateOp::Insert)?;
//! let components = graph.connected_components(false)?;
//! assert_eq!(components.len(), 2);
//! # Ok::<(), streamcc::GraphError>(())
//! ```

mod boruvka;
mod checkpoint;
pub mod dsu;
pub mod graph;
pub mod gutters;
pub mod workers;

// Re-exports for convenience
pub use graph::{Graph, GraphCore, UpdateOp};
pub use streamcc_common::config::StreamConfig;
pub use streamcc_common::error::{GraphError, Result};
pub use streamcc_common::{Edge, NodeId, pairing};
pub use streamcc_sketch::{CutSample, SketchParams, Supernode};
