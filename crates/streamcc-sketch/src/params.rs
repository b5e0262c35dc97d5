// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Sketch shape derived from the vertex count and the failure factor.
//!
//! Instead of the usual one-shot global configuration, the shape is a plain
//! value threaded through every constructor, so graphs with different
//! parameters can coexist in one process.

use crate::hashing::seeded_hash64;
use streamcc_common::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SketchParams {
    pub num_nodes: NodeId,

    /// Sketch vector length: n(n-1) rounded up to a power of two, so every
    /// legal edge id indexes a distinct coordinate.
    pub dimension: u64,

    /// Guess rows per column, one per doubling of hypothesised support:
    /// log2(dimension).
    pub num_guesses: u32,

    /// Independent sampling columns: ceil(log2(failure_factor)). Each extra
    /// column halves the per-sample failure probability.
    pub num_columns: u32,

    /// Failure factor F; a single sample fails with probability at most 1/F.
    pub failure_factor: u64,
}

impl SketchParams {
    /// Shape for a graph on `num_nodes` vertices.
    ///
    /// # Panics
    ///
    /// Panics when `num_nodes < 2` (no edges exist) or
    /// `failure_factor < 2`.
    pub fn new(num_nodes: NodeId, failure_factor: u64) -> Self {
        assert!(num_nodes >= 2, "a streamable graph needs at least 2 vertices");
        assert!(failure_factor >= 2, "failure factor must be at least 2");
        let dimension = (num_nodes as u64 * (num_nodes as u64 - 1)).next_power_of_two();
        Self {
            num_nodes,
            dimension,
            num_guesses: dimension.ilog2().max(1),
            num_columns: failure_factor.next_power_of_two().ilog2().max(1),
            failure_factor,
        }
    }

    /// Buckets held by one sketch.
    pub fn num_buckets(&self) -> usize {
        self.num_columns as usize * self.num_guesses as usize
    }

    /// Sketches per supernode: ceil(log2(n)), one per Borůvka round.
    pub fn sketches_per_supernode(&self) -> usize {
        (self.num_nodes as u64).next_power_of_two().ilog2().max(1) as usize
    }

    /// Seed of the `idx`-th sketch of every supernode. Seeds depend only on
    /// the graph seed and the slot, never on the vertex: same-slot sketches
    /// of different vertices must stay linearly compatible so they can be
    /// merged bucket-wise.
    pub fn sketch_seed(graph_seed: u64, idx: usize) -> u64 {
        seeded_hash64(&idx, graph_seed)
    }
}
