// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Per-vertex bank of independent L0 sketches.
//!
//! Each Borůvka round consumes one sketch through the monotone cursor
//! `next_idx`; once the cursor reaches the end the supernode is exhausted
//! and further sampling surfaces [`GraphError::OutOfQueries`].

use crate::params::SketchParams;
use crate::sketch::{Sketch, SketchSample};
use std::io::{Read, Write};
use streamcc_common::error::{GraphError, Result};
use streamcc_common::io::{read_u32, write_u32};
use streamcc_common::{Edge, NodeId, pairing};

/// Outcome of sampling a supernode's current cut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CutSample {
    /// An edge leaving the vertex's current component.
    Good(Edge),
    /// The cut is empty: the component is complete.
    Zero,
    /// The sketch failed to decode; the caller retries next round.
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Supernode {
    next_idx: usize,
    sketches: Vec<Sketch>,
}

impl Supernode {
    /// An empty supernode. Sketch seeds are a function of `(graph_seed,
    /// slot)` only, so same-slot sketches of different vertices merge
    /// cleanly.
    pub fn new(params: &SketchParams, graph_seed: u64) -> Self {
        let sketches = (0..params.sketches_per_supernode())
            .map(|idx| Sketch::new(params, SketchParams::sketch_seed(graph_seed, idx)))
            .collect();
        Self { next_idx: 0, sketches }
    }

    pub fn next_idx(&self) -> usize {
        self.next_idx
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_idx == self.sketches.len()
    }

    fn clear(&mut self) {
        self.next_idx = 0;
        for sketch in &mut self.sketches {
            sketch.clear();
        }
    }

    /// Rebuild `delta` in place to represent one batch of `src`: a
    /// symmetric-difference flip of `edge(src, dst)` per neighbor, applied
    /// to every sketch slot. Duplicate neighbors cancel pairwise.
    pub fn generate_delta(
        params: &SketchParams,
        src: NodeId,
        dsts: &[NodeId],
        delta: &mut Supernode,
    ) {
        delta.clear();
        for &dst in dsts {
            let idx = pairing::encode(src, dst);
            for sketch in &mut delta.sketches {
                sketch.update(params, idx);
            }
        }
    }

    /// Fold a freshly generated delta into every sketch slot.
    pub fn apply_delta(&mut self, delta: &Supernode) {
        debug_assert_eq!(self.sketches.len(), delta.sketches.len());
        for (mine, theirs) in self.sketches.iter_mut().zip(&delta.sketches) {
            mine.merge(theirs);
        }
    }

    /// Consume one sketch and sample the current cut.
    ///
    /// # Errors
    ///
    /// [`GraphError::OutOfQueries`] once every sketch has been consumed.
    pub fn sample(&mut self, params: &SketchParams) -> Result<CutSample> {
        let Some(sketch) = self.sketches.get(self.next_idx) else {
            return Err(GraphError::OutOfQueries);
        };
        self.next_idx += 1;
        Ok(match sketch.sample(params) {
            SketchSample::Zero => CutSample::Zero,
            SketchSample::Fail => CutSample::Fail,
            SketchSample::Good(idx) => {
                let (u, v) = pairing::decode(idx);
                // A checksum collision could decode to garbage; treat an
                // out-of-range endpoint like a failed sample.
                if v < params.num_nodes {
                    CutSample::Good((u, v))
                } else {
                    CutSample::Fail
                }
            }
        })
    }

    /// Absorb `other`: bucket-wise addition of every sketch slot not yet
    /// consumed. Both sides must have consumed the same number of sketches,
    /// which the round structure guarantees.
    pub fn merge(&mut self, other: &Supernode) {
        debug_assert_eq!(self.next_idx, other.next_idx, "merging out-of-phase supernodes");
        let start = self.next_idx.max(other.next_idx);
        for idx in start..self.sketches.len() {
            self.sketches[idx].merge(&other.sketches[idx]);
        }
        self.next_idx = start;
    }

    /// Rewind the sampling cursor for the next query.
    pub fn reset_query_state(&mut self) {
        self.next_idx = 0;
    }

    pub fn write_binary<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write_u32(out, self.next_idx as u32)?;
        for sketch in &self.sketches {
            sketch.write_binary(out)?;
        }
        Ok(())
    }

    pub fn read_binary<R: Read>(
        params: &SketchParams,
        graph_seed: u64,
        input: &mut R,
    ) -> std::io::Result<Self> {
        let next_idx = read_u32(input)? as usize;
        let total = params.sketches_per_supernode();
        if next_idx > total {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("supernode cursor {next_idx} exceeds {total} sketches"),
            ));
        }
        let mut sketches = Vec::with_capacity(total);
        for idx in 0..total {
            sketches.push(Sketch::read_binary(
                params,
                SketchParams::sketch_seed(graph_seed, idx),
                input,
            )?);
        }
        Ok(Self { next_idx, sketches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 0x5eed;

    fn params() -> SketchParams {
        SketchParams::new(16, 1024)
    }

    fn node_with_edges(params: &SketchParams, src: NodeId, dsts: &[NodeId]) -> Supernode {
        let mut node = Supernode::new(params, SEED);
        let mut delta = Supernode::new(params, SEED);
        Supernode::generate_delta(params, src, dsts, &mut delta);
        node.apply_delta(&delta);
        node
    }

    #[test]
    fn empty_supernode_samples_zero() {
        let params = params();
        let mut node = Supernode::new(&params, SEED);
        assert_eq!(node.sample(&params).unwrap(), CutSample::Zero);
        assert_eq!(node.next_idx(), 1);
    }

    #[test]
    fn sampled_edges_come_from_the_batch() {
        let params = params();
        let dsts = [1, 4, 9];
        let mut node = node_with_edges(&params, 0, &dsts);
        match node.sample(&params).unwrap() {
            CutSample::Good((u, v)) => {
                assert_eq!(u, 0);
                assert!(dsts.contains(&v));
            }
            CutSample::Fail => {}
            CutSample::Zero => panic!("three live edges sampled Zero"),
        }
    }

    #[test]
    fn duplicate_neighbors_cancel_within_a_batch() {
        let params = params();
        let mut node = node_with_edges(&params, 3, &[7, 7]);
        assert_eq!(node.sample(&params).unwrap(), CutSample::Zero);
    }

    #[test]
    fn duplicate_neighbors_cancel_across_batches() {
        let params = params();
        let mut node = node_with_edges(&params, 3, &[7]);
        let mut delta = Supernode::new(&params, SEED);
        Supernode::generate_delta(&params, 3, &[7], &mut delta);
        node.apply_delta(&delta);
        assert_eq!(node.sample(&params).unwrap(), CutSample::Zero);
    }

    #[test]
    fn exhausted_supernode_errors() {
        let params = params(); // 16 vertices -> 4 sketches
        let mut node = Supernode::new(&params, SEED);
        for _ in 0..params.sketches_per_supernode() {
            node.sample(&params).unwrap();
        }
        assert!(node.is_exhausted());
        assert!(matches!(node.sample(&params), Err(GraphError::OutOfQueries)));
    }

    #[test]
    fn merge_cancels_the_internal_edge() {
        let params = params();
        let mut left = node_with_edges(&params, 0, &[1]);
        let mut right = node_with_edges(&params, 1, &[0, 2]);

        // Both consume one sketch, as they would in round one.
        left.sample(&params).unwrap();
        right.sample(&params).unwrap();

        left.merge(&right);
        match left.sample(&params).unwrap() {
            CutSample::Good(edge) => assert_eq!(edge, (1, 2)),
            CutSample::Fail => {}
            CutSample::Zero => panic!("cut edge (1,2) should survive the merge"),
        }
    }

    #[test]
    fn reset_rewinds_the_cursor() {
        let params = params();
        let mut node = Supernode::new(&params, SEED);
        node.sample(&params).unwrap();
        node.reset_query_state();
        assert_eq!(node.next_idx(), 0);
    }

    #[test]
    fn binary_round_trip() {
        let params = params();
        let mut node = node_with_edges(&params, 2, &[5, 11, 14]);
        node.sample(&params).unwrap();

        let mut buf = Vec::new();
        node.write_binary(&mut buf).unwrap();
        let back = Supernode::read_binary(&params, SEED, &mut buf.as_slice()).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.next_idx(), 1);
    }

    #[test]
    fn truncated_input_is_rejected() {
        let params = params();
        let node = Supernode::new(&params, SEED);
        let mut buf = Vec::new();
        node.write_binary(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(Supernode::read_binary(&params, SEED, &mut buf.as_slice()).is_err());
    }
}
