// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Union-find over dense vertex ids: union by size, path compression.

use streamcc_common::NodeId;

#[derive(Clone, Debug)]
pub struct DisjointSets {
    parent: Vec<NodeId>,
    size: Vec<u32>,
}

impl DisjointSets {
    #[must_use]
    pub fn new(num_nodes: NodeId) -> Self {
        Self {
            parent: (0..num_nodes).collect(),
            size: vec![1; num_nodes as usize],
        }
    }

    /// Reset every vertex to its own singleton set.
    pub fn reset(&mut self) {
        for (slot, parent) in self.parent.iter_mut().enumerate() {
            *parent = slot as NodeId;
        }
        self.size.fill(1);
    }

    /// Root of `x`'s set, compressing the path by halving as it walks.
    pub fn find(&mut self, mut x: NodeId) -> NodeId {
        while self.parent[x as usize] != x {
            self.parent[x as usize] = self.parent[self.parent[x as usize] as usize];
            x = self.parent[x as usize];
        }
        x
    }

    pub fn size_of(&self, root: NodeId) -> u32 {
        self.size[root as usize]
    }

    /// Union the sets rooted at `a` and `b`, which must be distinct roots.
    /// Returns `(root, absorbed)`: the larger set keeps its root and ties
    /// keep `a`, which makes round output deterministic given a
    /// deterministic sampler.
    pub fn union_roots(&mut self, a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        debug_assert_ne!(a, b);
        debug_assert_eq!(self.parent[a as usize], a, "{a} is not a root");
        debug_assert_eq!(self.parent[b as usize], b, "{b} is not a root");
        let (root, absorbed) = if self.size[a as usize] < self.size[b as usize] {
            (b, a)
        } else {
            (a, b)
        };
        self.parent[absorbed as usize] = root;
        self.size[root as usize] += self.size[absorbed as usize];
        (root, absorbed)
    }
}
