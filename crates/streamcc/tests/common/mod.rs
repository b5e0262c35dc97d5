// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Shared fixtures for the integration suites.
#![allow(dead_code)] // each suite links its own copy and uses a subset

use std::collections::BTreeSet;
use streamcc::dsu::DisjointSets;
use streamcc::{Graph, GraphError, NodeId, StreamConfig, UpdateOp};

pub const BASE_SEED: u64 = 0x5eed_cafe_f00d_0001;

/// How often a suite retries a query that ran its sketches dry. The
/// documented remedy for `OutOfQueries` is a fresh seed and a replay, and
/// the bound keeps the suites deterministic enough while staying honest
/// about the probabilistic core.
pub const MAX_ATTEMPTS: usize = 4;

pub fn seeded_config(seed: u64) -> StreamConfig {
    StreamConfig::with_seed(seed)
}

/// Build a graph from the stream and query it once, retrying the whole
/// construction with a fresh seed when the sketches run dry.
pub fn components_of_stream(
    num_nodes: NodeId,
    stream: &[(NodeId, NodeId, UpdateOp)],
) -> Vec<BTreeSet<NodeId>> {
    components_with(num_nodes, stream, StreamConfig::default())
}

pub fn components_with(
    num_nodes: NodeId,
    stream: &[(NodeId, NodeId, UpdateOp)],
    template: StreamConfig,
) -> Vec<BTreeSet<NodeId>> {
    for attempt in 0..MAX_ATTEMPTS {
        let config = StreamConfig {
            seed: Some(BASE_SEED.wrapping_add(attempt as u64 * 0x9e37_79b9)),
            ..template.clone()
        };
        let graph = Graph::new(num_nodes, config);
        for &(u, v, op) in stream {
            graph.update((u, v), op).expect("ingest rejected an update");
        }
        match graph.connected_components(false) {
            Ok(components) => return components,
            Err(GraphError::OutOfQueries) => continue,
            Err(err) => panic!("connectivity query failed: {err}"),
        }
    }
    panic!("query ran out of sketches for {MAX_ATTEMPTS} seeds in a row");
}

/// Expected component sets, written as slices for readability.
pub fn expect(sets: &[&[NodeId]]) -> Vec<BTreeSet<NodeId>> {
    sets.iter()
        .map(|set| set.iter().copied().collect())
        .collect()
}

/// Ground-truth components of a cumulative edge set.
pub fn reference_components(
    num_nodes: NodeId,
    edges: &BTreeSet<(NodeId, NodeId)>,
) -> Vec<BTreeSet<NodeId>> {
    let mut sets = DisjointSets::new(num_nodes);
    for &(u, v) in edges {
        let a = sets.find(u);
        let b = sets.find(v);
        if a != b {
            sets.union_roots(a, b);
        }
    }
    let mut grouped: std::collections::BTreeMap<NodeId, BTreeSet<NodeId>> =
        std::collections::BTreeMap::new();
    for v in 0..num_nodes {
        grouped.entry(sets.find(v)).or_default().insert(v);
    }
    grouped.into_values().collect()
}

/// The multiples graph: edges `(i, k·i)` for `i ≥ 2`, `k ≥ 2`, `k·i < n`.
/// For n = 1024 it has 78 components: {0}, {1}, one large block, and a
/// singleton for every prime in (n/2, n).
pub fn multiples_graph(num_nodes: NodeId) -> Vec<(NodeId, NodeId, UpdateOp)> {
    let mut stream = Vec::new();
    for i in 2..num_nodes {
        let mut multiple = 2 * i;
        while multiple < num_nodes {
            stream.push((i, multiple, UpdateOp::Insert));
            multiple += i;
        }
    }
    stream
}
