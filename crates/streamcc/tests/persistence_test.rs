// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

mod common;

use anyhow::Result;
use common::{multiples_graph, seeded_config};
use streamcc::{Graph, GraphError, StreamConfig, UpdateOp};

use UpdateOp::Insert;

#[test]
fn dump_and_reload_preserves_components() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let dump = dir.path().join("graph.bin");
    let stream = multiples_graph(256);

    for attempt in 0..common::MAX_ATTEMPTS {
        let graph = Graph::new(256, seeded_config(common::BASE_SEED + 7 * attempt as u64));
        for &(u, v, op) in &stream {
            graph.update((u, v), op)?;
        }
        graph.write_binary(&dump)?;

        let original = match graph.connected_components(false) {
            Ok(components) => components,
            Err(GraphError::OutOfQueries) => continue,
            Err(err) => return Err(err.into()),
        };

        let reheated = Graph::load(&dump, StreamConfig::default())?;
        assert_eq!(reheated.num_nodes(), 256);
        assert_eq!(reheated.seed(), graph.seed());
        let restored = match reheated.connected_components(false) {
            Ok(components) => components,
            Err(GraphError::OutOfQueries) => continue,
            Err(err) => return Err(err.into()),
        };

        assert_eq!(original, restored);
        return Ok(());
    }
    panic!("dump/reload kept running out of sketches");
}

#[test]
fn reloaded_graph_accepts_more_updates() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let dump = dir.path().join("partial.bin");

    for attempt in 0..common::MAX_ATTEMPTS {
        let graph = Graph::new(
            8,
            seeded_config(common::BASE_SEED ^ (0xabcd + attempt as u64)),
        );
        graph.update((0, 1), Insert)?;
        graph.write_binary(&dump)?;
        drop(graph);

        let reheated = Graph::load(&dump, StreamConfig::default())?;
        reheated.update((2, 3), Insert)?;
        match reheated.connected_components(false) {
            Ok(components) => {
                assert!(components.contains(&[0, 1].into_iter().collect()));
                assert!(components.contains(&[2, 3].into_iter().collect()));
                assert_eq!(components.len(), 6);
                return Ok(());
            }
            Err(GraphError::OutOfQueries) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    panic!("reheated query kept running out of sketches");
}

#[test]
fn dump_length_matches_the_packed_layout() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let dump = dir.path().join("layout.bin");

    let graph = Graph::new(16, seeded_config(3));
    graph.update((3, 9), Insert)?;
    graph.write_binary(&dump)?;

    // Header: u64 seed + u32 n + u64 failure factor. Per vertex: u32 cursor
    // plus ceil(log2 16) = 4 sketches of 10 columns × 8 guess rows buckets
    // (16·15 rounds up to 2^8), 24 bytes each.
    let header = 8 + 4 + 8;
    let per_sketch = 10 * 8 * 24;
    let per_vertex = 4 + 4 * per_sketch;
    let expected = header + 16 * per_vertex;
    assert_eq!(std::fs::metadata(&dump)?.len(), expected as u64);
    Ok(())
}

#[test]
fn truncated_dump_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let dump = dir.path().join("truncated.bin");

    let graph = Graph::new(8, seeded_config(5));
    graph.write_binary(&dump)?;
    let bytes = std::fs::read(&dump)?;
    std::fs::write(&dump, &bytes[..bytes.len() / 2])?;

    assert!(Graph::load(&dump, StreamConfig::default()).is_err());
    Ok(())
}

#[test]
fn implausible_header_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let dump = dir.path().join("zeroes.bin");
    std::fs::write(&dump, [0u8; 20])?;

    assert!(matches!(
        Graph::load(&dump, StreamConfig::default()),
        Err(GraphError::Corrupted { .. })
    ));
    Ok(())
}
