// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Round-based Borůvka emulation over supernode cut sketches.
//!
//! Every round samples each active representative in parallel, plans the
//! unions sequentially against the DSU, then applies the supernode merges
//! in parallel. Sampling a representative is always strictly before any
//! merge of the same round, and the phases are separated by fork-join
//! barriers, so no supernode is read and written concurrently.

use crate::checkpoint::QueryCheckpoint;
use crate::dsu::DisjointSets;
use crate::graph::GraphCore;
use fxhash::FxHashMap;
use rayon::prelude::*;
use std::collections::BTreeSet;
use streamcc_common::NodeId;
use streamcc_common::error::Result;
use streamcc_sketch::CutSample;
use tracing::debug;

pub(crate) fn run(core: &GraphCore, make_copy: bool) -> Result<Vec<BTreeSet<NodeId>>> {
    let num_nodes = core.params.num_nodes;
    let mut dsu = core.dsu.lock();
    dsu.reset();

    let mut reps: Vec<NodeId> = (0..num_nodes).collect();
    let mut checkpoint = QueryCheckpoint::new(core, make_copy);
    let mut first_round = true;
    let mut rounds = 0u32;

    let outcome = loop {
        rounds += 1;
        let samples = match sample_phase(core, &reps) {
            Ok(samples) => samples,
            Err(err) => break Err(err),
        };
        let (new_reps, to_merge, modified) = plan_phase(&mut dsu, num_nodes, &reps, &samples);
        reps = new_reps;

        if first_round {
            checkpoint.save(core, &reps);
        }
        merge_phase(core, &reps, &to_merge, &checkpoint, first_round && make_copy);
        first_round = false;

        debug!(round = rounds, active = reps.len(), modified, "borůvka round");
        if !modified {
            break Ok(());
        }
    };

    if let Err(err) = outcome {
        checkpoint.restore(core);
        return Err(err);
    }

    let components = collect_components(&mut dsu, num_nodes);
    checkpoint.restore(core);
    debug!(rounds, components = components.len(), "borůvka converged");
    Ok(components)
}

/// Sample every active representative in parallel. Failures inside the
/// phase are collected and the first one re-raised after the join.
fn sample_phase(core: &GraphCore, reps: &[NodeId]) -> Result<Vec<CutSample>> {
    let results: Vec<Result<CutSample>> = reps
        .par_iter()
        .map(|&v| core.supernodes[v as usize].lock().sample(&core.params))
        .collect();
    results.into_iter().collect()
}

/// Walk the samples sequentially, performing DSU unions and accumulating
/// the per-root merge lists. Returns the next representative set, the
/// merge plan and whether anything changed this round.
fn plan_phase(
    dsu: &mut DisjointSets,
    num_nodes: NodeId,
    reps: &[NodeId],
    samples: &[CutSample],
) -> (Vec<NodeId>, Vec<Vec<NodeId>>, bool) {
    let mut to_merge: Vec<Vec<NodeId>> = vec![Vec::new(); num_nodes as usize];
    let mut retries: Vec<NodeId> = Vec::new();
    let mut modified = false;

    for (&rep, sample) in reps.iter().zip(samples) {
        match *sample {
            CutSample::Fail => {
                // Sketch failure: query this vertex again next round.
                modified = true;
                retries.push(rep);
            }
            CutSample::Zero => {
                // Empty cut: the component is complete.
            }
            CutSample::Good((u, v)) => {
                let a = dsu.find(u);
                let b = dsu.find(v);
                if a == b {
                    continue;
                }
                let (root, absorbed) = dsu.union_roots(a, b);
                let absorbed_list = std::mem::take(&mut to_merge[absorbed as usize]);
                to_merge[root as usize].push(absorbed);
                to_merge[root as usize].extend(absorbed_list);
                modified = true;
            }
        }
    }

    // A vertex that failed its sample but became a merge target meanwhile
    // is re-queried through its merge entry instead of the retry list.
    let mut new_reps: Vec<NodeId> = retries
        .into_iter()
        .filter(|&rep| to_merge[rep as usize].is_empty())
        .collect();
    for root in 0..num_nodes {
        if !to_merge[root as usize].is_empty() {
            new_reps.push(root);
        }
    }
    (new_reps, to_merge, modified)
}

/// Fold every absorbed supernode into its root, one task per root. On the
/// first round of a continuing query each touched root is cloned into the
/// checkpoint before its first mutation.
fn merge_phase(
    core: &GraphCore,
    reps: &[NodeId],
    to_merge: &[Vec<NodeId>],
    checkpoint: &QueryCheckpoint,
    copy_before_merge: bool,
) {
    reps.par_iter().for_each(|&root| {
        if copy_before_merge {
            checkpoint.capture(core, root);
        }
        let merge_list = &to_merge[root as usize];
        if merge_list.is_empty() {
            return;
        }
        let mut target = core.supernodes[root as usize].lock();
        for &absorbed in merge_list {
            let source = core.supernodes[absorbed as usize].lock();
            target.merge(&source);
        }
    });
}

/// One set per DSU root, ordered by root id.
fn collect_components(dsu: &mut DisjointSets, num_nodes: NodeId) -> Vec<BTreeSet<NodeId>> {
    let mut grouped: FxHashMap<NodeId, BTreeSet<NodeId>> = FxHashMap::default();
    for v in 0..num_nodes {
        grouped.entry(dsu.find(v)).or_default().insert(v);
    }
    let mut components: Vec<(NodeId, BTreeSet<NodeId>)> = grouped.into_iter().collect();
    components.sort_unstable_by_key(|(root, _)| *root);
    components.into_iter().map(|(_, set)| set).collect()
}
