// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Pre-query supernode preservation for query continuation.
//!
//! Only the first round's post-plan representatives (merge targets and
//! failed-sample retries) are ever mutated in this or any later round:
//! absorbed vertices are read-only merge sources from then on, and a
//! completed component can never be chosen as a merge target again. Saving
//! exactly that set is therefore enough to restore the pre-query state.
//!
//! The checkpoint is write-once and read-once per query. A checkpoint I/O
//! failure terminates the process: a partially restored graph would be
//! unsafe to continue ingesting into.

use crate::graph::GraphCore;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use streamcc_common::NodeId;
use streamcc_sketch::Supernode;
use tracing::error;

pub(crate) enum QueryCheckpoint {
    /// The query is allowed to consume the supernodes in place.
    Disabled,
    Memory {
        slots: Vec<Mutex<Option<Supernode>>>,
        ids: Vec<NodeId>,
    },
    Disk {
        path: PathBuf,
        ids: Vec<NodeId>,
    },
}

impl QueryCheckpoint {
    pub(crate) fn new(core: &GraphCore, make_copy: bool) -> Self {
        if !make_copy {
            QueryCheckpoint::Disabled
        } else if core.config.copy_in_memory {
            QueryCheckpoint::Memory {
                slots: (0..core.params.num_nodes).map(|_| Mutex::new(None)).collect(),
                ids: Vec::new(),
            }
        } else {
            QueryCheckpoint::Disk {
                path: core.backup_file.clone(),
                ids: Vec::new(),
            }
        }
    }

    /// Record the set of supernodes the query may mutate. The disk variant
    /// writes them out immediately, in `reps` order; the memory variant
    /// defers cloning to [`QueryCheckpoint::capture`] inside the first
    /// merge phase.
    pub(crate) fn save(&mut self, core: &GraphCore, reps: &[NodeId]) {
        match self {
            QueryCheckpoint::Disabled => {}
            QueryCheckpoint::Memory { ids, .. } => {
                *ids = reps.to_vec();
            }
            QueryCheckpoint::Disk { path, ids } => {
                *ids = reps.to_vec();
                let file = File::create(&*path).unwrap_or_else(|err| {
                    error!(%err, path = %path.display(), "cannot create supernode backup");
                    process::exit(1);
                });
                let mut out = BufWriter::new(file);
                let write_all = ids.iter().try_for_each(|&id| {
                    core.supernodes[id as usize].lock().write_binary(&mut out)
                });
                if let Err(err) = write_all.and_then(|()| out.flush()) {
                    error!(%err, path = %path.display(), "cannot write supernode backup");
                    process::exit(1);
                }
            }
        }
    }

    /// Clone `node`'s supernode before its first mutation. Memory variant
    /// only; called from inside the parallel merge phase.
    pub(crate) fn capture(&self, core: &GraphCore, node: NodeId) {
        if let QueryCheckpoint::Memory { slots, .. } = self {
            let mut slot = slots[node as usize].lock();
            if slot.is_none() {
                *slot = Some(core.supernodes[node as usize].lock().clone());
            }
        }
    }

    /// Put every saved supernode back. Runs on both the success and the
    /// error path of the query.
    pub(crate) fn restore(&mut self, core: &GraphCore) {
        match self {
            QueryCheckpoint::Disabled => {}
            QueryCheckpoint::Memory { slots, ids } => {
                for &id in ids.iter() {
                    if let Some(copy) = slots[id as usize].lock().take() {
                        *core.supernodes[id as usize].lock() = copy;
                    }
                }
            }
            QueryCheckpoint::Disk { path, ids } => {
                if ids.is_empty() {
                    // The query failed before anything was backed up.
                    return;
                }
                let file = File::open(&*path).unwrap_or_else(|err| {
                    error!(%err, path = %path.display(), "cannot open supernode backup");
                    process::exit(1);
                });
                let mut input = BufReader::new(file);
                for &id in ids.iter() {
                    let restored =
                        Supernode::read_binary(&core.params, core.seed, &mut input)
                            .unwrap_or_else(|err| {
                                error!(%err, path = %path.display(), "cannot read supernode backup");
                                process::exit(1);
                            });
                    *core.supernodes[id as usize].lock() = restored;
                }
            }
        }
    }
}
