// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Worker pool applying gutter batches to the graph.
//!
//! Each worker owns one scratch supernode, so delta generation never
//! allocates on the ingest path. Pausing parks every worker between
//! batches: the pool flips the batch source into non-blocking mode so
//! consumers waiting for work wake up and observe the pause request.

use crate::graph::GraphCore;
use crate::gutters::{BatchPoll, BatchSource};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use streamcc_sketch::Supernode;
use tracing::{debug, error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Run,
    Pause,
    Stop,
}

struct PoolState {
    command: Command,
    parked: usize,
}

struct PoolShared {
    state: Mutex<PoolState>,
    command_changed: Condvar,
    parked_changed: Condvar,
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    source: Arc<dyn BatchSource>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `num_groups` workers pulling from `source` and applying into
    /// `core`.
    pub fn start(
        core: Arc<GraphCore>,
        source: Arc<dyn BatchSource>,
        num_groups: usize,
    ) -> Self {
        let num_groups = num_groups.max(1);
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                command: Command::Run,
                parked: 0,
            }),
            command_changed: Condvar::new(),
            parked_changed: Condvar::new(),
        });
        let handles = (0..num_groups)
            .map(|group| {
                let core = Arc::clone(&core);
                let source = Arc::clone(&source);
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("streamcc-worker-{group}"))
                    .spawn(move || worker_loop(group, &core, source.as_ref(), &shared))
                    .expect("failed to spawn graph worker")
            })
            .collect();
        Self {
            shared,
            source,
            handles,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.handles.len()
    }

    /// Park every worker between batches. Callers drain the batch source
    /// first (`force_flush`), so no admitted update is left unapplied when
    /// this returns. Idempotent.
    pub fn pause(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.command == Command::Stop {
                return;
            }
            state.command = Command::Pause;
            self.shared.command_changed.notify_all();
        }
        // Wake consumers blocked on an empty queue so they can park.
        self.source.set_non_block(true);
        let mut state = self.shared.state.lock();
        while state.parked < self.handles.len() && state.command == Command::Pause {
            self.shared.parked_changed.wait(&mut state);
        }
    }

    /// Unpark the workers after a pause. Idempotent.
    pub fn resume(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.command != Command::Pause {
                return;
            }
            state.command = Command::Run;
            self.shared.command_changed.notify_all();
        }
        self.source.set_non_block(false);
    }

    /// Close the source, stop every worker and join them.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.command = Command::Stop;
            self.shared.command_changed.notify_all();
        }
        self.source.close();
        for handle in self.handles.drain(..) {
            if let Err(panic) = handle.join() {
                error!(?panic, "graph worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    group: usize,
    core: &GraphCore,
    source: &dyn BatchSource,
    shared: &PoolShared,
) {
    debug!(group, "graph worker started");
    let mut scratch = core.make_scratch();
    loop {
        {
            let mut state = shared.state.lock();
            loop {
                match state.command {
                    Command::Run => break,
                    Command::Stop => {
                        debug!(group, "graph worker stopping");
                        return;
                    }
                    Command::Pause => {
                        state.parked += 1;
                        shared.parked_changed.notify_all();
                        shared.command_changed.wait(&mut state);
                        state.parked -= 1;
                    }
                }
            }
        }
        match source.poll_batch() {
            BatchPoll::Batch(batch) => {
                if let Err(err) = core.batch_update(batch.src, &batch.dsts, &mut scratch) {
                    // Unreachable under the pause discipline; drop the batch
                    // rather than poison the pool.
                    error!(group, src = batch.src, %err, "dropping batch");
                }
                source.ack(&batch);
            }
            BatchPoll::Empty => {}
            BatchPoll::Closed => {
                debug!(group, "batch source closed");
                return;
            }
        }
    }
}
