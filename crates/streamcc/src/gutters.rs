// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! In-memory guttering: per-source append buffers that spill
//! `(src, [dst…])` batches into a shared work queue.
//!
//! Updates to one source vertex always travel through that vertex's gutter
//! and are therefore applied in admission order; different sources proceed
//! independently. `force_flush` blocks until every admitted update has been
//! applied *and acknowledged* by a worker, which is what lets the graph
//! pause the pool without stranding half-applied batches.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use streamcc_common::{Edge, NodeId};

/// A drained gutter: every buffered neighbor of one source vertex.
#[derive(Clone, Debug)]
pub struct Batch {
    pub src: NodeId,
    pub dsts: Vec<NodeId>,
}

/// Result of polling the work queue.
pub enum BatchPoll {
    Batch(Batch),
    /// Nothing queued and the source is in non-blocking mode.
    Empty,
    /// The source is closed and fully drained.
    Closed,
}

/// Contract between the graph, its buffering subsystem and the worker pool.
pub trait BatchSource: Send + Sync {
    /// Enqueue one edge toggle on both endpoints.
    fn insert(&self, edge: Edge);

    /// Block until every admitted update has been applied and acknowledged.
    fn force_flush(&self);

    /// Next batch of work. Blocks unless non-blocking mode is on.
    fn poll_batch(&self) -> BatchPoll;

    /// Acknowledge a fully applied batch.
    fn ack(&self, batch: &Batch);

    /// In non-blocking mode `poll_batch` returns [`BatchPoll::Empty`]
    /// instead of waiting, so parked consumers can observe a pause request.
    fn set_non_block(&self, on: bool);

    /// Refuse further work and wake every blocked consumer.
    fn close(&self);
}

struct QueueState {
    queue: VecDeque<Batch>,
    /// Batches enqueued or mid-application but not yet acknowledged.
    in_flight: usize,
    non_block: bool,
    closed: bool,
}

pub struct StandaloneGutters {
    capacity: usize,
    buffers: Vec<Mutex<Vec<NodeId>>>,
    state: Mutex<QueueState>,
    work_ready: Condvar,
    drained: Condvar,
}

impl StandaloneGutters {
    #[must_use]
    pub fn new(num_nodes: NodeId, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: (0..num_nodes).map(|_| Mutex::new(Vec::new())).collect(),
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                in_flight: 0,
                non_block: false,
                closed: false,
            }),
            work_ready: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    fn enqueue(&self, batch: Batch) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.in_flight += 1;
        state.queue.push_back(batch);
        metrics::counter!("streamcc_gutter_batches_total").increment(1);
        self.work_ready.notify_one();
    }
}

impl BatchSource for StandaloneGutters {
    fn insert(&self, (u, v): Edge) {
        for (src, dst) in [(u, v), (v, u)] {
            let spilled = {
                let mut buffer = self.buffers[src as usize].lock();
                buffer.push(dst);
                if buffer.len() >= self.capacity {
                    Some(Batch {
                        src,
                        dsts: std::mem::take(&mut *buffer),
                    })
                } else {
                    None
                }
            };
            if let Some(batch) = spilled {
                self.enqueue(batch);
            }
        }
    }

    fn force_flush(&self) {
        for (src, buffer) in self.buffers.iter().enumerate() {
            let spilled = {
                let mut buffer = buffer.lock();
                if buffer.is_empty() {
                    None
                } else {
                    Some(Batch {
                        src: src as NodeId,
                        dsts: std::mem::take(&mut *buffer),
                    })
                }
            };
            if let Some(batch) = spilled {
                self.enqueue(batch);
            }
        }
        let mut state = self.state.lock();
        while state.in_flight > 0 {
            self.drained.wait(&mut state);
        }
    }

    fn poll_batch(&self) -> BatchPoll {
        let mut state = self.state.lock();
        loop {
            if let Some(batch) = state.queue.pop_front() {
                return BatchPoll::Batch(batch);
            }
            if state.closed {
                return BatchPoll::Closed;
            }
            if state.non_block {
                return BatchPoll::Empty;
            }
            self.work_ready.wait(&mut state);
        }
    }

    fn ack(&self, _batch: &Batch) {
        let mut state = self.state.lock();
        debug_assert!(state.in_flight > 0, "acknowledged more batches than admitted");
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.drained.notify_all();
        }
    }

    fn set_non_block(&self, on: bool) {
        let mut state = self.state.lock();
        state.non_block = on;
        if on {
            self.work_ready.notify_all();
        }
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.work_ready.notify_all();
    }
}
