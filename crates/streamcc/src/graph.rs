// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! The streaming connectivity graph: ingest orchestration, the
//! connectivity query entry point and the binary dump format.

use crate::boruvka;
use crate::dsu::DisjointSets;
use crate::gutters::{BatchSource, StandaloneGutters};
use crate::workers::WorkerPool;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use streamcc_common::config::StreamConfig;
use streamcc_common::error::{GraphError, Result};
use streamcc_common::io::{read_u32, read_u64, write_u32, write_u64};
use streamcc_common::{Edge, NodeId};
use streamcc_sketch::{SketchParams, Supernode};
use tracing::{info, instrument, warn};

/// Whether a stream update adds or removes an edge. Both flip the edge's
/// coordinate in the symmetric-difference stream; the distinction only
/// matters to callers mirroring an external edge list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Insert,
    Delete,
}

impl UpdateOp {
    fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Insert => "insert",
            UpdateOp::Delete => "delete",
        }
    }
}

/// State shared between the graph handle, its worker pool and the query
/// driver.
pub struct GraphCore {
    pub(crate) params: SketchParams,
    pub(crate) seed: u64,
    pub(crate) config: StreamConfig,
    pub(crate) backup_file: PathBuf,
    /// One lock per vertex: the ingest path serializes on the source vertex
    /// and the query phases serialize on the round structure, so contention
    /// is incidental, but the locks make the aliasing rules explicit.
    pub(crate) supernodes: Vec<Mutex<Supernode>>,
    pub(crate) dsu: Mutex<DisjointSets>,
    pub(crate) num_updates: AtomicU64,
    pub(crate) update_locked: AtomicBool,
}

impl GraphCore {
    /// A scratch supernode compatible with this graph's sketches, for use
    /// as the delta target of [`GraphCore::batch_update`].
    pub fn make_scratch(&self) -> Supernode {
        Supernode::new(&self.params, self.seed)
    }

    /// Apply one `(src, [dst…])` batch: generate the delta supernode into
    /// `scratch` and fold it into `src`'s live supernode.
    ///
    /// # Errors
    ///
    /// [`GraphError::UpdateLocked`] after a non-continuing query.
    pub fn batch_update(
        &self,
        src: NodeId,
        dsts: &[NodeId],
        scratch: &mut Supernode,
    ) -> Result<()> {
        if self.update_locked.load(Ordering::Acquire) {
            return Err(GraphError::UpdateLocked);
        }
        self.num_updates
            .fetch_add(dsts.len() as u64, Ordering::Relaxed);
        Supernode::generate_delta(&self.params, src, dsts, scratch);
        self.supernodes[src as usize].lock().apply_delta(scratch);
        Ok(())
    }
}

/// Connected components of a fully dynamic edge stream.
///
/// Updates are buffered in per-vertex gutters and applied by a background
/// worker pool; [`Graph::connected_components`] flushes and pauses that
/// pipeline, runs the Borůvka emulation over the sketches and, when asked
/// to continue, restores the pre-query supernodes so ingestion can resume.
pub struct Graph {
    core: Arc<GraphCore>,
    gutters: Arc<StandaloneGutters>,
    pool: WorkerPool,
    /// Queries are exclusive: the checkpoint is write-once/read-once.
    query_lock: Mutex<()>,
}

impl Graph {
    /// An empty graph on `num_nodes` vertices.
    pub fn new(num_nodes: NodeId, config: StreamConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let params = SketchParams::new(num_nodes, config.failure_factor);
        let supernodes = (0..num_nodes)
            .map(|_| Mutex::new(Supernode::new(&params, seed)))
            .collect();
        Self::assemble(params, seed, config, supernodes)
    }

    /// Rebuild a graph from a binary dump written by
    /// [`Graph::write_binary`]. The sketch shape (vertex count and failure
    /// factor) comes from the file; `config.failure_factor` and
    /// `config.seed` are ignored.
    pub fn load(path: impl AsRef<Path>, config: StreamConfig) -> Result<Self> {
        let mut input = BufReader::new(File::open(path)?);
        let seed = read_u64(&mut input)?;
        let num_nodes = read_u32(&mut input)?;
        let failure_factor = read_u64(&mut input)?;
        if num_nodes < 2 || failure_factor < 2 {
            return Err(GraphError::Corrupted {
                message: format!(
                    "implausible header: {num_nodes} vertices, failure factor {failure_factor}"
                ),
            });
        }
        let params = SketchParams::new(num_nodes, failure_factor);
        let mut supernodes = Vec::with_capacity(num_nodes as usize);
        for _ in 0..num_nodes {
            supernodes.push(Mutex::new(Supernode::read_binary(&params, seed, &mut input)?));
        }
        Ok(Self::assemble(params, seed, config, supernodes))
    }

    fn assemble(
        params: SketchParams,
        seed: u64,
        config: StreamConfig,
        supernodes: Vec<Mutex<Supernode>>,
    ) -> Self {
        if config.use_disk_buffer {
            warn!("disk-backed guttering is not available; using in-memory gutters");
        }
        let backup_file = config.disk_location.join("supernode_backup.data");
        let num_nodes = params.num_nodes;
        let core = Arc::new(GraphCore {
            params,
            seed,
            backup_file,
            supernodes,
            dsu: Mutex::new(DisjointSets::new(num_nodes)),
            num_updates: AtomicU64::new(0),
            update_locked: AtomicBool::new(false),
            config,
        });
        let gutters = Arc::new(StandaloneGutters::new(
            num_nodes,
            core.config.gutter_capacity,
        ));
        let pool = WorkerPool::start(
            Arc::clone(&core),
            Arc::clone(&gutters) as Arc<dyn BatchSource>,
            core.config.num_worker_groups,
        );
        info!(
            num_nodes,
            seed,
            workers = pool.num_groups(),
            "streaming graph ready"
        );
        Self {
            core,
            gutters,
            pool,
            query_lock: Mutex::new(()),
        }
    }

    pub fn num_nodes(&self) -> NodeId {
        self.core.params.num_nodes
    }

    pub fn seed(&self) -> u64 {
        self.core.seed
    }

    /// Sketch updates applied so far (both endpoints of an edge count).
    pub fn num_updates(&self) -> u64 {
        self.core.num_updates.load(Ordering::Relaxed)
    }

    pub fn num_worker_groups(&self) -> usize {
        self.pool.num_groups()
    }

    /// A scratch supernode for [`Graph::batch_update`].
    pub fn make_scratch(&self) -> Supernode {
        self.core.make_scratch()
    }

    /// Route one edge update through the gutters; both endpoints receive
    /// the toggle.
    ///
    /// # Errors
    ///
    /// [`GraphError::UpdateLocked`] after a non-continuing query.
    ///
    /// # Panics
    ///
    /// Panics on a self-loop or an endpoint outside `[0, n)`.
    pub fn update(&self, edge: Edge, op: UpdateOp) -> Result<()> {
        let (u, v) = edge;
        let num_nodes = self.core.params.num_nodes;
        assert_ne!(u, v, "self-loop {u}-{v} is not a streamable edge");
        assert!(
            u < num_nodes && v < num_nodes,
            "edge {u}-{v} outside vertex set [0, {num_nodes})"
        );
        if self.core.update_locked.load(Ordering::Acquire) {
            return Err(GraphError::UpdateLocked);
        }
        metrics::counter!("streamcc_stream_updates_total", "op" => op.as_str()).increment(1);
        self.gutters.insert(edge);
        Ok(())
    }

    /// Apply a pre-grouped batch synchronously, bypassing the gutters.
    /// Every endpoint must lie in `[0, n)` and differ from `src`.
    pub fn batch_update(
        &self,
        src: NodeId,
        dsts: &[NodeId],
        scratch: &mut Supernode,
    ) -> Result<()> {
        self.core.batch_update(src, dsts, scratch)
    }

    /// Connected components of the edge set streamed so far.
    ///
    /// Flushes the gutters, pauses the worker pool and runs the Borůvka
    /// emulation. With `continue_after` the pre-query supernodes are
    /// preserved (in memory or on disk per the configuration) and restored
    /// afterwards, the DSU is re-identified and ingestion resumes; without
    /// it the query may consume the sketches in place and the graph stays
    /// locked for updates.
    ///
    /// # Errors
    ///
    /// [`GraphError::OutOfQueries`] when the sketches run dry before
    /// convergence; rebuild with a fresh seed and replay the stream.
    #[instrument(skip(self), fields(num_nodes = self.core.params.num_nodes, updates))]
    pub fn connected_components(&self, continue_after: bool) -> Result<Vec<BTreeSet<NodeId>>> {
        let _query = self.query_lock.lock();
        self.gutters.force_flush();
        self.pool.pause();
        tracing::Span::current().record("updates", self.num_updates());
        self.core.update_locked.store(true, Ordering::Release);

        let outcome = boruvka::run(&self.core, continue_after);

        if continue_after {
            // Rewind for the next query and reopen ingestion, even when the
            // query failed: the checkpoint restore already ran.
            for supernode in &self.core.supernodes {
                supernode.lock().reset_query_state();
            }
            self.core.dsu.lock().reset();
            self.core.update_locked.store(false, Ordering::Release);
            self.pool.resume();
        }

        let components = outcome?;
        info!(components = components.len(), "connectivity query finished");
        Ok(components)
    }

    /// Dump the graph to `path` in the packed little-endian layout. All
    /// admitted updates are flushed and applied first.
    #[instrument(skip(self, path))]
    pub fn write_binary(&self, path: impl AsRef<Path>) -> Result<()> {
        let _query = self.query_lock.lock();
        self.gutters.force_flush();
        self.pool.pause();
        let outcome = self.write_supernodes(path.as_ref());
        if !self.core.update_locked.load(Ordering::Acquire) {
            self.pool.resume();
        }
        outcome
    }

    fn write_supernodes(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write_u64(&mut out, self.core.seed)?;
        write_u32(&mut out, self.core.params.num_nodes)?;
        write_u64(&mut out, self.core.params.failure_factor)?;
        for supernode in &self.core.supernodes {
            supernode.lock().write_binary(&mut out)?;
        }
        out.flush()?;
        Ok(())
    }
}
