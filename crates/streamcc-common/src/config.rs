// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use std::path::PathBuf;
use std::thread;

/// Construction-time knobs for a streaming connectivity graph.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Buffer raw stream updates on disk instead of in memory (default: false).
    ///
    /// Disk-backed guttering is provided by an external subsystem that this
    /// crate does not ship; requesting it logs a warning and falls back to
    /// the in-memory gutters.
    pub use_disk_buffer: bool,

    /// Keep the pre-query supernode checkpoint in memory (default: true).
    /// When false, the checkpoint is written to `supernode_backup.data`
    /// under `disk_location`.
    pub copy_in_memory: bool,

    /// Directory holding the on-disk checkpoint scratch file
    /// (default: the system temp directory).
    pub disk_location: PathBuf,

    /// Number of worker groups applying gutter batches
    /// (default: available parallelism).
    pub num_worker_groups: usize,

    /// Updates buffered per source vertex before a batch is emitted
    /// (default: 256).
    pub gutter_capacity: usize,

    /// Failure factor F: a single sketch sample fails with probability at
    /// most 1/F (default: 1024). Larger values cost one extra bucket column
    /// per doubling.
    pub failure_factor: u64,

    /// Fixed sketch seed. `None` draws a random seed at construction;
    /// tests and the retry-after-`OutOfQueries` path set it explicitly.
    pub seed: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        let parallelism = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Self {
            use_disk_buffer: false,
            copy_in_memory: true,
            disk_location: std::env::temp_dir(),
            num_worker_groups: parallelism,
            gutter_capacity: 256,
            failure_factor: 1024,
            seed: None,
        }
    }
}

impl StreamConfig {
    /// Config with a pinned seed, for reproducible runs.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}
