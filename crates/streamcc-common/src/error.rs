// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// The graph stopped accepting updates after a connectivity query that
    /// was not asked to continue.
    #[error("graph is locked for updates after a non-continuing connectivity query")]
    UpdateLocked,

    /// Every sketch of some supernode was consumed before the component
    /// merging converged. The documented remedy is to rebuild the graph
    /// with a fresh seed and replay the stream.
    #[error("supernode sketches exhausted before convergence; retry with a fresh seed")]
    OutOfQueries,

    /// A binary graph dump did not decode to a plausible graph.
    #[error("graph dump is truncated or malformed: {message}")]
    Corrupted { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
