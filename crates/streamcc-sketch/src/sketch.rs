// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! One L0-sampling sketch over the edge coordinate space.
//!
//! The sketch is `num_columns` independent trials, each a stack of nested
//! guess rows: row 0 holds every coordinate and each deeper row halves the
//! expected survivors, so some row's support plausibly collapses to one.
//! Sampling scans for a bucket that survived with exactly one coordinate
//! and re-verifies it against the row hash and the Carter–Wegman checksum,
//! so a wrong answer needs a checksum collision while an outright failure
//! happens with probability at most 1/failure_factor. The deterministic
//! row 0 also makes the Zero answer exact: a nonzero vector always shows
//! up there.

use crate::bucket::Bucket;
use crate::hashing::{check_value, guess_depth};
use crate::params::SketchParams;
use std::io::{Read, Result, Write};
use streamcc_common::io::{read_i64, read_u64, write_i64, write_u64};

/// Outcome of sampling one sketch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SketchSample {
    /// A surviving coordinate was recovered.
    Good(u64),
    /// The sketched vector is empty.
    Zero,
    /// No column produced a decodable bucket; retry with a fresh sketch.
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sketch {
    seed: u64,
    buckets: Box<[Bucket]>,
}

impl Sketch {
    pub fn new(params: &SketchParams, seed: u64) -> Self {
        Self {
            seed,
            buckets: vec![Bucket::default(); params.num_buckets()].into_boxed_slice(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Zero every bucket, keeping seed and shape.
    pub fn clear(&mut self) {
        self.buckets.fill(Bucket::default());
    }

    fn slot(params: &SketchParams, col: u32, guess: u32) -> usize {
        col as usize * params.num_guesses as usize + guess as usize
    }

    /// Toggle coordinate `idx`. Insertion and deletion are the same
    /// operation in the symmetric-difference stream.
    pub fn update(&mut self, params: &SketchParams, idx: u64) {
        debug_assert!(idx < params.dimension, "edge id {idx} outside sketch");
        let check = check_value(self.seed, idx);
        for col in 0..params.num_columns {
            let depth = guess_depth(self.seed, col, idx).min(params.num_guesses);
            for guess in 0..depth {
                self.buckets[Self::slot(params, col, guess)].toggle(idx, check);
            }
        }
    }

    /// Bucket-wise addition of `other`, which must share seed and shape.
    pub fn merge(&mut self, other: &Sketch) {
        debug_assert_eq!(self.seed, other.seed, "merging incompatible sketches");
        debug_assert_eq!(self.buckets.len(), other.buckets.len());
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            mine.merge(theirs);
        }
    }

    /// Sample a surviving coordinate. Read-only: repeated calls return the
    /// same answer.
    pub fn sample(&self, params: &SketchParams) -> SketchSample {
        if self.buckets.iter().all(Bucket::is_zero) {
            return SketchSample::Zero;
        }
        for col in 0..params.num_columns {
            for guess in 0..params.num_guesses {
                let bucket = &self.buckets[Self::slot(params, col, guess)];
                let Some(idx) = bucket.single() else { continue };
                if idx < params.dimension
                    && guess_depth(self.seed, col, idx) > guess
                    && bucket.c == check_value(self.seed, idx)
                {
                    return SketchSample::Good(idx);
                }
            }
        }
        SketchSample::Fail
    }

    pub fn write_binary<W: Write>(&self, out: &mut W) -> Result<()> {
        for bucket in self.buckets.iter() {
            write_i64(out, bucket.a)?;
            write_i64(out, bucket.b)?;
            write_u64(out, bucket.c)?;
        }
        Ok(())
    }

    pub fn read_binary<R: Read>(params: &SketchParams, seed: u64, input: &mut R) -> Result<Self> {
        let mut sketch = Self::new(params, seed);
        for bucket in sketch.buckets.iter_mut() {
            bucket.a = read_i64(input)?;
            bucket.b = read_i64(input)?;
            bucket.c = read_u64(input)?;
        }
        Ok(sketch)
    }
}
