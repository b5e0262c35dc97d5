// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Seeded hashing for bucket membership and checksums.
//!
//! Everything downstream (mergeability, the binary dump format, query
//! replay) depends on these functions being pure in `(seed, input)`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Carter–Wegman modulus: the Mersenne prime 2^61 - 1.
pub const CHECK_PRIME: u64 = (1 << 61) - 1;

const CHECK_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Deterministic 64-bit hash of `item` under `seed`.
pub fn seeded_hash64<T: Hash>(item: &T, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    item.hash(&mut hasher);
    hasher.finish()
}

/// Depth of coordinate `idx` in `col`'s nested guess rows: the coordinate
/// belongs to every row `g < depth`. Row 0 holds every coordinate (depth
/// is always ≥ 1) so an empty row 0 certifies an empty vector; each deeper
/// row keeps a coordinate with probability 1/2, i.e. P(member of row g) =
/// 2^-g.
pub fn guess_depth(seed: u64, col: u32, idx: u64) -> u32 {
    seeded_hash64(&(col, idx), seed).trailing_zeros() + 1
}

/// Check value r(idx) accumulated into bucket checksums, reduced modulo
/// [`CHECK_PRIME`].
pub fn check_value(seed: u64, idx: u64) -> u64 {
    seeded_hash64(&idx, seed ^ CHECK_SALT) % CHECK_PRIME
}
