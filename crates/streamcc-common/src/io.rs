// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Little-endian primitives for the packed binary dump format.
//!
//! The dump layout is fixed-width with no framing or checksums, so these
//! helpers are all the codec there is.

use std::io::{Read, Result, Write};

pub fn write_u32<W: Write>(out: &mut W, value: u32) -> Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub fn write_u64<W: Write>(out: &mut W, value: u64) -> Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub fn write_i64<W: Write>(out: &mut W, value: i64) -> Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub fn read_u32<R: Read>(input: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_u64<R: Read>(input: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn read_i64<R: Read>(input: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}
