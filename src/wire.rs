//-
// Copyright 2017, Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Low-level definitions for working with the wire format.
//!
//! This covers the two integer encodings everything else is built from:
//! fixed-width big-endian unsigned integers, and the variable-length integers
//! of RFC 9000 §16 (which TLS 1.3 derivatives such as MLS also use).
//!
//! External code generally should not use things from this module; instead,
//! prefer the `ser` and `de` modules.

use std::error;
use std::fmt;

use io::{Cursor, Truncated};

/// The largest value representable as a varint.
pub const VARINT_MAX: u64 = (1 << 62) - 1;

/// Error returned when a value does not fit the encoding chosen for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    /// The value that was to be encoded.
    pub value: u64,
    /// The largest value the encoding can represent.
    pub max: u64,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "value {} exceeds encodable maximum {}",
               self.value, self.max)
    }
}

impl error::Error for Overflow {
    fn description(&self) -> &str {
        "value too large for its encoding"
    }
}

/// Returns the largest value representable in `width` bytes.
#[inline]
pub fn uint_max(width: usize) -> u64 {
    if width >= 8 {
        !0u64
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// Encode `n` as a big-endian unsigned integer occupying exactly `width`
/// bytes.
pub fn encode_uint(dst: &mut Vec<u8>, n: u64, width: usize)
                   -> Result<(), Overflow> {
    debug_assert!(width >= 1 && width <= 8);
    let max = uint_max(width);
    if n > max {
        return Err(Overflow { value: n, max: max });
    }

    let bytes = [(n >> 56) as u8, (n >> 48) as u8, (n >> 40) as u8,
                 (n >> 32) as u8, (n >> 24) as u8, (n >> 16) as u8,
                 (n >> 8) as u8, n as u8];
    dst.extend_from_slice(&bytes[8 - width..]);
    Ok(())
}

/// Decode a big-endian unsigned integer of exactly `width` bytes.
pub fn decode_uint(src: &mut Cursor, width: usize) -> Result<u64, Truncated> {
    debug_assert!(width >= 1 && width <= 8);
    Ok(src.take(width)?.iter().fold(0u64, |accum, &b| {
        (accum << 8) | b as u64
    }))
}

/// Returns the number of bytes the minimal varint encoding of `n` occupies,
/// or `None` if `n` cannot be encoded as a varint at all.
pub fn varint_len(n: u64) -> Option<usize> {
    if n < 1 << 6 {
        Some(1)
    } else if n < 1 << 14 {
        Some(2)
    } else if n < 1 << 30 {
        Some(4)
    } else if n <= VARINT_MAX {
        Some(8)
    } else {
        None
    }
}

/// Encode `n` as a varint, always selecting the shortest length class that
/// can hold it.
pub fn encode_varint(dst: &mut Vec<u8>, n: u64) -> Result<(), Overflow> {
    let len = varint_len(n).ok_or(Overflow { value: n, max: VARINT_MAX })?;
    let class = match len {
        1 => 0x00,
        2 => 0x40,
        4 => 0x80,
        _ => 0xC0,
    };

    let start = dst.len();
    encode_uint(dst, n, len)?;
    dst[start] |= class;
    Ok(())
}

/// Decode a varint.
///
/// Non-minimal encodings are accepted.
pub fn decode_varint(src: &mut Cursor) -> Result<u64, Truncated> {
    let first = match src.rest().first() {
        Some(&b) => b,
        None => return Err(Truncated { needed: 1, available: 0 }),
    };
    let len = 1usize << (first >> 6);
    let raw = decode_uint(src, len)?;
    Ok(raw & (uint_max(len) >> 2))
}
