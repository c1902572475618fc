//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A codec for the TLS presentation language (RFC 8446 section 3).
//!
//! Values are marshalled into the canonical byte sequence described by their
//! type and per-field directives, and unmarshalled back. The encoding
//! carries no type information: both sides must agree on the structure.
//!
//! - Unsigned integers are written big-endian at their natural width, or as
//!   QUIC-style varints (RFC 9000 section 16) with the `varint` directive.
//! - Fixed-size arrays are their elements back to back.
//! - Vectors and maps are prefixed by their content length in bytes, as
//!   selected by a `head=1`, `head=2`, `head=3`, `head=varint` or
//!   `head=none` directive. Map entries are ordered by the bytes of their
//!   encoded keys, so equal maps always encode identically.
//! - Structs are their fields in declaration order. `omit` leaves a field
//!   off the wire.
//! - `Option` with the `optional` directive is preceded by a presence byte;
//!   otherwise `Option` and `Box` are transparent.
//! - Types can supply their own encoding through the hooks in `ext`.
//!
//! Structs are made encodable with `tls_struct!`:
//!
//! ```
//! #[macro_use] extern crate tls_syntax;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Hello {
//!     version: u16,
//!     random: [u8; 4],
//!     suites: Vec<u16>,
//!     session: Option<u32>,
//! }
//!
//! tls_struct!(struct Hello {
//!     [] version: u16,
//!     [] random: [u8; 4],
//!     [head = 1] suites: Vec<u16>,
//!     [optional] session: Option<u32>,
//! });
//!
//! # fn main() {
//! let hello = Hello {
//!     version: 0x0303,
//!     random: [1, 2, 3, 4],
//!     suites: vec![0x1301, 0x1302],
//!     session: None,
//! };
//! let encoded = tls_syntax::marshal(&hello).unwrap();
//! assert_eq!(vec![0x03, 0x03, 1, 2, 3, 4, 4, 0x13, 0x01, 0x13, 0x02, 0],
//!            encoded);
//!
//! let (consumed, decoded) = tls_syntax::unmarshal::<Hello>(&encoded)
//!     .unwrap();
//! assert_eq!(encoded.len(), consumed);
//! assert_eq!(hello, decoded);
//! # }
//! ```

#![deny(missing_docs)]

#[macro_use] extern crate quick_error;
#[macro_use] extern crate log;

#[macro_use] mod sugar;

pub mod io;
pub mod wire;
pub mod directive;
pub mod shape;
pub mod ext;
pub mod ser;
pub mod de;

#[cfg(test)] mod test_helpers;
#[cfg(test)] mod ser_des_builtin_tests;

pub use de::{Config, Unmarshal};
pub use directive::Directive;
pub use ext::{BoxError, CustomDecode, CustomEncode};
pub use ser::Marshal;
pub use shape::{Shaped, TypeShape};

/// Encodes `value` into a new byte vector.
pub fn marshal<T : Marshal>(value: &T) -> ser::Result<Vec<u8>> {
    ser::to_vec(value)
}

/// Encodes `value`, framed by `directive`, into a new byte vector.
pub fn marshal_with<T : Marshal>(value: &T, directive: Directive)
                                 -> ser::Result<Vec<u8>> {
    ser::to_vec_with(value, directive)
}

/// Decodes a value of type `T` from the front of `data`.
///
/// Returns the number of bytes consumed with the value. Trailing bytes are
/// not an error.
pub fn unmarshal<T : Unmarshal>(data: &[u8]) -> de::Result<(usize, T)> {
    de::from_slice(data)
}

/// Decodes a value of type `T`, framed by `directive`, from the front of
/// `data` under the given configuration.
pub fn unmarshal_with<T : Unmarshal>(data: &[u8], directive: Directive,
                                     config: &Config)
                                     -> de::Result<(usize, T)> {
    de::from_slice_with(data, directive, config)
}

/// Decodes a value from the front of `data` into `target`, returning the
/// number of bytes consumed.
pub fn unmarshal_into<T : Unmarshal>(data: &[u8], target: &mut T)
                                     -> de::Result<usize> {
    de::from_slice_into(data, target)
}

/// Decodes a value of type `T` which must occupy the whole of `data`.
pub fn unmarshal_exact<T : Unmarshal>(data: &[u8]) -> de::Result<T> {
    de::from_slice_exact(data)
}
