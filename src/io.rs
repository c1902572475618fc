//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The decoding cursor.

use std::error;
use std::fmt;

/// Error returned when a read needs more bytes than the current scope holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncated {
    /// The number of bytes the read required.
    pub needed: usize,
    /// The number of bytes that were left in the scope.
    pub available: usize,
}

impl fmt::Display for Truncated {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "needed {} bytes but only {} remain",
               self.needed, self.available)
    }
}

impl error::Error for Truncated {
    fn description(&self) -> &str {
        "input truncated"
    }
}

/// A read position within an immutable input buffer.
///
/// A `Cursor` only ever sees its own *scope*. `split()` carves the next `n`
/// bytes out as a child cursor and advances the parent past them, so a
/// length-prefixed region can be decoded without any chance of reading past
/// its end. Positions reported by `pos()` are absolute offsets into the
/// top-level input regardless of nesting, which keeps error messages
/// meaningful.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    data: &'a [u8],
    read: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor over the whole of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data: data, read: 0, base: 0 }
    }

    /// Returns the absolute offset of the next byte to be read.
    #[inline]
    pub fn pos(&self) -> usize {
        self.base + self.read
    }

    /// Returns the number of bytes consumed from this scope so far.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.read
    }

    /// Returns the number of unconsumed bytes in this scope.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read
    }

    /// Returns whether this scope has been fully consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        0 == self.remaining()
    }

    /// Returns the unconsumed bytes of this scope without consuming them.
    ///
    /// The returned slice borrows the input, not the cursor.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.read..]
    }

    fn check(&self, n: usize) -> Result<(), Truncated> {
        if n > self.remaining() {
            Err(Truncated { needed: n, available: self.remaining() })
        } else {
            Ok(())
        }
    }

    /// Consume exactly `n` bytes, returning them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], Truncated> {
        self.check(n)?;
        let data: &'a [u8] = self.data;
        let taken = &data[self.read..self.read + n];
        self.read += n;
        Ok(taken)
    }

    /// Consume a single byte.
    pub fn read_byte(&mut self) -> Result<u8, Truncated> {
        self.take(1).map(|b| b[0])
    }

    /// Skip `n` bytes.
    pub fn advance(&mut self, n: usize) -> Result<(), Truncated> {
        self.take(n).map(|_| ())
    }

    /// Split the next `n` bytes off into a child scope.
    ///
    /// On success, `self` is positioned after the child's bytes, whether or
    /// not the child is ever read. On failure nothing is consumed.
    pub fn split(&mut self, n: usize) -> Result<Cursor<'a>, Truncated> {
        let base = self.pos();
        let data = self.take(n)?;
        Ok(Cursor { data: data, read: 0, base: base })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn take_advances_and_reports_truncation() {
        let data = [1u8, 2, 3];
        let mut cursor = Cursor::new(&data);
        assert_eq!(&[1u8, 2][..], cursor.take(2).unwrap());
        assert_eq!(2, cursor.pos());
        assert_eq!(Err(Truncated { needed: 2, available: 1 }),
                   cursor.take(2));
        // A failed read consumes nothing
        assert_eq!(1, cursor.remaining());
        assert_eq!(Ok(3), cursor.read_byte());
        assert!(cursor.is_empty());
    }

    #[test]
    fn split_scopes_are_bounded_and_absolute() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = Cursor::new(&data);
        cursor.advance(1).unwrap();

        let mut child = cursor.split(2).unwrap();
        assert_eq!(3, cursor.pos());
        assert_eq!(1, child.pos());
        assert_eq!(&[2u8, 3][..], child.rest());
        assert_eq!(Err(Truncated { needed: 3, available: 2 }),
                   child.take(3));
        child.advance(1).unwrap();
        assert_eq!(2, child.pos());
        assert_eq!(1, child.consumed());

        assert!(cursor.split(3).is_err());
        assert_eq!(2, cursor.remaining());
    }
}
