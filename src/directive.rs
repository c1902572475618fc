//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-field encoding directives.
//!
//! `tls_struct!` takes a field's directive as tokens, e.g. `[head = 2]`.
//! Descriptors held as text parse with `FromStr`:
//!
//! | Text          | Directive              |
//! |---------------|------------------------|
//! | (none)        | `Default`              |
//! | `varint`      | `Varint`               |
//! | `head=1`..`3` | `Head(1)`..`Head(3)`   |
//! | `head=varint` | `HeadVarint`           |
//! | `head=none`   | `HeadNone`             |
//! | `optional`    | `Optional`             |
//! | `omit`        | `Omit`                 |

use std::fmt;
use std::str::FromStr;

use shape::Error;

/// How a single field is framed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Plain fixed-width or recursive encoding.
    Default,
    /// Encode an unsigned integer as a varint instead of at its fixed width.
    Varint,
    /// Prefix a vector or map with its content length as a big-endian
    /// integer of the given number of bytes (1, 2 or 3).
    Head(u8),
    /// Prefix a vector or map with its content length as a varint.
    HeadVarint,
    /// Write no length prefix; on decode, consume everything left in the
    /// enclosing scope.
    HeadNone,
    /// The field is nullable and carries a one-byte presence flag.
    Optional,
    /// The field never appears on the wire.
    Omit,
}

/// The length prefix of a vector or map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Head {
    /// A big-endian length of this many bytes.
    Fixed(u8),
    /// A varint length.
    Varint,
    /// No length; the content runs to the end of the scope.
    None,
}

impl Default for Directive {
    fn default() -> Self {
        Directive::Default
    }
}

impl Directive {
    /// Returns the framing this directive selects, if it is one of the
    /// `head=` forms.
    pub fn head(self) -> Option<Head> {
        match self {
            Directive::Head(w) if w >= 1 && w <= 3 => Some(Head::Fixed(w)),
            Directive::HeadVarint => Some(Head::Varint),
            Directive::HeadNone => Some(Head::None),
            _ => None,
        }
    }

    /// Parse a field's descriptor, given as one or more pieces of text.
    ///
    /// Each piece may itself hold several comma-separated directives. Blank
    /// directives are ignored, so an empty descriptor yields `Default`; more
    /// than one non-blank directive is a conflict.
    pub fn parse_pieces(pieces: &[&str]) -> Result<Self, Error> {
        let mut found = None;
        for piece in pieces {
            for text in piece.split(',').map(str::trim) {
                if text.is_empty() {
                    continue;
                }
                let directive = text.parse()?;
                if found.is_some() {
                    return Err(Error::Conflicting(pieces.join(",")));
                }
                found = Some(directive);
            }
        }

        Ok(found.unwrap_or(Directive::Default))
    }
}

impl FromStr for Directive {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Error> {
        match text.trim() {
            "" => Ok(Directive::Default),
            "varint" => Ok(Directive::Varint),
            "head=1" => Ok(Directive::Head(1)),
            "head=2" => Ok(Directive::Head(2)),
            "head=3" => Ok(Directive::Head(3)),
            "head=varint" => Ok(Directive::HeadVarint),
            "head=none" => Ok(Directive::HeadNone),
            "optional" => Ok(Directive::Optional),
            "omit" => Ok(Directive::Omit),
            _ => Err(Error::Unknown(text.to_owned())),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Directive::Default => write!(f, "default"),
            Directive::Varint => write!(f, "varint"),
            Directive::Head(w) => write!(f, "head={}", w),
            Directive::HeadVarint => write!(f, "head=varint"),
            Directive::HeadNone => write!(f, "head=none"),
            Directive::Optional => write!(f, "optional"),
            Directive::Omit => write!(f, "omit"),
        }
    }
}
