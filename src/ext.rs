//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hooks for types which supply their own wire representation.
//!
//! A type implementing `CustomEncode` and/or `CustomDecode` is registered
//! with `tls_custom!`, after which it resolves to `TypeShape::Custom` and can
//! be used anywhere a built-in type can, including as a struct field, a
//! vector element or behind an `optional` directive.

use std::any::type_name;
use std::error;

use quick_error::ResultExt;

use de::{self, Context};
use io::Cursor;
use ser;
use shape::TypeShape;

/// Boxed error returned by hooks.
pub type BoxError = Box<dyn error::Error + Send + Sync>;

/// Custom encoding of a type.
pub trait CustomEncode {
    /// Returns the complete wire form of this value.
    ///
    /// The bytes are written out verbatim; nothing frames them, so the
    /// encoding must carry whatever the decoder needs to find its end.
    fn encode_custom(&self) -> Result<Vec<u8>, BoxError>;

    /// Checks whether this value may be transmitted.
    ///
    /// Called immediately before `encode_custom`. By default accepts
    /// everything.
    fn validate(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Custom decoding of a type.
pub trait CustomDecode : Sized {
    /// Decodes a value from the front of `data`, which holds everything left
    /// in the current scope.
    ///
    /// Returns the number of bytes consumed along with the value. The value
    /// must not borrow from `data`.
    fn decode_custom(data: &[u8]) -> Result<(usize, Self), BoxError>;
}

/// Encodes `value` through its `CustomEncode` implementation.
pub fn marshal<T : CustomEncode + ?Sized>(value: &T, shape: &TypeShape,
                                           dst: &mut Vec<u8>)
                                           -> ser::Result<()> {
    match *shape {
        TypeShape::Custom => {
            let encoded = value.encode_custom().map_err(
                |err| ser::Error::Custom(type_name::<T>(), err))?;
            dst.extend_from_slice(&encoded);
            Ok(())
        },
        ref s => Err(ser::mismatch::<T>(s)),
    }
}

/// Decodes a value through its `CustomDecode` implementation.
///
/// The count reported by the hook is checked against what was actually
/// available before the cursor is advanced.
pub fn unmarshal<T : CustomDecode>(context: &Context, shape: &TypeShape,
                                   src: &mut Cursor) -> de::Result<T> {
    if TypeShape::Custom != *shape {
        return Err(context.mismatch::<T>(shape));
    }

    let available = src.remaining();
    let (consumed, value) = T::decode_custom(src.rest()).map_err(
        |err| de::Error::Custom(context.to_string(), err))?;
    if consumed > available {
        debug!("custom decoder for {} claimed {} of {} bytes at {}",
               type_name::<T>(), consumed, available, context);
        return Err(de::Error::CursorOverrun(
            context.to_string(), consumed, available));
    }

    src.advance(consumed).context(context)?;
    Ok(value)
}
