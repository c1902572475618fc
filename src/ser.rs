//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The encoder: the `Marshal` trait, framing helpers and built-in
//! implementations.

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::slice;

use directive::{Directive, Head};
use ext::BoxError;
use shape::{self, FieldShape, Shaped, TypeShape};
use wire;

quick_error! {
    /// Errors that can be produced during serialisation.
    #[derive(Debug)]
    pub enum Error {
        /// The directives of the type being encoded are invalid.
        InvalidDirective(err: shape::Error) {
            description("invalid directive")
            display("invalid directive: {}", err)
            cause(err)
            from()
        }
        /// A pointer without the `optional` directive had no value.
        NilRequiredPointer(ty: &'static str) {
            description("required pointer is nil")
            display("{} without optional directive is None", ty)
        }
        /// A value was rejected by its type's validation hook.
        ValidationFailed(ty: &'static str, err: BoxError) {
            description("validation failed")
            display("{} failed validation: {}", ty, err)
        }
        /// An integer or a length header did not fit in its encoding.
        Overflow(err: wire::Overflow) {
            description("value too large for its encoding")
            display("{}", err)
            cause(err)
            from()
        }
        /// Two keys of a map encoded to the same bytes.
        DuplicateKey(ty: &'static str) {
            description("duplicate map key")
            display("two keys of {} have the same encoding", ty)
        }
        /// A custom encoder failed.
        Custom(ty: &'static str, err: BoxError) {
            description("custom encoding failed")
            display("custom encoding of {} failed: {}", ty, err)
        }
        /// A type was asked to encode itself with a shape it did not
        /// resolve to.
        ShapeMismatch(ty: &'static str, kind: &'static str) {
            description("shape does not match type")
            display("{} cannot be encoded as {}", ty, kind)
        }
    }
}

/// The general result type returned by serialising functions.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Trait for encoding values into the wire format.
///
/// Implementations walk the value alongside the `TypeShape` the type
/// resolved to. Implementations for structs and custom types are normally
/// generated by `tls_struct!` and `tls_custom!`.
pub trait Marshal : Shaped {
    /// Checks whether this value may be transmitted.
    ///
    /// `encode` calls this before anything of the value is written. By
    /// default accepts everything.
    fn validate(&self) -> ::std::result::Result<(), BoxError> {
        Ok(())
    }

    /// Appends the encoding of this value, as described by `shape`, to
    /// `dst`.
    ///
    /// Nested values should be written with `encode` so that their own
    /// validation runs.
    fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                      -> Result<()>;
}

/// Encodes `value` as a top-level value.
///
/// On error nothing is returned, even if part of the value was encoded.
pub fn to_vec<T : Marshal>(value: &T) -> Result<Vec<u8>> {
    to_vec_with(value, Directive::Default)
}

/// Encodes `value` as a top-level value framed by `directive`.
///
/// This allows, for example, a bare `Vec` to be written with a length
/// header.
pub fn to_vec_with<T : Marshal>(value: &T, directive: Directive)
                                -> Result<Vec<u8>> {
    let shape = T::resolve(directive)?;
    let mut dst = Vec::new();
    encode(value, &shape, &mut dst)?;
    trace!("marshalled {} into {} bytes", type_name::<T>(), dst.len());
    Ok(dst)
}

/// Validates `value` and then appends its encoding to `dst`.
pub fn encode<T : Marshal + ?Sized>(value: &T, shape: &TypeShape,
                                    dst: &mut Vec<u8>) -> Result<()> {
    if let Err(err) = value.validate() {
        debug!("{} rejected by validation: {}", type_name::<T>(), err);
        return Err(Error::ValidationFailed(type_name::<T>(), err));
    }
    value.marshal_shaped(shape, dst)
}

/// Returns the error for `T` being handed a shape it cannot encode.
pub fn mismatch<T : ?Sized>(shape: &TypeShape) -> Error {
    Error::ShapeMismatch(type_name::<T>(), shape.kind())
}

/// Writes a length header for content of `len` bytes.
pub fn write_head(dst: &mut Vec<u8>, head: Head, len: usize) -> Result<()> {
    match head {
        Head::Fixed(width) => wire::encode_uint(dst, len as u64,
                                                width as usize)?,
        Head::Varint => wire::encode_varint(dst, len as u64)?,
        Head::None => (),
    }
    Ok(())
}

/// Writes the content produced by `content` preceded by its length as
/// selected by `head`.
///
/// With `Head::None` the content is written straight to `dst`; otherwise it
/// is staged in a temporary buffer so its length is known.
pub fn encode_framed<F>(dst: &mut Vec<u8>, head: Head, content: F)
                        -> Result<()>
where F : FnOnce(&mut Vec<u8>) -> Result<()> {
    if Head::None == head {
        return content(dst);
    }

    let mut buf = Vec::new();
    content(&mut buf)?;
    write_head(dst, head, buf.len())?;
    dst.extend_from_slice(&buf);
    Ok(())
}

/// Encodes the entries of a map of type `M`, ordered by the bytes of their
/// encoded keys.
pub fn encode_map<'v, M, K, V, I>(entries: I, shape: &TypeShape,
                                  dst: &mut Vec<u8>) -> Result<()>
where M : ?Sized, K : Marshal + 'v, V : Marshal + 'v,
      I : Iterator<Item = (&'v K, &'v V)> {
    let (key_shape, value_shape, head) = match *shape {
        TypeShape::Map(ref k, ref v, head) => (k, v, head),
        ref s => return Err(mismatch::<M>(s)),
    };

    let mut pairs = Vec::new();
    for (k, v) in entries {
        let mut key = Vec::new();
        encode(k, key_shape, &mut key)?;
        let mut value = Vec::new();
        encode(v, value_shape, &mut value)?;
        pairs.push((key, value));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(Error::DuplicateKey(type_name::<M>()));
    }

    encode_framed(dst, head, |content| {
        for (key, value) in pairs {
            content.extend_from_slice(&key);
            content.extend_from_slice(&value);
        }
        Ok(())
    })
}

/// Returns the fields of the struct `T` from its shape.
pub fn struct_fields<'s, T : ?Sized>(shape: &'s TypeShape)
                                     -> Result<slice::Iter<'s, FieldShape>> {
    match *shape {
        TypeShape::Struct(ref fields) => Ok(fields.iter()),
        ref s => Err(mismatch::<T>(s)),
    }
}

/// Encodes `value` as the next field from `fields`, skipping it if the
/// field is omitted.
pub fn encode_field<T : Marshal>(value: &T,
                                 fields: &mut slice::Iter<'_, FieldShape>,
                                 dst: &mut Vec<u8>) -> Result<()> {
    match fields.next() {
        Some(&FieldShape { shape: Some(ref shape), .. }) =>
            encode(value, shape, dst),
        Some(&FieldShape { shape: None, .. }) => Ok(()),
        None => Err(Error::ShapeMismatch(type_name::<T>(), "missing field")),
    }
}

macro_rules! ser_uint {
    ($t:ty, $width:expr) => {
        impl Marshal for $t {
            fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                              -> Result<()> {
                match *shape {
                    TypeShape::Primitive { varint: false, .. } =>
                        wire::encode_uint(dst, *self as u64, $width)?,
                    TypeShape::Primitive { varint: true, .. } =>
                        wire::encode_varint(dst, *self as u64)?,
                    ref s => return Err(mismatch::<$t>(s)),
                }
                Ok(())
            }
        }
    }
}
ser_uint!(u8, 1);
ser_uint!(u16, 2);
ser_uint!(u32, 4);
ser_uint!(u64, 8);

impl<T : Marshal, const N: usize> Marshal for [T; N] {
    fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                      -> Result<()> {
        match *shape {
            TypeShape::FixedArray(ref elt, _) => {
                for e in self {
                    encode(e, elt, dst)?;
                }
                Ok(())
            },
            ref s => Err(mismatch::<Self>(s)),
        }
    }
}

impl<T : Marshal> Marshal for Vec<T> {
    fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                      -> Result<()> {
        match *shape {
            TypeShape::Vector(ref elt, head) =>
                encode_framed(dst, head, |content| {
                    for e in self {
                        encode(e, elt, content)?;
                    }
                    Ok(())
                }),
            ref s => Err(mismatch::<Self>(s)),
        }
    }
}

impl<K : Marshal + Ord, V : Marshal> Marshal for BTreeMap<K, V> {
    fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                      -> Result<()> {
        encode_map::<Self, _, _, _>(self.iter(), shape, dst)
    }
}

impl<K : Marshal + Hash + Eq, V : Marshal, H : BuildHasher> Marshal
for HashMap<K, V, H> {
    fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                      -> Result<()> {
        encode_map::<Self, _, _, _>(self.iter(), shape, dst)
    }
}

impl<T : Marshal> Marshal for Box<T> {
    fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                      -> Result<()> {
        match *shape {
            TypeShape::Pointer { ref target, optional: false } =>
                encode(&**self, target, dst),
            ref s => Err(mismatch::<Self>(s)),
        }
    }
}

impl<T : Marshal> Marshal for Option<T> {
    fn marshal_shaped(&self, shape: &TypeShape, dst: &mut Vec<u8>)
                      -> Result<()> {
        match (shape, self) {
            (&TypeShape::Pointer { optional: true, .. }, &None) => {
                dst.push(0);
                Ok(())
            },
            (&TypeShape::Pointer { ref target, optional: true }, &Some(ref v)) => {
                dst.push(1);
                encode(v, target, dst)
            },
            (&TypeShape::Pointer { ref target, optional: false },
             &Some(ref v)) => encode(v, target, dst),
            (&TypeShape::Pointer { optional: false, .. }, &None) =>
                Err(Error::NilRequiredPointer(type_name::<Self>())),
            (s, _) => Err(mismatch::<Self>(s)),
        }
    }
}
