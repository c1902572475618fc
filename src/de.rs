//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The decoder: the `Unmarshal` trait, decoding context and built-in
//! implementations.

use std::any::type_name;
use std::cmp::{max, min};
use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::slice;

use quick_error::ResultExt;

use directive::{Directive, Head};
use ext::BoxError;
use io::{Cursor, Truncated};
use shape::{self, FieldShape, Shaped, TypeShape};
use wire;

/// Decodes an instance of `T` from the front of `data`.
///
/// Returns the number of bytes consumed along with the value. Bytes beyond
/// the value are ignored; compare the count against `data.len()`, or use
/// `from_slice_exact`, to reject them.
pub fn from_slice<T : Unmarshal>(data: &[u8]) -> Result<(usize, T)> {
    from_slice_with(data, Directive::Default, &Config::default())
}

/// Decodes an instance of `T`, framed by `directive`, from the front of
/// `data`.
pub fn from_slice_with<T : Unmarshal>(data: &[u8], directive: Directive,
                                      config: &Config)
                                      -> Result<(usize, T)> {
    let shape = T::resolve(directive)?;
    let mut src = Cursor::new(data);
    let value = T::unmarshal_shaped(&Context::top(config), &shape, &mut src)?;
    trace!("unmarshalled {} from {} of {} bytes",
           type_name::<T>(), src.consumed(), data.len());
    Ok((src.consumed(), value))
}

/// Decodes an instance of `T` from the front of `data` into `target`,
/// returning the number of bytes consumed.
///
/// `target` is only assigned if decoding succeeds.
pub fn from_slice_into<T : Unmarshal>(data: &[u8], target: &mut T)
                                      -> Result<usize> {
    let (consumed, value) = from_slice(data)?;
    *target = value;
    Ok(consumed)
}

/// Decodes an instance of `T` which must occupy all of `data`.
pub fn from_slice_exact<T : Unmarshal>(data: &[u8]) -> Result<T> {
    let (consumed, value) = from_slice(data)?;
    if consumed != data.len() {
        return Err(Error::TrailingData(consumed, data.len()));
    }
    Ok(value)
}

quick_error! {
    /// Errors that can be produced during deserialisation.
    ///
    /// Variants arising from the input begin with a string indicating the
    /// field names and positions that led to the error.
    #[derive(Debug)]
    pub enum Error {
        /// The directives of the type being decoded are invalid.
        InvalidDirective(err: shape::Error) {
            description("invalid directive")
            display("invalid directive: {}", err)
            cause(err)
            from()
        }
        /// The input ended before a fixed-width field, varint or length
        /// header could be read, or a length header claims more bytes than
        /// remain.
        TruncatedInput(wo: String, err: Truncated) {
            description("input truncated")
            display("{} at {}", err, wo)
            cause(err)
            context(wo: &'a Context<'a>, err: Truncated) ->
                (wo.to_string(), err)
        }
        /// The content of a vector or map is inconsistent with its length
        /// header, or otherwise cannot be a valid sequence.
        MalformedVector(wo: String, why: &'static str) {
            description("malformed vector")
            display("malformed vector at {}: {}", wo, why)
        }
        /// The presence flag of an optional value was neither 0 nor 1.
        MalformedOptional(wo: String, flag: u8) {
            description("malformed optional")
            display("invalid presence flag {:#04x} at {}", flag, wo)
        }
        /// A custom decoder reported consuming more bytes than it was given.
        CursorOverrun(wo: String, consumed: usize, available: usize) {
            description("custom decoder overran its input")
            display("custom decoder consumed {} of {} bytes at {}",
                    consumed, available, wo)
        }
        /// A varint held a value too large for the integer type.
        IntegerOverflow(wo: String, value: u64, bits: u32) {
            description("integer overflow")
            display("value {} does not fit in {} bits at {}", value, bits, wo)
        }
        /// A custom decoder failed.
        Custom(wo: String, err: BoxError) {
            description("custom decoding failed")
            display("{} at {}", err, wo)
        }
        /// A vector or map held more elements than `Config::max_collect`.
        CollectionTooLarge(wo: String) {
            description("collection size limit exceeded")
            display("collection size limit exceeded at {}", wo)
        }
        /// A type was asked to decode itself with a shape it did not
        /// resolve to.
        ShapeMismatch(wo: String, ty: &'static str, kind: &'static str) {
            description("shape does not match type")
            display("{} cannot be decoded as {} at {}", ty, kind, wo)
        }
        /// Bytes remained after a value which was required to consume all of
        /// its input.
        TrailingData(consumed: usize, len: usize) {
            description("trailing data")
            display("{} trailing bytes after value of {} bytes",
                    len - consumed, consumed)
        }
    }
}

/// The general result type returned by deserialising functions.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Run-time configuration for deserialisation.
#[derive(Debug, Clone)]
pub struct Config {
    /// The maximum number of elements to accumulate into a single vector or
    /// map.
    ///
    /// The default is 2^24, the most one-byte elements a `head=3` vector can
    /// hold.
    pub max_collect: usize,
    _non_public: (),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_collect: 1 << 24,
            _non_public: (),
        }
    }
}

/// Tracks contextual information during deserialisation.
///
/// This is used for constructing helpful error messages and carrying the
/// configuration down to nested values.
///
/// `Context` objects are typically constructed on the stack and passed to
/// sub-deserialisers by reference.
///
/// A `Context` can be formatted with `Display` to show the path to the current
/// location, including both field names and offsets. Elements of vectors,
/// maps and arrays appear as `[]`.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    /// The context for the "container" of this level of deserialisation, if
    /// any.
    pub next: Option<&'a Context<'a>>,
    /// The name of the field being deserialised at this level.
    pub field: &'a str,
    /// The position of the field being deserialised at this level.
    pub pos: usize,
    /// The configuration to use when deserialising this level's immediate
    /// children.
    pub config: &'a Config,
    _non_public: (),
}

impl<'a> Context<'a> {
    /// Returns a "top-level" context referencing the given config.
    pub fn top(config: &'a Config) -> Self {
        Context {
            next: None,
            field: "",
            pos: 0,
            config: config,
            _non_public: (),
        }
    }

    /// Creates a context subordinate to this one for the given field.
    pub fn push(&'a self, field: &'a str, pos: usize) -> Self {
        Context {
            next: Some(self),
            field: field,
            pos: pos,
            config: self.config,
            _non_public: (),
        }
    }

    /// If `n + 1` is within the configured maximum collection size, return
    /// `Ok`. Otherwise, return `Err`.
    pub fn check_collect(&self, n: usize) -> Result<()> {
        if n >= self.config.max_collect {
            Err(Error::CollectionTooLarge(self.to_string()))
        } else {
            Ok(())
        }
    }

    /// Returns the error for `T` being handed a shape it cannot decode.
    pub fn mismatch<T : ?Sized>(&self, shape: &TypeShape) -> Error {
        Error::ShapeMismatch(self.to_string(), type_name::<T>(), shape.kind())
    }
}

impl<'a> fmt::Display for Context<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref next) = self.next {
            write!(f, "{}.{}{{{}}}", next, self.field, self.pos)
        } else {
            write!(f, "{}{{{}}}", self.field, self.pos)
        }
    }
}

/// Trait for decoding values from the wire format.
///
/// Decoded values are always owned; nothing borrows from the input.
pub trait Unmarshal : Shaped + Sized {
    /// Decodes a value described by `shape` from the front of `src`,
    /// advancing it by exactly the bytes consumed.
    fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                        src: &mut Cursor) -> Result<Self>;
}

/// The elements of a vector or map being decoded.
///
/// Opening a `Sequence` reads the length header selected by the framing and
/// carves the content out of the enclosing scope; `next()` then decodes one
/// element at a time until the content is exhausted.
#[derive(Debug)]
pub struct Sequence<'a> {
    scope: Cursor<'a>,
    bounded: bool,
    count: usize,
}

impl<'a> Sequence<'a> {
    /// Reads the framing of a sequence from `src`.
    ///
    /// With `Head::None` the sequence takes everything that remains in
    /// `src`.
    pub fn open(context: &Context, head: Head, src: &mut Cursor<'a>)
                -> Result<Self> {
        let len = match head {
            Head::Fixed(width) =>
                Some(wire::decode_uint(src, width as usize).context(context)?),
            Head::Varint => Some(wire::decode_varint(src).context(context)?),
            Head::None => None,
        };

        let bounded = len.is_some();
        let len = match len {
            Some(len) => usize::try_from(len).unwrap_or(usize::MAX),
            None => src.remaining(),
        };

        Ok(Sequence {
            scope: src.split(len).context(context)?,
            bounded: bounded,
            count: 0,
        })
    }

    /// Returns how many elements of at least `min_len` bytes each it is safe
    /// to reserve space for.
    ///
    /// This can never exceed what the remaining content could hold, however
    /// large the length header claimed the content to be.
    pub fn capacity(&self, context: &Context, min_len: usize) -> usize {
        min(self.scope.remaining() / max(min_len, 1),
            context.config.max_collect)
    }

    /// Decodes the next element with `f`, or returns `None` if the content
    /// is exhausted.
    pub fn next<T, F>(&mut self, context: &Context, f: F) -> Result<Option<T>>
    where F : FnOnce(&Context, &mut Cursor<'a>) -> Result<T> {
        if self.scope.is_empty() {
            return Ok(None);
        }

        let start = self.scope.consumed();
        let subcontext = context.push("[]", self.scope.pos());
        subcontext.check_collect(self.count)?;

        let value = match f(&subcontext, &mut self.scope) {
            Err(Error::TruncatedInput(..)) if self.bounded =>
                return Err(Error::MalformedVector(
                    subcontext.to_string(),
                    "element overruns declared length")),
            r => r?,
        };

        if self.scope.consumed() == start {
            return Err(Error::MalformedVector(
                subcontext.to_string(), "element consumed no input"));
        }

        self.count += 1;
        Ok(Some(value))
    }
}

/// Returns the fields of the struct `T` from its shape.
pub fn struct_fields<'s, T : ?Sized>(context: &Context, shape: &'s TypeShape)
                                     -> Result<slice::Iter<'s, FieldShape>> {
    match *shape {
        TypeShape::Struct(ref fields) => Ok(fields.iter()),
        ref s => Err(context.mismatch::<T>(s)),
    }
}

/// Decodes the next field from `fields`, or produces the default value if
/// the field is omitted.
pub fn decode_field<T : Unmarshal + Default>(
    context: &Context, fields: &mut slice::Iter<'_, FieldShape>,
    src: &mut Cursor) -> Result<T>
{
    match fields.next() {
        Some(&FieldShape { name, shape: Some(ref shape), .. }) => {
            let subcontext = context.push(name, src.pos());
            T::unmarshal_shaped(&subcontext, shape, src)
        },
        Some(&FieldShape { shape: None, .. }) => Ok(T::default()),
        None => Err(Error::ShapeMismatch(
            context.to_string(), type_name::<T>(), "missing field")),
    }
}

macro_rules! des_uint {
    ($t:ty, $width:expr, $bits:expr) => {
        impl Unmarshal for $t {
            fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                                src: &mut Cursor) -> Result<Self> {
                let value = match *shape {
                    TypeShape::Primitive { varint: false, .. } =>
                        wire::decode_uint(src, $width).context(context)?,
                    TypeShape::Primitive { varint: true, .. } =>
                        wire::decode_varint(src).context(context)?,
                    ref s => return Err(context.mismatch::<$t>(s)),
                };

                <$t>::try_from(value).map_err(|_| Error::IntegerOverflow(
                    context.to_string(), value, $bits))
            }
        }
    }
}
des_uint!(u8, 1, 8);
des_uint!(u16, 2, 16);
des_uint!(u32, 4, 32);
des_uint!(u64, 8, 64);

impl<T : Unmarshal, const N: usize> Unmarshal for [T; N] {
    fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                        src: &mut Cursor) -> Result<Self> {
        let elt = match *shape {
            TypeShape::FixedArray(ref elt, n) if N == n => elt,
            ref s => return Err(context.mismatch::<Self>(s)),
        };

        let mut items = Vec::with_capacity(min(N, src.remaining()));
        for _ in 0..N {
            let subcontext = context.push("[]", src.pos());
            items.push(T::unmarshal_shaped(&subcontext, elt, src)?);
        }

        <[T; N]>::try_from(items).map_err(|_| context.mismatch::<Self>(shape))
    }
}

impl<T : Unmarshal> Unmarshal for Vec<T> {
    fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                        src: &mut Cursor) -> Result<Self> {
        let (elt, head) = match *shape {
            TypeShape::Vector(ref elt, head) => (elt, head),
            ref s => return Err(context.mismatch::<Self>(s)),
        };

        let mut seq = Sequence::open(context, head, src)?;
        let mut items = Vec::with_capacity(seq.capacity(context, elt.min_len()));
        while let Some(item) = seq.next(context, |context, scope| {
            T::unmarshal_shaped(context, elt, scope)
        })? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Splits a map shape into its key shape, value shape and framing.
fn map_shape<'s, M : ?Sized>(context: &Context, shape: &'s TypeShape)
                             -> Result<(&'s TypeShape, &'s TypeShape, Head)> {
    match *shape {
        TypeShape::Map(ref k, ref v, head) => Ok((k, v, head)),
        ref s => Err(context.mismatch::<M>(s)),
    }
}

fn decode_pair<K : Unmarshal, V : Unmarshal>(
    context: &Context, key_shape: &TypeShape, value_shape: &TypeShape,
    src: &mut Cursor) -> Result<(K, V)>
{
    let key = K::unmarshal_shaped(context, key_shape, src)?;
    let value = V::unmarshal_shaped(context, value_shape, src)?;
    Ok((key, value))
}

impl<K : Unmarshal + Ord, V : Unmarshal> Unmarshal for BTreeMap<K, V> {
    fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                        src: &mut Cursor) -> Result<Self> {
        let (key_shape, value_shape, head) = map_shape::<Self>(context, shape)?;

        let mut seq = Sequence::open(context, head, src)?;
        let mut map = BTreeMap::new();
        while let Some((k, v)) = seq.next(context, |context, scope| {
            decode_pair(context, key_shape, value_shape, scope)
        })? {
            if map.insert(k, v).is_some() {
                return Err(Error::MalformedVector(
                    context.to_string(), "duplicate map key"));
            }
        }
        Ok(map)
    }
}

impl<K, V, H> Unmarshal for HashMap<K, V, H>
where K : Unmarshal + Hash + Eq, V : Unmarshal, H : BuildHasher + Default {
    fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                        src: &mut Cursor) -> Result<Self> {
        let (key_shape, value_shape, head) = map_shape::<Self>(context, shape)?;

        let mut seq = Sequence::open(context, head, src)?;
        let pair_len = key_shape.min_len().saturating_add(value_shape.min_len());
        let mut map = HashMap::with_capacity_and_hasher(
            seq.capacity(context, pair_len), H::default());
        while let Some((k, v)) = seq.next(context, |context, scope| {
            decode_pair(context, key_shape, value_shape, scope)
        })? {
            if map.insert(k, v).is_some() {
                return Err(Error::MalformedVector(
                    context.to_string(), "duplicate map key"));
            }
        }
        Ok(map)
    }
}

impl<T : Unmarshal> Unmarshal for Box<T> {
    fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                        src: &mut Cursor) -> Result<Self> {
        match *shape {
            TypeShape::Pointer { ref target, optional: false } =>
                T::unmarshal_shaped(context, target, src).map(Box::new),
            ref s => Err(context.mismatch::<Self>(s)),
        }
    }
}

impl<T : Unmarshal> Unmarshal for Option<T> {
    fn unmarshal_shaped(context: &Context, shape: &TypeShape,
                        src: &mut Cursor) -> Result<Self> {
        match *shape {
            TypeShape::Pointer { ref target, optional: false } =>
                T::unmarshal_shaped(context, target, src).map(Some),
            TypeShape::Pointer { ref target, optional: true } =>
                match src.read_byte().context(context)? {
                    0 => Ok(None),
                    1 => T::unmarshal_shaped(context, target, src).map(Some),
                    flag => Err(Error::MalformedOptional(
                        context.to_string(), flag)),
                },
            ref s => Err(context.mismatch::<Self>(s)),
        }
    }
}
