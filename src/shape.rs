//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resolution of types into the structural shapes that drive encoding.
//!
//! Every codec type implements `Shaped`, which turns the directive on a
//! field of that type into a `TypeShape` or rejects the combination. The
//! encoder and decoder walk the value and its shape together, so once a
//! shape has been resolved every directive in it is known to be valid.

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use directive::{Directive, Head};

quick_error! {
    /// Errors in the directive configuration of a type.
    ///
    /// These indicate a programming error in a type definition rather than
    /// anything about the data, and are raised while resolving the shape of
    /// a type, before any byte is encoded or decoded.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        /// The text of a directive is not one of the recognised forms.
        Unknown(text: String) {
            description("unknown directive")
            display("unknown directive \"{}\"", text)
        }
        /// A field carries more than one directive.
        Conflicting(text: String) {
            description("conflicting directives")
            display("conflicting directives \"{}\"", text)
        }
        /// The directive does not make sense for the type it is applied to.
        Unsupported(directive: Directive, ty: &'static str) {
            description("directive not applicable to type")
            display("directive {} cannot be applied to {}", directive, ty)
        }
        /// A vector or map has no `head=` directive.
        Unframed(ty: &'static str) {
            description("missing head directive")
            display("{} requires a head= directive", ty)
        }
        /// Content without a length prefix is followed by something else in
        /// its scope, making its extent ambiguous.
        Greedy(ty: &'static str) {
            description("head=none content in non-final position")
            display("head=none content must end its scope in {}", ty)
        }
        /// An error in the named field of a struct.
        Field(name: &'static str, err: Box<Error>) {
            description("invalid field directive")
            display("{} in field {}", err, name)
            cause(&**err)
        }
    }
}

/// The result type for shape resolution.
pub type Result<T> = ::std::result::Result<T, Error>;

/// The resolved wire structure of a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeShape {
    /// An unsigned integer of the given bit width, either at that fixed
    /// width or as a varint.
    Primitive {
        /// The width of the integer type, in bits.
        bits: u32,
        /// Whether the value is written as a varint.
        varint: bool,
    },
    /// An array with a length known to both sides; no length prefix.
    FixedArray(Box<TypeShape>, usize),
    /// A variable-length sequence of elements with the given framing.
    Vector(Box<TypeShape>, Head),
    /// Key/value pairs, framed as a vector.
    Map(Box<TypeShape>, Box<TypeShape>, Head),
    /// An indirection to another value.
    Pointer {
        /// The shape of the value pointed to.
        target: Box<TypeShape>,
        /// Whether a presence flag precedes the value.
        optional: bool,
    },
    /// Fields written one after another in declaration order.
    Struct(Vec<FieldShape>),
    /// A type which provides its own encoding.
    Custom,
}

/// One field of a `TypeShape::Struct`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldShape {
    /// The name of the field, for diagnostics.
    pub name: &'static str,
    /// The directive attached to the field.
    pub directive: Directive,
    /// The shape of the field, or `None` if it is omitted from the wire.
    pub shape: Option<TypeShape>,
}

impl TypeShape {
    /// Returns the fewest bytes any value of this shape can encode to.
    ///
    /// Decoders use this to bound how much they reserve for a container
    /// before having seen its elements.
    pub fn min_len(&self) -> usize {
        match *self {
            TypeShape::Primitive { varint: true, .. } => 1,
            TypeShape::Primitive { bits, .. } => bits as usize / 8,
            TypeShape::FixedArray(ref elt, n) => elt.min_len().saturating_mul(n),
            TypeShape::Vector(_, head) | TypeShape::Map(_, _, head) =>
                match head {
                    Head::Fixed(w) => w as usize,
                    Head::Varint => 1,
                    Head::None => 0,
                },
            TypeShape::Pointer { optional: true, .. } => 1,
            TypeShape::Pointer { ref target, .. } => target.min_len(),
            TypeShape::Struct(ref fields) => fields.iter()
                .filter_map(|f| f.shape.as_ref())
                .fold(0, |sum, s| sum.saturating_add(s.min_len())),
            TypeShape::Custom => 0,
        }
    }

    /// Returns whether decoding this shape consumes everything remaining in
    /// its scope.
    pub fn is_greedy(&self) -> bool {
        match *self {
            TypeShape::Vector(_, Head::None) |
            TypeShape::Map(_, _, Head::None) => true,
            TypeShape::Pointer { ref target, .. } => target.is_greedy(),
            TypeShape::Struct(ref fields) => fields.iter()
                .filter_map(|f| f.shape.as_ref())
                .last()
                .map_or(false, TypeShape::is_greedy),
            _ => false,
        }
    }

    /// A short name for the kind of shape.
    pub fn kind(&self) -> &'static str {
        match *self {
            TypeShape::Primitive { varint: false, .. } => "integer",
            TypeShape::Primitive { varint: true, .. } => "varint",
            TypeShape::FixedArray(..) => "array",
            TypeShape::Vector(..) => "vector",
            TypeShape::Map(..) => "map",
            TypeShape::Pointer { optional: false, .. } => "pointer",
            TypeShape::Pointer { optional: true, .. } => "optional",
            TypeShape::Struct(..) => "struct",
            TypeShape::Custom => "custom",
        }
    }
}

/// Trait for types which can describe their wire structure.
pub trait Shaped {
    /// Resolves the shape of this type as framed by `directive`.
    ///
    /// Returns an error if the directive is not applicable to the type, or
    /// if any nested type fails to resolve.
    fn resolve(directive: Directive) -> Result<TypeShape>;
}

/// Returns an `Unsupported` error for applying `directive` to `T`.
pub fn unsupported<T : ?Sized>(directive: Directive) -> Error {
    Error::Unsupported(directive, type_name::<T>())
}

/// Fails unless `directive` is `Default`.
pub fn expect_default<T : ?Sized>(directive: Directive) -> Result<()> {
    match directive {
        Directive::Default => Ok(()),
        d => Err(unsupported::<T>(d)),
    }
}

/// Extracts the framing of a vector or map of type `T` from its directive.
pub fn framing<T : ?Sized>(directive: Directive) -> Result<Head> {
    match directive.head() {
        Some(head) => Ok(head),
        None if Directive::Default == directive =>
            Err(Error::Unframed(type_name::<T>())),
        None => Err(unsupported::<T>(directive)),
    }
}

/// Resolves `E` as an element of the container `T`, which must not be
/// greedy.
pub fn element<T : ?Sized, E : Shaped>() -> Result<Box<TypeShape>> {
    let shape = E::resolve(Directive::Default)?;
    if shape.is_greedy() {
        Err(Error::Greedy(type_name::<T>()))
    } else {
        Ok(Box::new(shape))
    }
}

/// Resolves a struct field of type `T` under `directive`.
///
/// `Omit` is handled here and never reaches `T`. Errors are wrapped in
/// `Error::Field` to name the offending field.
pub fn resolve_field<T : Shaped>(name: &'static str, directive: Directive)
                                 -> Result<FieldShape> {
    let shape = if Directive::Omit == directive {
        None
    } else {
        Some(T::resolve(directive).map_err(
            |err| Error::Field(name, Box::new(err)))?)
    };

    Ok(FieldShape { name: name, directive: directive, shape: shape })
}

/// Assembles the shape of the struct `T` from its resolved fields.
///
/// Only the last field present on the wire may be greedy.
pub fn structure<T : ?Sized>(fields: Vec<FieldShape>) -> Result<TypeShape> {
    {
        let mut present = fields.iter()
            .filter_map(|f| f.shape.as_ref().map(|s| (f.name, s)))
            .peekable();
        while let Some((name, shape)) = present.next() {
            if shape.is_greedy() && present.peek().is_some() {
                return Err(Error::Field(name, Box::new(
                    Error::Greedy(type_name::<T>()))));
            }
        }
    }

    Ok(TypeShape::Struct(fields))
}

macro_rules! shape_uint {
    ($t:ty, $bits:expr) => {
        impl Shaped for $t {
            fn resolve(directive: Directive) -> Result<TypeShape> {
                match directive {
                    Directive::Default => Ok(TypeShape::Primitive {
                        bits: $bits, varint: false }),
                    Directive::Varint => Ok(TypeShape::Primitive {
                        bits: $bits, varint: true }),
                    d => Err(unsupported::<$t>(d)),
                }
            }
        }
    }
}
shape_uint!(u8, 8);
shape_uint!(u16, 16);
shape_uint!(u32, 32);
shape_uint!(u64, 64);

impl<T : Shaped, const N: usize> Shaped for [T; N] {
    fn resolve(directive: Directive) -> Result<TypeShape> {
        expect_default::<Self>(directive)?;
        Ok(TypeShape::FixedArray(element::<Self, T>()?, N))
    }
}

impl<T : Shaped> Shaped for Vec<T> {
    fn resolve(directive: Directive) -> Result<TypeShape> {
        let head = framing::<Self>(directive)?;
        Ok(TypeShape::Vector(element::<Self, T>()?, head))
    }
}

impl<K : Shaped + Ord, V : Shaped> Shaped for BTreeMap<K, V> {
    fn resolve(directive: Directive) -> Result<TypeShape> {
        let head = framing::<Self>(directive)?;
        Ok(TypeShape::Map(element::<Self, K>()?, element::<Self, V>()?, head))
    }
}

impl<K : Shaped + Hash + Eq, V : Shaped, H : BuildHasher> Shaped
for HashMap<K, V, H> {
    fn resolve(directive: Directive) -> Result<TypeShape> {
        let head = framing::<Self>(directive)?;
        Ok(TypeShape::Map(element::<Self, K>()?, element::<Self, V>()?, head))
    }
}

impl<T : Shaped> Shaped for Box<T> {
    fn resolve(directive: Directive) -> Result<TypeShape> {
        if Directive::Optional == directive {
            return Err(unsupported::<Self>(directive));
        }
        Ok(TypeShape::Pointer {
            target: Box::new(T::resolve(directive)?),
            optional: false,
        })
    }
}

impl<T : Shaped> Shaped for Option<T> {
    fn resolve(directive: Directive) -> Result<TypeShape> {
        let (target, optional) = match directive {
            Directive::Optional => (T::resolve(Directive::Default)?, true),
            d => (T::resolve(d)?, false),
        };
        Ok(TypeShape::Pointer { target: Box::new(target), optional: optional })
    }
}
