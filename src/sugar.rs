//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Implements `Shaped`, `Marshal` and `Unmarshal` for an existing struct.
///
/// Every field of the struct must be listed, in declaration order, each
/// preceded by its directive in brackets: `[]` for the default, or one of
/// `[varint]`, `[head = 1]`, `[head = 2]`, `[head = 3]`, `[head = varint]`,
/// `[head = none]`, `[optional]` and `[omit]`. Anything else in the brackets
/// is rejected when the macro is expanded. A trailing `validate` clause
/// supplies the struct's validation hook; it is evaluated with the given
/// identifier bound to `&self` and must produce a `Result<(), BoxError>`.
///
/// ```
/// #[macro_use] extern crate tls_syntax;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Extension {
///     kind: u16,
///     data: Vec<u8>,
/// }
///
/// tls_struct!(struct Extension {
///     [] kind: u16,
///     [head = 2] data: Vec<u8>,
/// } validate(|this| if this.data.len() > 0xFFFF {
///     Err("extension too long".into())
/// } else {
///     Ok(())
/// }));
///
/// # fn main() {
/// let ext = Extension { kind: 1, data: vec![0xAA] };
/// let encoded = tls_syntax::marshal(&ext).unwrap();
/// assert_eq!(vec![0, 1, 0, 1, 0xAA], encoded);
/// # }
/// ```
///
/// A misspelled directive does not compile:
///
/// ```compile_fail
/// #[macro_use] extern crate tls_syntax;
///
/// #[derive(Default)]
/// struct Extension {
///     data: Vec<u8>,
/// }
///
/// tls_struct!(struct Extension {
///     [hed = 2] data: Vec<u8>,
/// });
///
/// # fn main() { }
/// ```
///
/// Each field takes exactly one directive, so a nullable vector or map
/// cannot be both `optional` and framed: `[optional] x: Option<Vec<u8>>`
/// fails shape resolution with `Unframed`. Put the framed collection in a
/// struct of its own and make that struct optional instead.
///
/// Fields are decoded by building a struct literal, so every field must be
/// visible where the macro is invoked. Omitted fields are decoded as
/// `Default::default()`, which is why every field type needs a `Default`
/// implementation. For a type with no sensible default value, declare the
/// field as `Option<T>`, or wrap it in a newtype whose `Default` holds a
/// placeholder and which forwards the codec through `tls_custom!` or its own
/// `tls_struct!`.
#[macro_export]
macro_rules! tls_struct {
    (@directive) => { $crate::directive::Directive::Default };
    (@directive varint) => { $crate::directive::Directive::Varint };
    (@directive head = 1) => { $crate::directive::Directive::Head(1) };
    (@directive head = 2) => { $crate::directive::Directive::Head(2) };
    (@directive head = 3) => { $crate::directive::Directive::Head(3) };
    (@directive head = varint) => {
        $crate::directive::Directive::HeadVarint
    };
    (@directive head = none) => { $crate::directive::Directive::HeadNone };
    (@directive optional) => { $crate::directive::Directive::Optional };
    (@directive omit) => { $crate::directive::Directive::Omit };

    (struct $name:ident {
        $([$($directive:tt)*] $field:ident: $field_type:ty,)*
    }) => {
        tls_struct!(struct $name {
            $([$($directive)*] $field: $field_type,)*
        } validate(|_this| Ok(())));
    };

    (struct $name:ident {
        $([$($directive:tt)*] $field:ident: $field_type:ty,)*
    } validate(|$this:ident| $check:expr)) => {
        impl $crate::shape::Shaped for $name {
            fn resolve(directive: $crate::directive::Directive)
                       -> $crate::shape::Result<$crate::shape::TypeShape> {
                $crate::shape::expect_default::<Self>(directive)?;
                $crate::shape::structure::<Self>(vec![$(
                    $crate::shape::resolve_field::<$field_type>(
                        stringify!($field),
                        tls_struct!(@directive $($directive)*))?,
                )*])
            }
        }

        impl $crate::ser::Marshal for $name {
            fn validate(&self) -> ::std::result::Result<
                    (), $crate::ext::BoxError> {
                let $this = self;
                $check
            }

            fn marshal_shaped(&self, shape: &$crate::shape::TypeShape,
                              dst: &mut Vec<u8>)
                              -> $crate::ser::Result<()> {
                let mut _fields = $crate::ser::struct_fields::<Self>(shape)?;
                $($crate::ser::encode_field(&self.$field, &mut _fields, dst)?;)*
                Ok(())
            }
        }

        impl $crate::de::Unmarshal for $name {
            fn unmarshal_shaped(context: &$crate::de::Context,
                                shape: &$crate::shape::TypeShape,
                                src: &mut $crate::io::Cursor)
                                -> $crate::de::Result<Self> {
                let mut _fields = $crate::de::struct_fields::<Self>(
                    context, shape)?;
                Ok($name {
                    $($field: $crate::de::decode_field(
                        context, &mut _fields, src)?,)*
                })
            }
        }
    };
}

/// Registers a type implementing `CustomEncode` and/or `CustomDecode` with
/// the codec.
///
/// - `tls_custom!(T)` for a type implementing both hooks.
/// - `tls_custom!(encode T)` for an encode-only type.
/// - `tls_custom!(decode T)` for a decode-only type.
///
/// The type then resolves to `TypeShape::Custom` under the default directive
/// and rejects every other directive. It can still be made nullable by
/// wrapping it in an `Option` with the `optional` directive.
#[macro_export]
macro_rules! tls_custom {
    (@shaped $t:ty) => {
        impl $crate::shape::Shaped for $t {
            fn resolve(directive: $crate::directive::Directive)
                       -> $crate::shape::Result<$crate::shape::TypeShape> {
                $crate::shape::expect_default::<Self>(directive)?;
                Ok($crate::shape::TypeShape::Custom)
            }
        }
    };

    (@encode $t:ty) => {
        impl $crate::ser::Marshal for $t {
            fn validate(&self) -> ::std::result::Result<
                    (), $crate::ext::BoxError> {
                $crate::ext::CustomEncode::validate(self)
            }

            fn marshal_shaped(&self, shape: &$crate::shape::TypeShape,
                              dst: &mut Vec<u8>)
                              -> $crate::ser::Result<()> {
                $crate::ext::marshal(self, shape, dst)
            }
        }
    };

    (@decode $t:ty) => {
        impl $crate::de::Unmarshal for $t {
            fn unmarshal_shaped(context: &$crate::de::Context,
                                shape: &$crate::shape::TypeShape,
                                src: &mut $crate::io::Cursor)
                                -> $crate::de::Result<Self> {
                $crate::ext::unmarshal(context, shape, src)
            }
        }
    };

    (encode $t:ty) => {
        tls_custom!(@shaped $t);
        tls_custom!(@encode $t);
    };

    (decode $t:ty) => {
        tls_custom!(@shaped $t);
        tls_custom!(@decode $t);
    };

    ($t:ty) => {
        tls_custom!(@shaped $t);
        tls_custom!(@encode $t);
        tls_custom!(@decode $t);
    };
}
