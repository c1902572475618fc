//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{BTreeMap, HashMap};
use std::string::FromUtf8Error;

use de::{self, from_slice_with, Config};
use directive::Directive;
use ext::{BoxError, CustomDecode, CustomEncode};
use ser::{self, to_vec_with};
use test_helpers::{buffer, hex_buffer, parse};

macro_rules! tcase {
    (@case $name:ident, $ty:ty, $directive:expr, $input:expr, $binary:expr,
     $prefixes:expr) => {
        #[test]
        fn $name() {
            let orig: $ty = $input;
            let encoded = to_vec_with(&orig, $directive).unwrap();
            assert_eq!(parse(&$binary), encoded);

            let (consumed, decoded): (usize, $ty) = from_slice_with(
                &encoded, $directive, &Config::default()).unwrap();
            assert_eq!(encoded.len(), consumed);
            assert_eq!(orig, decoded);

            if $prefixes && !encoded.is_empty() {
                // Custom encodings report truncation through their hook
                let r: de::Result<(usize, $ty)> = from_slice_with(
                    &encoded[..encoded.len() - 1], $directive,
                    &Config::default());
                match r {
                    Err(de::Error::TruncatedInput(..)) |
                    Err(de::Error::Custom(..)) => (),
                    r => panic!("unexpected result for truncated input: {:?}",
                                r),
                }

                for len in 0..encoded.len() {
                    let r: de::Result<(usize, $ty)> = from_slice_with(
                        &encoded[..len], $directive, &Config::default());
                    assert!(r.is_err(), "prefix of {} bytes decoded", len);
                }
            }
        }
    };

    ($name:ident ($ty:ty: $input:expr => $binary:expr)) => {
        tcase!(@case $name, $ty, Directive::Default, $input, $binary, true);
    };

    ($name:ident ($ty:ty [$directive:expr]: $input:expr => $binary:expr)) => {
        tcase!(@case $name, $ty, $directive, $input, $binary, true);
    };

    // Content without a length runs to the end of the input, so a prefix of
    // it is usually still a valid encoding.
    ($name:ident ($ty:ty [$directive:expr]: $input:expr => $binary:expr)
     greedy) => {
        tcase!(@case $name, $ty, $directive, $input, $binary, false);
    };
}

/// A string which encodes as one length byte followed by its UTF-8 bytes,
/// XOR'ed with an increasing sequence starting at the length plus one.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
struct CrypticString(String);

impl CrypticString {
    fn new(s: &str) -> Self {
        CrypticString(s.to_owned())
    }
}

fn scramble(len: u8, data: &mut [u8]) {
    for (i, b) in data.iter_mut().enumerate() {
        *b ^= len.wrapping_add(i as u8).wrapping_add(1);
    }
}

impl CustomEncode for CrypticString {
    fn encode_custom(&self) -> Result<Vec<u8>, BoxError> {
        let len = self.0.len() as u8;
        let mut data = vec![len];
        data.extend_from_slice(self.0.as_bytes());
        scramble(len, &mut data[1..]);
        Ok(data)
    }

    fn validate(&self) -> Result<(), BoxError> {
        if self.0.len() > 255 {
            return Err(format!("CrypticString too long: {}",
                               self.0.len()).into());
        }
        if "fnord" == self.0 {
            return Err("forbidden value".into());
        }
        Ok(())
    }
}

impl CustomDecode for CrypticString {
    fn decode_custom(data: &[u8]) -> Result<(usize, Self), BoxError> {
        let len = match data.first() {
            Some(&len) => len,
            None => return Err("CrypticString needs a length byte".into()),
        };
        let end = len as usize + 1;
        if data.len() < end {
            return Err("input too short for CrypticString".into());
        }

        let mut text = data[1..end].to_vec();
        scramble(len, &mut text);
        let text = String::from_utf8(text).map_err(
            |e: FromUtf8Error| -> BoxError { Box::new(e) })?;
        Ok((end, CrypticString(text)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Varint8 { v: u8 }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Varint16 { v: u16 }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Varint32 { v: u32 }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Varint64 { v: u64 }

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Head1 { v: Vec<u8> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Head2 { v: Vec<u8> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Head3 { v: Vec<u8> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct HeadNone { v: Vec<u8> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct HeadVarint { v: Vec<u8> }

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OrderedMap { v: BTreeMap<u16, u8> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UnorderedMap { v: HashMap<u16, u8> }

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Mixed {
    a: u16,
    b: Vec<u8>,
    c: [u32; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct MixedOmit {
    a: u16,
    b: Vec<u8>,
    c: [u32; 4],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Boxed { v: Box<u16> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Transparent { v: Option<u16> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Optional { a: Option<u16> }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OptionalCryptic { a: Option<CrypticString> }

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CrypticFields {
    a: CrypticString,
    b: u16,
    c: CrypticString,
}

mod declare {
    // Separate module to isolate imports
    use super::*;

    tls_custom!(CrypticString);

    tls_struct!(struct Varint8 { [varint] v: u8, });
    tls_struct!(struct Varint16 { [varint] v: u16, });
    tls_struct!(struct Varint32 { [varint] v: u32, });
    tls_struct!(struct Varint64 { [varint] v: u64, });

    tls_struct!(struct Head1 { [head = 1] v: Vec<u8>, });
    tls_struct!(struct Head2 { [head = 2] v: Vec<u8>, });
    tls_struct!(struct Head3 { [head = 3] v: Vec<u8>, });
    tls_struct!(struct HeadNone { [head = none] v: Vec<u8>, });
    tls_struct!(struct HeadVarint { [head = varint] v: Vec<u8>, });

    tls_struct!(struct OrderedMap { [head = 1] v: BTreeMap<u16, u8>, });
    tls_struct!(struct UnorderedMap { [head = 1] v: HashMap<u16, u8>, });

    tls_struct!(struct Mixed {
        [] a: u16,
        [head = 2] b: Vec<u8>,
        [] c: [u32; 4],
    });

    tls_struct!(struct MixedOmit {
        [] a: u16,
        [omit] b: Vec<u8>,
        [] c: [u32; 4],
    });

    tls_struct!(struct Boxed { [] v: Box<u16>, });
    tls_struct!(struct Transparent { [] v: Option<u16>, });
    tls_struct!(struct Optional { [optional] a: Option<u16>, });
    tls_struct!(struct OptionalCryptic {
        [optional] a: Option<CrypticString>,
    });

    tls_struct!(struct CrypticFields {
        [] a: CrypticString,
        [] b: u16,
        [] c: CrypticString,
    });
}

fn hash_map(entries: &[(u16, u8)]) -> HashMap<u16, u8> {
    entries.iter().cloned().collect()
}

fn btree_map<K : Ord + Clone, V : Clone>(entries: &[(K, V)])
                                         -> BTreeMap<K, V> {
    entries.iter().cloned().collect()
}

// Unsigned integers
tcase!(tl_u8  (u8:  0xA0 => "A0"));
tcase!(tl_u16 (u16: 0xB0A0 => "B0A0"));
tcase!(tl_u32 (u32: 0xD0C0B0A0 => "D0C0B0A0"));
tcase!(tl_u64 (u64: 0xD0C0B0A090807060 => "D0C0B0A090807060"));

// Varints, at the largest value of each length class
tcase!(sf_varint8  (Varint8:  Varint8 { v: 0x3F } => "3F"));
tcase!(sf_varint16 (Varint16: Varint16 { v: 0x3FFF } => "7FFF"));
tcase!(sf_varint32 (Varint32: Varint32 { v: 0x3FFFFFFF } => "BFFFFFFF"));
tcase!(sf_varint64 (Varint64: Varint64 { v: 0x3FFFFFFFFFFFFFFF } =>
                    "FFFFFFFFFFFFFFFF"));
tcase!(tl_varint_zero (u8 [Directive::Varint]: 0 => "00"));
tcase!(tl_varint_class_boundary (u64 [Directive::Varint]: 0x4000 =>
                                 "80004000"));

// Arrays
tcase!(tl_array ([u16; 5]: [0x0102, 0x0304, 0x0506, 0x0708, 0x090a] =>
                 "0102030405060708090a"));
tcase!(tl_empty_array ([u16; 0]: [] => ""));

// Vectors
tcase!(sf_head1 (Head1: Head1 { v: buffer(0x20) } =>
                 format!("20{}", hex_buffer(0x20))));
tcase!(sf_head2 (Head2: Head2 { v: buffer(0x200) } =>
                 format!("0200{}", hex_buffer(0x200))));
tcase!(sf_head3 (Head3: Head3 { v: buffer(0x20000) } =>
                 format!("020000{}", hex_buffer(0x20000))));
tcase!(sf_head_none (HeadNone [Directive::Default]:
                     HeadNone { v: buffer(0x3FFF) } =>
                     hex_buffer(0x3FFF)) greedy);
tcase!(sf_head_varint (HeadVarint: HeadVarint { v: buffer(0x3FFF) } =>
                       format!("7FFF{}", hex_buffer(0x3FFF))));
tcase!(sf_head_empty (Head2: Head2 { v: vec![] } => "0000"));
tcase!(tl_vec_head2 (Vec<u16> [Directive::Head(2)]: vec![1, 2] =>
                     "0004 0001 0002"));
tcase!(tl_vec_head_none (Vec<u16> [Directive::HeadNone]: vec![1, 2] =>
                         "0001 0002") greedy);
tcase!(ce_framed_structs (Vec<Head1> [Directive::HeadVarint]:
                          vec![Head1 { v: vec![1] }, Head1 { v: vec![] }] =>
                          "03 0101 00"));

// Maps
tcase!(sf_btree_map (OrderedMap:
                     OrderedMap { v: btree_map(&[(2, 1), (1, 2)]) } =>
                     "06 0001 02 0002 01"));
tcase!(sf_hash_map (UnorderedMap:
                    UnorderedMap { v: hash_map(&[(2, 1), (1, 2)]) } =>
                    "06 0001 02 0002 01"));
// Ordered by encoded key, not by the key's own ordering
tcase!(tl_cryptic_keys (BTreeMap<CrypticString, u8> [Directive::Head(1)]:
                        btree_map(&[(CrypticString::new("a"), 1),
                                    (CrypticString::new("b"), 2)]) =>
                        "06 0160 02 0163 01"));
tcase!(tl_map_head_none (BTreeMap<u16, u8> [Directive::HeadNone]:
                         btree_map(&[(2, 1), (1, 2)]) =>
                         "0001 02 0002 01") greedy);
tcase!(tl_hash_map_head_varint (HashMap<u16, u8> [Directive::HeadVarint]:
                                hash_map(&[(2, 1), (1, 2)]) =>
                                "06 0001 02 0002 01"));

// Structs
tcase!(sf_struct (Mixed: Mixed {
    a: 0xB0A0,
    b: vec![0xA0, 0xA1, 0xA2, 0xA3, 0xA4],
    c: [0x10111213, 0x20212223, 0x30313233, 0x40414243],
} => "B0A0 0005A0A1A2A3A4 10111213202122233031323340414243"));
tcase!(sf_struct_omit (MixedOmit: MixedOmit {
    a: 0xB0A0,
    b: vec![],
    c: [0x10111213, 0x20212223, 0x30313233, 0x40414243],
} => "B0A0 10111213202122233031323340414243"));

// Pointers
tcase!(sf_box (Boxed: Boxed { v: Box::new(0xFFFF) } => "FFFF"));
tcase!(sf_transparent (Transparent: Transparent { v: Some(0xFFFF) } =>
                       "FFFF"));
tcase!(sf_optional_absent (Optional: Optional { a: None } => "00"));
tcase!(sf_optional_present (Optional: Optional { a: Some(0xFFFF) } =>
                            "01FFFF"));
tcase!(sf_optional_custom_absent (OptionalCryptic:
                                  OptionalCryptic { a: None } => "00"));
tcase!(sf_optional_custom_present (OptionalCryptic: OptionalCryptic {
    a: Some(CrypticString::new("hello")),
} => "01 056e62646565"));

// Custom encodings
tcase!(tl_custom (CrypticString: CrypticString::new("hello") =>
                  "056e62646565"));
tcase!(sf_custom (CrypticFields: CrypticFields {
    a: CrypticString::new("hello"),
    b: 0xB0A0,
    c: CrypticString::new("... world!"),
} => "056e62646565 B0A0 0a2522232e787f637e7735"));

#[test]
fn custom_validation_rejects_forbidden_value() {
    let value = CrypticFields {
        a: CrypticString::new("hello"),
        b: 1,
        c: CrypticString::new("fnord"),
    };
    match to_vec_with(&value, Directive::Default) {
        Err(ser::Error::ValidationFailed(..)) => (),
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn custom_decode_failure_is_reported() {
    let r: de::Result<(usize, CrypticFields)> = from_slice_with(
        &parse("05 6e6264"), Directive::Default, &Config::default());
    match r {
        Err(de::Error::Custom(ref wo, _)) => assert_eq!("{0}.a{0}", wo),
        r => panic!("unexpected result: {:?}", r),
    }
}
