//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

/// Parse hexadecimal text into bytes.
///
/// Whitespace is ignored, so bytes can be grouped by field.
pub fn parse(text: &str) -> Vec<u8> {
    fn hexit(c: char) -> u8 {
        match c.to_digit(16) {
            Some(n) => n as u8,
            None => panic!("Invalid hexit {}", c),
        }
    }

    let digits: Vec<char> = text.chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    assert!(0 == digits.len() % 2, "Odd number of hexits in {:?}", text);

    digits.chunks(2)
        .map(|pair| (hexit(pair[0]) << 4) | hexit(pair[1]))
        .collect()
}

/// Returns `size` bytes of filler.
pub fn buffer(size: usize) -> Vec<u8> {
    vec![0xA0; size]
}

/// Returns the hex text of `buffer(size)`.
pub fn hex_buffer(size: usize) -> String {
    "A0".repeat(size)
}
