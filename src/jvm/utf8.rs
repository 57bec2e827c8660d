//! Modified UTF-8, as used by `CONSTANT_Utf8_info`
//!
//! Quoting [the docs][0]:
//!
//! > The differences between this format and the standard UTF-8 format are the following:
//! >
//! >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
//! >    strings never have embedded nulls.
//! >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
//! >  * Supplementary characters are represented in the form of surrogate pairs.
//!
//! [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8

/// Can this byte appear anywhere inside a modified UTF-8 string?
///
/// Zero is never valid (`\u0000` has a two byte encoding) and neither is any byte which would
/// start a 4-byte sequence.
pub const fn is_valid_byte(byte: u8) -> bool {
    byte != 0 && byte < 0xF0
}

/// Decode the first code point from a modified UTF-8 buffer
///
/// Returns the code point (which may be half of a surrogate pair) and the number of bytes it
/// used, or `None` if the buffer does not start with a well-formed sequence.
pub fn next_char(bytes: &[u8]) -> Option<(u32, usize)> {
    let continuation = |idx: usize| -> Option<u32> {
        match bytes.get(idx) {
            Some(b) if b & 0xC0 == 0x80 => Some((b & 0x3F) as u32),
            _ => None,
        }
    };

    let lead = *bytes.first()?;
    match lead {
        0x01..=0x7F => Some((lead as u32, 1)),
        0xC0..=0xDF => {
            let low = continuation(1)?;
            Some((((lead & 0x1F) as u32) << 6 | low, 2))
        }
        0xE0..=0xEF => {
            let mid = continuation(1)?;
            let low = continuation(2)?;
            Some((((lead & 0x0F) as u32) << 12 | mid << 6 | low, 3))
        }
        _ => None,
    }
}

/// Decode a full modified UTF-8 buffer
///
/// Surrogate pairs are recombined into supplementary characters. Anything malformed (including
/// unpaired surrogates) is replaced with `U+FFFD`, which is never a valid identifier character.
pub fn decode_modified_utf8(mut bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());

    while !bytes.is_empty() {
        let (code, used) = match next_char(bytes) {
            Some(found) => found,
            None => {
                decoded.push(char::REPLACEMENT_CHARACTER);
                bytes = &bytes[1..];
                continue;
            }
        };
        bytes = &bytes[used..];

        if (0xD800..0xDC00).contains(&code) {
            if let Some((low, low_used)) = next_char(bytes) {
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    decoded.push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                    bytes = &bytes[low_used..];
                    continue;
                }
            }
        }

        decoded.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
    }

    decoded
}

/// Encode a string using the modified UTF-8 format
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x0F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
        assert_eq!(decode_modified_utf8(&[97, 192, 128, 97]), "a\x00a");
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(decode_modified_utf8(b"java/lang/Object"), "java/lang/Object");
    }

    #[test]
    fn two_and_three_byte_encodings() {
        assert_eq!(
            encode_modified_utf8("ĄǍǞ"),
            vec![196, 132, 199, 141, 199, 158]
        );
        assert_eq!(next_char(&[224, 164, 132]), Some((0x904, 3)));
        assert_eq!(decode_modified_utf8(&[224, 164, 132, 196, 132]), "ऄĄ");
    }

    #[test]
    fn supplementary_characters() {
        let encoded = vec![
            237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237, 191,
            191,
        ];
        assert_eq!(encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}"), encoded);
        assert_eq!(decode_modified_utf8(&encoded), "\u{10000}\u{dffff}\u{10FFFF}");
    }

    #[test]
    fn malformed_sequences() {
        assert_eq!(next_char(&[0x80]), None);
        assert_eq!(next_char(&[0xC3]), None);
        assert_eq!(next_char(&[0xF0, 0x90, 0x80, 0x80]), None);
        assert_eq!(decode_modified_utf8(&[b'a', 0x80, b'b']), "a\u{FFFD}b");

        // unpaired high surrogate
        assert_eq!(decode_modified_utf8(&[237, 160, 128, b'x']), "\u{FFFD}x");
    }

    #[test]
    fn byte_validity() {
        assert!(is_valid_byte(b'a'));
        assert!(is_valid_byte(0xEF));
        assert!(!is_valid_byte(0));
        assert!(!is_valid_byte(0xF0));
        assert!(!is_valid_byte(0xFF));
    }
}
