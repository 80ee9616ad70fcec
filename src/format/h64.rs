//! The crypt-family "hash64" codec.
//!
//! Packs 6 bits per character over the alphabet `./0-9A-Za-z`. Unlike
//! standard base64, the least significant bits of each 3-byte group land in
//! the first character. Partial trailing groups of 1 or 2 bytes emit 2 or 3
//! characters; the unused high bits of the last character are written as
//! zero and ignored when decoding.

use crate::error::Error;
use crate::Result;

/// The 64-character alphabet, indexed by 6-bit value.
pub const CHARS: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Returns the 6-bit value of an alphabet character.
pub fn decode_char(c: u8) -> Option<u8> {
    match c {
        b'.' => Some(0),
        b'/' => Some(1),
        b'0'..=b'9' => Some(c - b'0' + 2),
        b'A'..=b'Z' => Some(c - b'A' + 12),
        b'a'..=b'z' => Some(c - b'a' + 38),
        _ => None,
    }
}

/// Returns `true` if every byte of `text` belongs to the alphabet.
pub fn is_h64(text: &str) -> bool {
    text.bytes().all(|c| decode_char(c).is_some())
}

fn char_value(c: u8) -> Result<u32> {
    decode_char(c)
        .map(u32::from)
        .ok_or_else(|| Error::Format(format!("invalid hash64 character {:?}", c as char)))
}

/// Encodes bytes, three at a time, into hash64 text.
pub fn encode_bytes(source: &[u8]) -> String {
    let mut out = String::with_capacity(source.len().div_ceil(3) * 4);
    for chunk in source.chunks(3) {
        let value = chunk
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &b)| acc | (u32::from(b) << (8 * i)));
        for i in 0..=chunk.len() {
            out.push(CHARS[((value >> (6 * i)) & 0x3f) as usize] as char);
        }
    }
    out
}

/// Decodes hash64 text back into bytes.
///
/// Padding bits in the final character are dropped without being checked,
/// so hashes written by lenient legacy encoders still decode.
///
/// # Errors
///
/// Returns [`Error::Format`] if the length is `1 mod 4` or a character is
/// outside the alphabet.
pub fn decode_bytes(source: &str) -> Result<Vec<u8>> {
    let text = source.as_bytes();
    if text.len() % 4 == 1 {
        return Err(Error::Format(format!(
            "hash64 text length {} is not valid",
            text.len()
        )));
    }
    let mut out = Vec::with_capacity(text.len() * 3 / 4);
    for chunk in text.chunks(4) {
        let mut value = 0u32;
        for (i, &c) in chunk.iter().enumerate() {
            value |= char_value(c)? << (6 * i);
        }
        for i in 0..chunk.len() - 1 {
            out.push((value >> (8 * i)) as u8);
        }
    }
    Ok(out)
}

/// Reorders `source` by `offsets` (output byte `i` is `source[offsets[i]]`)
/// and encodes the result. Offsets may repeat.
///
/// # Errors
///
/// Returns [`Error::Structural`] if an offset indexes past `source`.
pub fn encode_transposed_bytes(source: &[u8], offsets: &[usize]) -> Result<String> {
    let tmp = offsets
        .iter()
        .map(|&off| {
            source.get(off).copied().ok_or_else(|| {
                Error::Structural(format!(
                    "offset {off} is out of range for {} bytes",
                    source.len()
                ))
            })
        })
        .collect::<Result<Vec<u8>>>()?;
    Ok(encode_bytes(&tmp))
}

/// Decodes `source` and undoes the permutation applied by
/// [`encode_transposed_bytes`].
///
/// # Errors
///
/// Returns [`Error::Structural`] if the offsets do not describe a
/// permutation of the decoded bytes: a duplicate offset leaves one output
/// position without a value.
pub fn decode_transposed_bytes(source: &str, offsets: &[usize]) -> Result<Vec<u8>> {
    let tmp = decode_bytes(source)?;
    if tmp.len() != offsets.len() {
        return Err(Error::Structural(format!(
            "{} offsets given for {} decoded bytes",
            offsets.len(),
            tmp.len()
        )));
    }
    let mut buf: Vec<Option<u8>> = vec![None; offsets.len()];
    for (&off, &byte) in offsets.iter().zip(tmp.iter()) {
        let slot = buf.get_mut(off).ok_or_else(|| {
            Error::Structural(format!("offset {off} is out of range"))
        })?;
        *slot = Some(byte);
    }
    buf.into_iter()
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| Error::Structural("offset list has duplicate entries".into()))
}

/// Encodes the low `chars * 6` bits of `value`, least significant first.
pub fn encode_int_le(value: u64, chars: usize) -> String {
    (0..chars)
        .map(|i| CHARS[((value >> (6 * i)) & 0x3f) as usize] as char)
        .collect()
}

/// Decodes a little-endian hash64 integer of up to 10 characters.
pub fn decode_int_le(source: &str) -> Result<u64> {
    if source.len() > 10 {
        return Err(Error::Format("hash64 integer is too long".into()));
    }
    source
        .bytes()
        .enumerate()
        .try_fold(0u64, |acc, (i, c)| {
            Ok::<_, Error>(acc | (u64::from(char_value(c)?) << (6 * i)))
        })
}

/// Encodes a 12-bit value as two characters (des-crypt salts).
pub fn encode_int12(value: u16) -> String {
    encode_int_le(u64::from(value & 0x0fff), 2)
}

/// Encodes a 24-bit value as four characters (bsdi-crypt rounds and salts).
pub fn encode_int24(value: u32) -> String {
    encode_int_le(u64::from(value & 0x00ff_ffff), 4)
}

/// Encodes a 64-bit block big-endian into 11 characters, as DES-based crypt
/// checksums are written. The 2 trailing pad bits are zero.
pub fn encode_dc_int64(value: u64) -> String {
    let padded = u128::from(value) << 2;
    (0..11)
        .map(|i| CHARS[((padded >> (60 - 6 * i)) & 0x3f) as usize] as char)
        .collect()
}

/// Decodes an 11-character DES-crypt checksum, ignoring the pad bits.
pub fn decode_dc_int64(source: &str) -> Result<u64> {
    if source.len() != 11 {
        return Err(Error::Format(format!(
            "des checksum must be 11 characters, got {}",
            source.len()
        )));
    }
    let padded = source
        .bytes()
        .try_fold(0u128, |acc, c| Ok::<_, Error>((acc << 6) | u128::from(char_value(c)?)))?;
    Ok((padded >> 2) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODED: &[(&[u8], &str)] = &[
        (b"", ""),
        (b"\x55", "J/"),
        (b"\x55\xaa", "Jd8"),
        (b"\x55\xaa\x55", "JdOJ"),
        (b"\x55\xaa\x55\xaa", "JdOJe0"),
        (b"\x55\xaa\x55\xaa\x55", "JdOJeK3"),
        (b"\x55\xaa\x55\xaa\x55\xaa", "JdOJeKZe"),
        (b"\x55\xaa\x55\xaf", "JdOJj0"),
        (b"\x55\xaa\x55\xaa\x5f", "JdOJey3"),
    ];

    #[test]
    fn encode_bytes_vectors() {
        for (raw, text) in ENCODED {
            assert_eq!(encode_bytes(raw), *text);
        }
    }

    #[test]
    fn decode_bytes_vectors() {
        for (raw, text) in ENCODED {
            assert_eq!(decode_bytes(text).unwrap(), *raw);
        }
    }

    #[test]
    fn decode_ignores_padding_bits() {
        let cases: &[(&str, &[u8])] = &[
            ("..", b"\x00"),
            (".0", b"\x80"),
            (".2", b"\x00"),
            (".U", b"\x00"),
            ("...", b"\x00\x00"),
            ("..6", b"\x00\x80"),
            ("..E", b"\x00\x00"),
            ("..U", b"\x00\x00"),
        ];
        for (text, raw) in cases {
            assert_eq!(decode_bytes(text).unwrap(), *raw, "decoding {text}");
        }
    }

    #[test]
    fn decode_rejects_bad_length_and_chars() {
        assert!(matches!(decode_bytes("J"), Err(Error::Format(_))));
        assert!(matches!(decode_bytes("JdO"), Ok(_)));
        assert!(matches!(decode_bytes("Jd!J"), Err(Error::Format(_))));
    }

    #[test]
    fn bytes_survive_codec() {
        let data: Vec<u8> = (0u8..=255).collect();
        for len in [0, 1, 2, 3, 16, 23, 64, 256] {
            let slice = &data[..len];
            assert_eq!(decode_bytes(&encode_bytes(slice)).unwrap(), slice);
        }
    }

    #[test]
    fn encode_transposed() {
        let input = b"\x11\x22\x33";
        let cases: &[(&[u8], &[usize])] = &[
            (b"\x33\x22\x11", &[2, 1, 0]),
            (b"\x22\x33\x11", &[1, 2, 0]),
            (b"\x11\x11\x22", &[0, 0, 1]),
        ];
        for (expected, offsets) in cases {
            let text = encode_transposed_bytes(input, offsets).unwrap();
            assert_eq!(decode_bytes(&text).unwrap(), *expected);
        }
    }

    #[test]
    fn decode_transposed() {
        let cases: &[(&[u8], &[usize])] = &[(b"\x33\x22\x11", &[2, 1, 0]), (b"\x22\x33\x11", &[1, 2, 0])];
        for (stored, offsets) in cases {
            let text = encode_bytes(stored);
            assert_eq!(decode_transposed_bytes(&text, offsets).unwrap(), b"\x11\x22\x33");
        }
    }

    #[test]
    fn transposed_permutation_is_reversible() {
        let input: Vec<u8> = (10u8..22).collect();
        let offsets = [5, 0, 11, 3, 7, 1, 9, 2, 10, 4, 8, 6];
        let text = encode_transposed_bytes(&input, &offsets).unwrap();
        assert_eq!(decode_transposed_bytes(&text, &offsets).unwrap(), input);
    }

    #[test]
    fn decode_transposed_rejects_duplicates() {
        let text = encode_bytes(b"\x11\x11\x22");
        assert!(matches!(
            decode_transposed_bytes(&text, &[0, 0, 1]),
            Err(Error::Structural(_))
        ));
        let text = encode_bytes(b"\x11\x44\x22");
        assert!(matches!(
            decode_transposed_bytes(&text, &[0, 0, 1]),
            Err(Error::Structural(_))
        ));
    }

    #[test]
    fn transposed_offsets_out_of_range() {
        assert!(matches!(
            encode_transposed_bytes(b"\x01\x02", &[0, 2]),
            Err(Error::Structural(_))
        ));
        let text = encode_bytes(b"\x01\x02");
        assert!(matches!(
            decode_transposed_bytes(&text, &[0, 5]),
            Err(Error::Structural(_))
        ));
        assert!(matches!(
            decode_transposed_bytes(&text, &[0, 1, 2]),
            Err(Error::Structural(_))
        ));
    }

    #[test]
    fn small_integers() {
        assert_eq!(decode_int_le("Gl/.").unwrap(), 7250);
        assert_eq!(encode_int24(7250), "Gl/.");
        assert_eq!(encode_int12(0), "..");
        assert_eq!(decode_int_le("aZ").unwrap(), 38 + (37 << 6));
        assert!(decode_int_le("a!").is_err());
    }

    #[test]
    fn dc_int64() {
        assert_eq!(encode_dc_int64(0), "...........");
        let text = encode_dc_int64(0x8CA6_4DE9_C1B1_23A7);
        assert_eq!(text.len(), 11);
        assert_eq!(decode_dc_int64(&text).unwrap(), 0x8CA6_4DE9_C1B1_23A7);
        assert_eq!(decode_dc_int64(&encode_dc_int64(u64::MAX)).unwrap(), u64::MAX);
        assert!(decode_dc_int64("short").is_err());
    }
}
