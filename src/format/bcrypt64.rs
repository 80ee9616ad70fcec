//! bcrypt's base64 dialect.
//!
//! Alphabet `./A-Za-z0-9`, standard big-endian bit packing, no `=` padding.
//! Salts are 16 bytes (22 characters) and checksums 23 bytes (31
//! characters).

use crate::Result;
use crate::error::Error;

const CHARS: &[u8; 64] = b"./ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn decode_char(c: u8) -> Result<u8> {
    match c {
        b'.' => Ok(0),
        b'/' => Ok(1),
        b'A'..=b'Z' => Ok(c - b'A' + 2),
        b'a'..=b'z' => Ok(c - b'a' + 28),
        b'0'..=b'9' => Ok(c - b'0' + 54),
        _ => Err(Error::Format(format!(
            "invalid bcrypt base64 character {:?}",
            c as char
        ))),
    }
}

/// Returns `true` if every byte of `text` belongs to the bcrypt alphabet.
pub fn is_bcrypt64(text: &str) -> bool {
    text.bytes().all(|c| decode_char(c).is_ok())
}

/// Encodes bytes into bcrypt base64.
pub fn encode(source: &[u8]) -> String {
    let mut out = String::with_capacity(source.len().div_ceil(3) * 4);
    for chunk in source.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied().unwrap_or(0);
        let b2 = chunk.get(2).copied().unwrap_or(0);
        let sextets = [
            b0 >> 2,
            ((b0 & 0x03) << 4) | (b1 >> 4),
            ((b1 & 0x0f) << 2) | (b2 >> 6),
            b2 & 0x3f,
        ];
        for &s in &sextets[..=chunk.len()] {
            out.push(CHARS[s as usize] as char);
        }
    }
    out
}

/// Decodes bcrypt base64; trailing pad bits are ignored.
///
/// # Errors
///
/// Returns [`Error::Format`] on a bad character or a length of `1 mod 4`.
pub fn decode(source: &str) -> Result<Vec<u8>> {
    let text = source.as_bytes();
    if text.len() % 4 == 1 {
        return Err(Error::Format(format!(
            "bcrypt base64 length {} is not valid",
            text.len()
        )));
    }
    let mut out = Vec::with_capacity(text.len() * 3 / 4);
    for chunk in text.chunks(4) {
        let mut s = [0u8; 4];
        for (slot, &c) in s.iter_mut().zip(chunk) {
            *slot = decode_char(c)?;
        }
        let bytes = [
            (s[0] << 2) | (s[1] >> 4),
            (s[1] << 4) | (s[2] >> 2),
            (s[2] << 6) | s[3],
        ];
        out.extend_from_slice(&bytes[..chunk.len() - 1]);
    }
    Ok(out)
}
