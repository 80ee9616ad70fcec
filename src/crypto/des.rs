//! DES block cipher, as used by the crypt(3) family.
//!
//! Blocks and keys are handled as big-endian `u64` values; bit 1 of the
//! FIPS 46 tables is the most significant bit. Besides plain single-block
//! encryption, [`encrypt_int_block`] supports the crypt-style salt
//! perturbation: salt bit `k` swaps bits `k` and `k + 24` of the expanded
//! right half before it meets the round key.

use zeroize::Zeroize;

use crate::Result;
use crate::error::Error;

/// Largest salt accepted by [`encrypt_int_block`] (24 bits).
pub const MAX_SALT: u32 = 0x00ff_ffff;

const IP: [u8; 64] = [
    58, 50, 42, 34, 26, 18, 10, 2, 60, 52, 44, 36, 28, 20, 12, 4, //
    62, 54, 46, 38, 30, 22, 14, 6, 64, 56, 48, 40, 32, 24, 16, 8, //
    57, 49, 41, 33, 25, 17, 9, 1, 59, 51, 43, 35, 27, 19, 11, 3, //
    61, 53, 45, 37, 29, 21, 13, 5, 63, 55, 47, 39, 31, 23, 15, 7,
];

const FP: [u8; 64] = [
    40, 8, 48, 16, 56, 24, 64, 32, 39, 7, 47, 15, 55, 23, 63, 31, //
    38, 6, 46, 14, 54, 22, 62, 30, 37, 5, 45, 13, 53, 21, 61, 29, //
    36, 4, 44, 12, 52, 20, 60, 28, 35, 3, 43, 11, 51, 19, 59, 27, //
    34, 2, 42, 10, 50, 18, 58, 26, 33, 1, 41, 9, 49, 17, 57, 25,
];

const E: [u8; 48] = [
    32, 1, 2, 3, 4, 5, 4, 5, 6, 7, 8, 9, //
    8, 9, 10, 11, 12, 13, 12, 13, 14, 15, 16, 17, //
    16, 17, 18, 19, 20, 21, 20, 21, 22, 23, 24, 25, //
    24, 25, 26, 27, 28, 29, 28, 29, 30, 31, 32, 1,
];

const P: [u8; 32] = [
    16, 7, 20, 21, 29, 12, 28, 17, 1, 15, 23, 26, 5, 18, 31, 10, //
    2, 8, 24, 14, 32, 27, 3, 9, 19, 13, 30, 6, 22, 11, 4, 25,
];

const PC1: [u8; 56] = [
    57, 49, 41, 33, 25, 17, 9, 1, 58, 50, 42, 34, 26, 18, //
    10, 2, 59, 51, 43, 35, 27, 19, 11, 3, 60, 52, 44, 36, //
    63, 55, 47, 39, 31, 23, 15, 7, 62, 54, 46, 38, 30, 22, //
    14, 6, 61, 53, 45, 37, 29, 21, 13, 5, 28, 20, 12, 4,
];

const PC2: [u8; 48] = [
    14, 17, 11, 24, 1, 5, 3, 28, 15, 6, 21, 10, //
    23, 19, 12, 4, 26, 8, 16, 7, 27, 20, 13, 2, //
    41, 52, 31, 37, 47, 55, 30, 40, 51, 45, 33, 48, //
    44, 49, 39, 56, 34, 53, 46, 42, 50, 36, 29, 32,
];

const SHIFTS: [u32; 16] = [1, 1, 2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 1];

/// Substitution boxes, each laid out as 4 rows of 16 columns.
const SBOX: [[u8; 64]; 8] = [
    [
        14, 4, 13, 1, 2, 15, 11, 8, 3, 10, 6, 12, 5, 9, 0, 7, //
        0, 15, 7, 4, 14, 2, 13, 1, 10, 6, 12, 11, 9, 5, 3, 8, //
        4, 1, 14, 8, 13, 6, 2, 11, 15, 12, 9, 7, 3, 10, 5, 0, //
        15, 12, 8, 2, 4, 9, 1, 7, 5, 11, 3, 14, 10, 0, 6, 13,
    ],
    [
        15, 1, 8, 14, 6, 11, 3, 4, 9, 7, 2, 13, 12, 0, 5, 10, //
        3, 13, 4, 7, 15, 2, 8, 14, 12, 0, 1, 10, 6, 9, 11, 5, //
        0, 14, 7, 11, 10, 4, 13, 1, 5, 8, 12, 6, 9, 3, 2, 15, //
        13, 8, 10, 1, 3, 15, 4, 2, 11, 6, 7, 12, 0, 5, 14, 9,
    ],
    [
        10, 0, 9, 14, 6, 3, 15, 5, 1, 13, 12, 7, 11, 4, 2, 8, //
        13, 7, 0, 9, 3, 4, 6, 10, 2, 8, 5, 14, 12, 11, 15, 1, //
        13, 6, 4, 9, 8, 15, 3, 0, 11, 1, 2, 12, 5, 10, 14, 7, //
        1, 10, 13, 0, 6, 9, 8, 7, 4, 15, 14, 3, 11, 5, 2, 12,
    ],
    [
        7, 13, 14, 3, 0, 6, 9, 10, 1, 2, 8, 5, 11, 12, 4, 15, //
        13, 8, 11, 5, 6, 15, 0, 3, 4, 7, 2, 12, 1, 10, 14, 9, //
        10, 6, 9, 0, 12, 11, 7, 13, 15, 1, 3, 14, 5, 2, 8, 4, //
        3, 15, 0, 6, 10, 1, 13, 8, 9, 4, 5, 11, 12, 7, 2, 14,
    ],
    [
        2, 12, 4, 1, 7, 10, 11, 6, 8, 5, 3, 15, 13, 0, 14, 9, //
        14, 11, 2, 12, 4, 7, 13, 1, 5, 0, 15, 10, 3, 9, 8, 6, //
        4, 2, 1, 11, 10, 13, 7, 8, 15, 9, 12, 5, 6, 3, 0, 14, //
        11, 8, 12, 7, 1, 14, 2, 13, 6, 15, 0, 9, 10, 4, 5, 3,
    ],
    [
        12, 1, 10, 15, 9, 2, 6, 8, 0, 13, 3, 4, 14, 7, 5, 11, //
        10, 15, 4, 2, 7, 12, 9, 5, 6, 1, 13, 14, 0, 11, 3, 8, //
        9, 14, 15, 5, 2, 8, 12, 3, 7, 0, 4, 10, 1, 13, 11, 6, //
        4, 3, 2, 12, 9, 5, 15, 10, 11, 14, 1, 7, 6, 0, 8, 13,
    ],
    [
        4, 11, 2, 14, 15, 0, 8, 13, 3, 12, 9, 7, 5, 10, 6, 1, //
        13, 0, 11, 7, 4, 9, 1, 10, 14, 3, 5, 12, 2, 15, 8, 6, //
        1, 4, 11, 13, 12, 3, 7, 14, 10, 15, 6, 8, 0, 5, 9, 2, //
        6, 11, 13, 8, 1, 4, 10, 7, 9, 5, 0, 15, 14, 2, 3, 12,
    ],
    [
        13, 2, 8, 4, 6, 15, 11, 1, 10, 9, 3, 14, 5, 0, 12, 7, //
        1, 15, 13, 8, 10, 3, 7, 4, 12, 5, 6, 11, 0, 14, 9, 2, //
        7, 11, 4, 1, 9, 12, 14, 2, 0, 6, 10, 13, 15, 3, 5, 8, //
        2, 1, 14, 7, 4, 10, 8, 13, 15, 12, 9, 0, 3, 5, 6, 11,
    ],
];

/// Gathers bits of an `in_bits`-wide value into a new value, one output bit
/// per table entry, most significant first.
fn permute(input: u64, in_bits: u32, table: &[u8]) -> u64 {
    table.iter().fold(0u64, |out, &pos| {
        (out << 1) | ((input >> (in_bits - u32::from(pos))) & 1)
    })
}

/// The 16 round subkeys derived from one 64-bit key.
pub struct KeySchedule {
    subkeys: [u64; 16],
}

impl KeySchedule {
    /// Drops the parity bits and expands `key` into 16 48-bit subkeys.
    pub fn new(key: u64) -> Self {
        let cd = permute(key, 64, &PC1);
        let mut c = (cd >> 28) as u32;
        let mut d = (cd & 0x0fff_ffff) as u32;
        let mut subkeys = [0u64; 16];
        for (subkey, &shift) in subkeys.iter_mut().zip(SHIFTS.iter()) {
            c = ((c << shift) | (c >> (28 - shift))) & 0x0fff_ffff;
            d = ((d << shift) | (d >> (28 - shift))) & 0x0fff_ffff;
            *subkey = permute((u64::from(c) << 28) | u64::from(d), 56, &PC2);
        }
        Self { subkeys }
    }
}

impl Drop for KeySchedule {
    fn drop(&mut self) {
        self.subkeys.zeroize();
    }
}

/// Spreads a crypt salt onto the expansion halves: salt bit `k` becomes
/// bit `23 - k` of the returned mask.
fn salt_mask(salt: u32) -> u32 {
    (0..24)
        .filter(|k| salt & (1 << k) != 0)
        .fold(0u32, |mask, k| mask | (1 << (23 - k)))
}

/// The round function: expansion, salt swap, key mix, S-boxes, P-box.
fn feistel(right: u32, subkey: u64, mask: u32) -> u32 {
    let expanded = permute(u64::from(right), 32, &E);
    let hi = (expanded >> 24) as u32;
    let lo = (expanded & 0x00ff_ffff) as u32;
    let swap = (hi ^ lo) & mask;
    let expanded = (u64::from(hi ^ swap) << 24) | u64::from(lo ^ swap);

    let mixed = expanded ^ subkey;
    let substituted = SBOX.iter().enumerate().fold(0u64, |out, (i, sbox)| {
        let six = ((mixed >> (42 - 6 * i)) & 0x3f) as usize;
        let row = ((six & 0x20) >> 4) | (six & 0x01);
        let col = (six >> 1) & 0x0f;
        (out << 4) | u64::from(sbox[row * 16 + col])
    });
    permute(substituted, 32, &P) as u32
}

fn run(schedule: &KeySchedule, input: u64, mask: u32, rounds: u32) -> u64 {
    let permuted = permute(input, 64, &IP);
    let mut left = (permuted >> 32) as u32;
    let mut right = permuted as u32;
    for _ in 0..rounds {
        for &subkey in &schedule.subkeys {
            let next = left ^ feistel(right, subkey, mask);
            left = right;
            right = next;
        }
        std::mem::swap(&mut left, &mut right);
    }
    permute((u64::from(left) << 32) | u64::from(right), 64, &FP)
}

/// Encrypts a single 8-byte block under an 8-byte key (ECB, one block).
///
/// # Errors
///
/// Returns [`Error::Domain`] unless both `key` and `input` are 8 bytes.
pub fn encrypt_block(key: &[u8], input: &[u8]) -> Result<[u8; 8]> {
    let key: [u8; 8] = key
        .try_into()
        .map_err(|_| Error::Domain(format!("des key must be 8 bytes, got {}", key.len())))?;
    let block: [u8; 8] = input
        .try_into()
        .map_err(|_| Error::Domain(format!("des block must be 8 bytes, got {}", input.len())))?;
    let schedule = KeySchedule::new(u64::from_be_bytes(key));
    Ok(run(&schedule, u64::from_be_bytes(block), 0, 1).to_be_bytes())
}

/// Encrypts `input` under `key` `rounds` times with the crypt-style salt
/// perturbation applied in every round.
///
/// With `salt == 0` and `rounds == 1` this is plain DES.
///
/// # Errors
///
/// Returns [`Error::Domain`] if `salt` is wider than 24 bits or `rounds`
/// is zero.
pub fn encrypt_int_block(key: u64, input: u64, salt: u32, rounds: u32) -> Result<u64> {
    if salt > MAX_SALT {
        return Err(Error::Domain(format!("des salt {salt:#x} exceeds 24 bits")));
    }
    if rounds < 1 {
        return Err(Error::Domain("des rounds must be >= 1".into()));
    }
    let schedule = KeySchedule::new(key);
    Ok(run(&schedule, input, salt_mask(salt), rounds))
}

/// Builds a DES key from up to 8 secret bytes the way crypt(3) does: the
/// low 7 bits of each byte, shifted over the parity bit.
pub(crate) fn secret_to_key(chunk: &[u8]) -> u64 {
    (0..8).fold(0u64, |key, i| {
        let c = chunk.get(i).copied().unwrap_or(0);
        (key << 8) | u64::from((c & 0x7f) << 1)
    })
}
