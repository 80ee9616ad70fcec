//! BSDi extended DES crypt: `_` followed by 4 round characters, 4 salt
//! characters and 11 checksum characters. Secrets of any length are folded
//! into a single DES key.

use crate::Result;
use crate::crypto::des::{MAX_SALT, encrypt_int_block, secret_to_key};
use crate::error::Error;
use crate::format::h64;
use crate::scheme::{
    CostTiers, HashOptions, HashRecord, PasswordHash, c_string, choose_rounds, choose_salt,
};

pub const NAME: &str = "bsdi-crypt";

const MAX_ROUNDS: u32 = 0x00ff_ffff;
const HASH_LEN: usize = 20;
const CONFIG_LEN: usize = 9;

pub struct BsdiCrypt {
    tiers: CostTiers,
}

impl Default for BsdiCrypt {
    fn default() -> Self {
        Self::new()
    }
}

impl BsdiCrypt {
    pub fn new() -> Self {
        Self {
            tiers: CostTiers::fixed(5001, 7250, 12001, 1, MAX_ROUNDS),
        }
    }

    pub fn with_tiers(mut self, tiers: CostTiers) -> Result<Self> {
        self.tiers = tiers.within(NAME, 1, MAX_ROUNDS)?;
        Ok(self)
    }
}

/// Folds the whole secret into one DES key, 8 bytes at a time.
fn fold_key(secret: &[u8]) -> Result<u64> {
    let mut chunks = secret.chunks(8);
    let mut key = secret_to_key(chunks.next().unwrap_or_default());
    for chunk in chunks {
        key = encrypt_int_block(key, key, 0, 1)? ^ secret_to_key(chunk);
    }
    Ok(key)
}

impl PasswordHash for BsdiCrypt {
    fn name(&self) -> &'static str {
        NAME
    }

    fn parse(&self, hash: &str) -> Result<HashRecord> {
        let body = hash
            .strip_prefix('_')
            .ok_or_else(|| Error::Format(format!("{NAME}: missing '_' prefix")))?;
        if hash.len() != CONFIG_LEN && hash.len() != HASH_LEN {
            return Err(Error::Format(format!("{NAME}: wrong length {}", hash.len())));
        }
        if !h64::is_h64(body) {
            return Err(Error::Format(format!("{NAME}: invalid character")));
        }

        let rounds = h64::decode_int_le(&body[..4])? as u32;
        if rounds < 1 {
            return Err(Error::Format(format!("{NAME}: rounds must be >= 1")));
        }
        let salt = h64::decode_int_le(&body[4..8])? as u32;
        let checksum = match &body[8..] {
            "" => None,
            text => Some(h64::decode_dc_int64(text)?.to_be_bytes().to_vec()),
        };

        Ok(HashRecord::new(
            NAME,
            "_",
            Some(rounds),
            salt.to_le_bytes()[..3].to_vec(),
            checksum,
            hash,
        ))
    }

    fn encrypt(&self, secret: &[u8], options: &HashOptions<'_>) -> Result<String> {
        let existing = options.existing.map(|h| self.parse(h)).transpose()?;
        let rounds = choose_rounds(NAME, &self.tiers, existing.as_ref(), options.cost.as_ref());
        let salt = match choose_salt(existing.as_ref(), options.keep_salt, 3)?.as_slice() {
            &[b0, b1, b2] => u32::from_le_bytes([b0, b1, b2, 0]) & MAX_SALT,
            _ => return Err(Error::Domain(format!("{NAME}: salt must be 24 bits"))),
        };

        let key = fold_key(c_string(secret))?;
        let result = encrypt_int_block(key, 0, salt, rounds)?;
        Ok(format!(
            "_{}{}{}",
            h64::encode_int24(rounds),
            h64::encode_int24(salt),
            h64::encode_dc_int64(result)
        ))
    }

    fn cost_tiers(&self) -> Option<CostTiers> {
        Some(self.tiers)
    }
}
