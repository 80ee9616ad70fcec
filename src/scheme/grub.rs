//! GRUB2's `grub.pbkdf2.sha512.<rounds>.<salt>.<checksum>` form, as written
//! by `grub-mkpasswd-pbkdf2`: uppercase hex, 64-byte salt and key.

use crate::Result;
use crate::crypto::pbkdf2::{self as engine, Pbkdf2Backend, PrfDigest};
use crate::error::Error;
use crate::scheme::{
    CostTiers, HashOptions, HashRecord, PasswordHash, choose_rounds, choose_salt, parse_decimal,
};

pub const NAME: &str = "grub-pbkdf2-sha512";

const PREFIX: &str = "grub.pbkdf2.sha512.";
const SALT_LEN: usize = 64;
const KEY_LEN: usize = 64;

pub struct GrubPbkdf2 {
    tiers: CostTiers,
    backend: Option<&'static dyn Pbkdf2Backend>,
}

impl Default for GrubPbkdf2 {
    fn default() -> Self {
        Self::new()
    }
}

impl GrubPbkdf2 {
    pub fn new() -> Self {
        Self {
            tiers: CostTiers::fixed(10_000, 20_000, 40_000, 1, u32::MAX),
            backend: None,
        }
    }

    pub fn with_tiers(mut self, tiers: CostTiers) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_backend(mut self, backend: &'static dyn Pbkdf2Backend) -> Self {
        self.backend = Some(backend);
        self
    }
}

fn is_upper_hex(text: &str) -> bool {
    text.bytes()
        .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

fn decode_hex(text: &str, what: &str) -> Result<Vec<u8>> {
    if text.is_empty() || !is_upper_hex(text) {
        return Err(Error::Format(format!("{NAME}: {what} is not uppercase hex")));
    }
    hex::decode(text).map_err(|e| Error::Format(format!("{NAME}: {what}: {e}")))
}

impl PasswordHash for GrubPbkdf2 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn parse(&self, hash: &str) -> Result<HashRecord> {
        let body = hash
            .strip_prefix(PREFIX)
            .ok_or_else(|| Error::Format(format!("{NAME}: missing {PREFIX:?} prefix")))?;
        let fields: Vec<&str> = body.split('.').collect();
        let (rounds, salt, checksum) = match fields.as_slice() {
            &[rounds, salt] => (rounds, salt, None),
            &[rounds, salt, checksum] => (rounds, salt, Some(checksum)),
            _ => return Err(Error::Format(format!("{NAME}: wrong field count"))),
        };

        let rounds = parse_decimal(NAME, rounds)?;
        if rounds < 1 {
            return Err(Error::Format(format!("{NAME}: rounds must be >= 1")));
        }
        let salt = decode_hex(salt, "salt")?;
        if salt.len() != SALT_LEN {
            return Err(Error::Format(format!("{NAME}: salt must be {SALT_LEN} bytes")));
        }
        let checksum = checksum.map(|c| decode_hex(c, "checksum")).transpose()?;
        if checksum.as_ref().is_some_and(|c| c.len() != KEY_LEN) {
            return Err(Error::Format(format!("{NAME}: checksum must be {KEY_LEN} bytes")));
        }

        Ok(HashRecord::new(NAME, "grub.pbkdf2.sha512", Some(rounds), salt, checksum, hash))
    }

    fn encrypt(&self, secret: &[u8], options: &HashOptions<'_>) -> Result<String> {
        let existing = options.existing.map(|h| self.parse(h)).transpose()?;
        let rounds = choose_rounds(NAME, &self.tiers, existing.as_ref(), options.cost.as_ref());
        let salt = choose_salt(existing.as_ref(), options.keep_salt, SALT_LEN)?;

        let backend = self.backend.unwrap_or_else(engine::pbkdf2_backend);
        let key = engine::derive_using(backend, secret, &salt, rounds, KEY_LEN, PrfDigest::Sha512)?;
        Ok(format!(
            "{PREFIX}{rounds}.{}.{}",
            hex::encode_upper(&salt),
            hex::encode_upper(&key[..])
        ))
    }

    fn cost_tiers(&self) -> Option<CostTiers> {
        Some(self.tiers)
    }
}
