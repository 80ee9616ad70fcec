//! `$pbkdf2[-sha256|-sha512]$<rounds>$<salt>$<checksum>` hashes.
//!
//! Salt and checksum are H64-encoded; the salt is always 16 bytes and the
//! checksum is as long as the digest output. H64 is not passlib's adapted
//! base64, so these hashes do not verify under passlib and vice versa.

use crate::Result;
use crate::crypto::pbkdf2::{self as engine, Pbkdf2Backend, PrfDigest};
use crate::error::Error;
use crate::format::h64;
use crate::scheme::{
    CostTiers, HashOptions, HashRecord, PasswordHash, choose_rounds, choose_salt, parse_decimal,
};

pub const SALT_LEN: usize = 16;

pub struct Pbkdf2 {
    digest: PrfDigest,
    tiers: CostTiers,
    backend: Option<&'static dyn Pbkdf2Backend>,
}

impl Pbkdf2 {
    pub fn new(digest: PrfDigest) -> Self {
        let tiers = match digest {
            PrfDigest::Sha1 => CostTiers::fixed(20_000, 60_000, 131_000, 1, u32::MAX),
            PrfDigest::Sha256 => CostTiers::fixed(10_000, 29_000, 60_000, 1, u32::MAX),
            PrfDigest::Sha512 => CostTiers::fixed(8_000, 25_000, 50_000, 1, u32::MAX),
        };
        Self {
            digest,
            tiers,
            backend: None,
        }
    }

    pub fn sha1() -> Self {
        Self::new(PrfDigest::Sha1)
    }

    pub fn sha256() -> Self {
        Self::new(PrfDigest::Sha256)
    }

    pub fn sha512() -> Self {
        Self::new(PrfDigest::Sha512)
    }

    pub fn with_tiers(mut self, tiers: CostTiers) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_backend(mut self, backend: &'static dyn Pbkdf2Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// The tag between the first pair of `$`.
    pub fn ident(&self) -> &'static str {
        match self.digest {
            PrfDigest::Sha1 => "pbkdf2",
            PrfDigest::Sha256 => "pbkdf2-sha256",
            PrfDigest::Sha512 => "pbkdf2-sha512",
        }
    }

    fn backend(&self) -> &'static dyn Pbkdf2Backend {
        self.backend.unwrap_or_else(engine::pbkdf2_backend)
    }
}

impl PasswordHash for Pbkdf2 {
    fn name(&self) -> &'static str {
        match self.digest {
            PrfDigest::Sha1 => "pbkdf2-sha1",
            PrfDigest::Sha256 => "pbkdf2-sha256",
            PrfDigest::Sha512 => "pbkdf2-sha512",
        }
    }

    fn parse(&self, hash: &str) -> Result<HashRecord> {
        let malformed = |why: &str| Error::Format(format!("not a {} hash ({why})", self.name()));

        let body = hash
            .strip_prefix('$')
            .ok_or_else(|| malformed("missing '$'"))?;
        let fields: Vec<&str> = body.split('$').collect();
        let (ident, rounds, salt, checksum) = match fields.as_slice() {
            &[ident, rounds, salt] => (ident, rounds, salt, None),
            &[ident, rounds, salt, checksum] => (ident, rounds, salt, Some(checksum)),
            _ => return Err(malformed("wrong field count")),
        };

        if ident != self.ident() {
            return Err(malformed("wrong ident"));
        }
        let rounds = parse_decimal(self.name(), rounds)?;
        if rounds < 1 {
            return Err(malformed("rounds must be >= 1"));
        }
        let salt = h64::decode_bytes(salt)?;
        if salt.len() != SALT_LEN {
            return Err(malformed("wrong salt length"));
        }
        let checksum = checksum.map(h64::decode_bytes).transpose()?;
        if checksum
            .as_ref()
            .is_some_and(|c| c.len() != self.digest.output_size())
        {
            return Err(malformed("wrong checksum length"));
        }

        Ok(HashRecord::new(
            self.name(),
            self.ident(),
            Some(rounds),
            salt,
            checksum,
            hash,
        ))
    }

    fn encrypt(&self, secret: &[u8], options: &HashOptions<'_>) -> Result<String> {
        let existing = options.existing.map(|h| self.parse(h)).transpose()?;
        let rounds = choose_rounds(
            self.name(),
            &self.tiers,
            existing.as_ref(),
            options.cost.as_ref(),
        );
        let salt = choose_salt(existing.as_ref(), options.keep_salt, SALT_LEN)?;

        let key = engine::derive_using(
            self.backend(),
            secret,
            &salt,
            rounds,
            self.digest.output_size(),
            self.digest,
        )?;
        Ok(format!(
            "${}${rounds}${}${}",
            self.ident(),
            h64::encode_bytes(&salt),
            h64::encode_bytes(&key)
        ))
    }

    fn cost_tiers(&self) -> Option<CostTiers> {
        Some(self.tiers)
    }
}
