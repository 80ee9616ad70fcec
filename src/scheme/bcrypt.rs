//! `$2a$NN$<salt><checksum>` hashes.
//!
//! Secrets are read up to the first NUL. `$2a$` keys carry the trailing NUL
//! and legacy `$2$` keys do not.

use crate::Result;
use crate::crypto::eks::{self, BcryptBackend, MAX_COST, MIN_COST, SALT_LEN};
use crate::error::Error;
use crate::format::bcrypt64;
use crate::scheme::{
    CostTiers, HashOptions, HashRecord, PasswordHash, c_string, choose_rounds, choose_salt,
};

pub const NAME: &str = "bcrypt";

const SALT_CHARS: usize = 22;
const CHECKSUM_CHARS: usize = 31;
const DEFAULT_IDENT: &str = "2a";
const LEGACY_IDENT: &str = "2";

const DEFAULT_TIERS: CostTiers = CostTiers::fixed(11, 13, 14, MIN_COST, MAX_COST);

pub struct Bcrypt {
    tiers: CostTiers,
    backend: Option<&'static dyn BcryptBackend>,
}

impl Default for Bcrypt {
    fn default() -> Self {
        Self::new()
    }
}

impl Bcrypt {
    pub fn new() -> Self {
        Self {
            tiers: DEFAULT_TIERS,
            backend: None,
        }
    }

    pub fn with_tiers(mut self, tiers: CostTiers) -> Result<Self> {
        self.tiers = tiers.within(NAME, MIN_COST, MAX_COST)?;
        Ok(self)
    }

    /// Pins a backend instead of the process-wide selection.
    pub fn with_backend(mut self, backend: &'static dyn BcryptBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    fn backend(&self) -> &'static dyn BcryptBackend {
        self.backend.unwrap_or_else(eks::bcrypt_backend)
    }
}

fn malformed(hash: &str, why: &str) -> Error {
    Error::Format(format!("not a bcrypt hash ({why}): {hash:?}"))
}

impl PasswordHash for Bcrypt {
    fn name(&self) -> &'static str {
        NAME
    }

    fn parse(&self, hash: &str) -> Result<HashRecord> {
        let body = hash
            .strip_prefix('$')
            .ok_or_else(|| malformed(hash, "missing '$'"))?;
        let fields: Vec<&str> = body.split('$').collect();
        let &[ident, cost, data] = fields.as_slice() else {
            return Err(malformed(hash, "wrong field count"));
        };

        if ident != LEGACY_IDENT && ident != DEFAULT_IDENT {
            return Err(malformed(hash, "unsupported ident"));
        }
        if cost.len() != 2 || !cost.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(hash, "cost must be two digits"));
        }
        let rounds: u32 = cost.parse().map_err(|_| malformed(hash, "bad cost"))?;
        if !(MIN_COST..=MAX_COST).contains(&rounds) {
            return Err(malformed(hash, "cost out of range"));
        }

        if data.len() != SALT_CHARS && data.len() != SALT_CHARS + CHECKSUM_CHARS {
            return Err(malformed(hash, "wrong salt/checksum length"));
        }
        if !bcrypt64::is_bcrypt64(data) {
            return Err(malformed(hash, "invalid character"));
        }
        let (salt, checksum) = data.split_at(SALT_CHARS);
        let salt = bcrypt64::decode(salt)?;
        let checksum = match checksum {
            "" => None,
            text => Some(bcrypt64::decode(text)?),
        };

        Ok(HashRecord::new(NAME, ident, Some(rounds), salt, checksum, hash))
    }

    fn encrypt(&self, secret: &[u8], options: &HashOptions<'_>) -> Result<String> {
        let existing = options.existing.map(|h| self.parse(h)).transpose()?;
        let ident = existing
            .as_ref()
            .map_or(DEFAULT_IDENT, |record| record.ident())
            .to_string();
        let rounds = choose_rounds(NAME, &self.tiers, existing.as_ref(), options.cost.as_ref());
        let salt: [u8; SALT_LEN] = choose_salt(existing.as_ref(), options.keep_salt, SALT_LEN)?
            .try_into()
            .map_err(|_| Error::Domain("bcrypt salt must be 16 bytes".into()))?;

        let raw = self
            .backend()
            .raw_hash(c_string(secret), &salt, rounds, ident != LEGACY_IDENT)?;
        Ok(format!(
            "${ident}${rounds:02}${}{}",
            bcrypt64::encode(&salt),
            bcrypt64::encode(&raw)
        ))
    }

    fn cost_tiers(&self) -> Option<CostTiers> {
        Some(self.tiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::eks::builtin_bcrypt;

    const PASSWORD_HASH: &str = "$2a$05$bvIG6Nmid91Mu9RcmmWZfO5HJIMCT8riNW0hEp8f6/FuA2/mHZFpe";
    const EMPTY_HASH: &str = "$2a$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.";
    const LEGACY_PASSWORD_HASH: &str =
        "$2$05$bvIG6Nmid91Mu9RcmmWZfOW01wFeT1RrsgrYBZQqoJxsvqi6NQiA6";
    const LEGACY_EMPTY_HASH: &str = "$2$06$DCq7YPn5Rq63x1Lad4cll.TV4S6ytwfsfvkgY8jIucDrjc8deX1s.";

    #[test]
    fn verifies_published_hashes() {
        let scheme = Bcrypt::new();
        assert!(scheme.verify(b"password", PASSWORD_HASH).unwrap());
        assert!(!scheme.verify(b"Password", PASSWORD_HASH).unwrap());
        assert!(scheme.verify(b"", EMPTY_HASH).unwrap());
        assert!(!scheme.verify(b" ", EMPTY_HASH).unwrap());
    }

    #[test]
    fn builtin_backend_reproduces_hash() {
        let scheme = Bcrypt::new().with_backend(builtin_bcrypt());
        let again = scheme
            .encrypt(b"password", &HashOptions::reuse(PASSWORD_HASH))
            .unwrap();
        assert_eq!(again, PASSWORD_HASH);
    }

    #[test]
    fn fresh_hash_round_trips() {
        let scheme = Bcrypt::new();
        let options = HashOptions::new().with_cost(4);
        let hash = scheme.encrypt(b"hunter2", &options).unwrap();
        assert!(hash.starts_with("$2a$04$"));
        assert_eq!(hash.len(), 60);
        assert!(scheme.verify(b"hunter2", &hash).unwrap());
        assert!(!scheme.verify(b"hunter3", &hash).unwrap());
        assert_ne!(hash, scheme.encrypt(b"hunter2", &options).unwrap());
    }

    #[test]
    fn legacy_ident_hashes_without_terminator() {
        let scheme = Bcrypt::new();
        assert_eq!(scheme.parse(LEGACY_PASSWORD_HASH).unwrap().ident(), "2");
        assert!(scheme.verify(b"password", LEGACY_PASSWORD_HASH).unwrap());
        assert!(scheme.verify(b"", LEGACY_EMPTY_HASH).unwrap());

        let relabeled = PASSWORD_HASH.replacen("$2a$", "$2$", 1);
        assert!(!scheme.verify(b"password", &relabeled).unwrap());

        let again = scheme
            .encrypt(b"password", &HashOptions::reuse(LEGACY_PASSWORD_HASH))
            .unwrap();
        assert_eq!(again, LEGACY_PASSWORD_HASH);
    }

    #[test]
    fn existing_cost_is_reused_without_explicit_cost() {
        let scheme = Bcrypt::new();
        let options = HashOptions::new().with_existing("$2a$04$DCq7YPn5Rq63x1Lad4cll.");
        let hash = scheme.encrypt(b"pw", &options).unwrap();
        assert!(hash.starts_with("$2a$04$"));
        assert!(!hash.starts_with("$2a$04$DCq7YPn5Rq63x1Lad4cll."));
    }

    #[test]
    fn parses_templates_and_full_hashes() {
        let scheme = Bcrypt::new();
        let record = scheme.parse(PASSWORD_HASH).unwrap();
        assert_eq!(record.rounds(), Some(5));
        assert_eq!(record.salt().len(), SALT_LEN);
        assert_eq!(record.checksum().map(<[u8]>::len), Some(23));

        let template = scheme.parse("$2a$10$bvIG6Nmid91Mu9RcmmWZfO").unwrap();
        assert!(template.is_template());
        assert!(matches!(
            scheme.verify(b"pw", "$2a$10$bvIG6Nmid91Mu9RcmmWZfO"),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn rejects_malformed_hashes() {
        let scheme = Bcrypt::new();
        for bad in [
            "",
            "2a$05$bvIG6Nmid91Mu9RcmmWZfO",
            "$2b$05$bvIG6Nmid91Mu9RcmmWZfO",
            "$2a$5$bvIG6Nmid91Mu9RcmmWZfO",
            "$2a$03$bvIG6Nmid91Mu9RcmmWZfO",
            "$2a$32$bvIG6Nmid91Mu9RcmmWZfO",
            "$2a$05$bvIG6Nmid91Mu9RcmmWZf",
            "$2a$05$bvIG6Nmid91Mu9RcmmWZf_",
            "$2a$05$bvIG6Nmid91Mu9RcmmWZfO$",
        ] {
            assert!(!scheme.identify(bad), "{bad:?}");
            assert!(matches!(scheme.parse(bad), Err(Error::Format(_))), "{bad:?}");
        }
        assert!(scheme.identify(PASSWORD_HASH));
    }

    #[test]
    fn secret_is_read_up_to_nul() {
        let scheme = Bcrypt::new();
        let hash = scheme.encrypt(b"pass", &HashOptions::new().with_cost(4)).unwrap();
        assert!(scheme.verify(b"pass\0word", &hash).unwrap());
        assert!(!scheme.verify(b"password", &hash).unwrap());
        assert!(scheme.verify(b"\0ignored", EMPTY_HASH).unwrap());
    }

    #[test]
    fn cost_aliases() {
        let tiers = Bcrypt::new().cost_tiers().unwrap();
        assert_eq!(tiers.resolve(NAME, &"bogus".into()), tiers.medium());
        assert_eq!(tiers.resolve(NAME, &3.into()), tiers.medium());
        assert!(Bcrypt::new().with_tiers(CostTiers::fixed(4, 5, 6, 4, 32)).is_err());
        assert!(Bcrypt::new().with_tiers(CostTiers::fixed(4, 5, 6, 4, 31)).is_ok());
    }
}
