//! The contract shared by every password hash scheme.
//!
//! A scheme parses its own textual grammar into a [`HashRecord`], builds new
//! hash strings with [`PasswordHash::encrypt`], and checks candidates with
//! [`PasswordHash::verify`], which re-runs `encrypt` with the stored salt and
//! cost and compares the two strings in constant time.

pub mod bcrypt;
pub mod bsdi_crypt;
pub mod des_crypt;
pub mod grub;
pub mod nthash;
pub mod pbkdf2;

use subtle::ConstantTimeEq;
use tracing::warn;

use crate::Result;
use crate::crypto::random::random_bytes;
use crate::error::Error;

/// A hash string split into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    scheme: &'static str,
    ident: String,
    rounds: Option<u32>,
    salt: Vec<u8>,
    checksum: Option<Vec<u8>>,
    source: String,
}

impl HashRecord {
    pub(crate) fn new(
        scheme: &'static str,
        ident: impl Into<String>,
        rounds: Option<u32>,
        salt: Vec<u8>,
        checksum: Option<Vec<u8>>,
        source: &str,
    ) -> Self {
        Self {
            scheme,
            ident: ident.into(),
            rounds,
            salt,
            checksum,
            source: source.to_string(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    /// Variant tag inside the scheme's family, e.g. `2a` for bcrypt.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn rounds(&self) -> Option<u32> {
        self.rounds
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn checksum(&self) -> Option<&[u8]> {
        self.checksum.as_deref()
    }

    /// The text this record was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True for salt-only configuration strings.
    pub fn is_template(&self) -> bool {
        self.checksum.is_none()
    }
}

/// Requested work factor: a raw count or a named tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cost {
    Rounds(u32),
    Named(String),
}

impl From<u32> for Cost {
    fn from(rounds: u32) -> Self {
        Cost::Rounds(rounds)
    }
}

impl From<&str> for Cost {
    /// All-digit text is a round count; anything else is a tier name.
    fn from(text: &str) -> Self {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(rounds) = text.parse() {
                return Cost::Rounds(rounds);
            }
        }
        Cost::Named(text.to_string())
    }
}

/// Named cost tiers and the valid round range of a scheme.
///
/// The tier values are tunable defaults rather than timing targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostTiers {
    fast: u32,
    medium: u32,
    slow: u32,
    min: u32,
    max: u32,
}

impl CostTiers {
    pub fn new(fast: u32, medium: u32, slow: u32, min: u32, max: u32) -> Result<Self> {
        let tiers = Self {
            fast,
            medium,
            slow,
            min,
            max,
        };
        tiers.validate()?;
        Ok(tiers)
    }

    pub(crate) const fn fixed(fast: u32, medium: u32, slow: u32, min: u32, max: u32) -> Self {
        Self {
            fast,
            medium,
            slow,
            min,
            max,
        }
    }

    pub fn fast(&self) -> u32 {
        self.fast
    }

    pub fn medium(&self) -> u32 {
        self.medium
    }

    pub fn slow(&self) -> u32 {
        self.slow
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn validate(&self) -> Result<()> {
        if self.min < 1 {
            return Err(Error::Domain("minimum cost must be >= 1".into()));
        }
        if self.min > self.fast || self.fast > self.medium {
            return Err(Error::Domain("cost tiers must satisfy min <= fast <= medium".into()));
        }
        if self.medium > self.slow || self.slow > self.max {
            return Err(Error::Domain("cost tiers must satisfy medium <= slow <= max".into()));
        }
        Ok(())
    }

    /// Checks that these tiers fit inside a scheme's hard limits.
    pub(crate) fn within(self, scheme: &str, min: u32, max: u32) -> Result<Self> {
        if self.min < min || self.max > max {
            return Err(Error::Domain(format!(
                "{scheme} cost range must lie within {min}..={max}"
            )));
        }
        Ok(self)
    }

    /// Maps a requested cost to a round count inside `[min, max]`.
    ///
    /// Unknown tier names and out-of-range counts fall back to `medium`.
    pub fn resolve(&self, scheme: &str, cost: &Cost) -> u32 {
        match cost {
            Cost::Rounds(rounds) if (self.min..=self.max).contains(rounds) => *rounds,
            Cost::Rounds(rounds) => {
                warn!(
                    scheme,
                    cost = rounds,
                    using = self.medium,
                    "cost out of range, using medium tier"
                );
                self.medium
            }
            Cost::Named(name) => match name.to_ascii_lowercase().as_str() {
                "fast" => self.fast,
                "medium" => self.medium,
                "slow" => self.slow,
                _ => {
                    warn!(
                        scheme,
                        cost = name.as_str(),
                        using = self.medium,
                        "unknown cost alias, using medium tier"
                    );
                    self.medium
                }
            },
        }
    }
}

/// Inputs to [`PasswordHash::encrypt`] beyond the secret.
#[derive(Debug, Clone, Default)]
pub struct HashOptions<'a> {
    /// Hash (or salt-only template) to take cost and, optionally, salt from.
    pub existing: Option<&'a str>,
    /// Reuse the salt of `existing` instead of drawing a fresh one.
    pub keep_salt: bool,
    pub cost: Option<Cost>,
}

impl<'a> HashOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that reproduce `hash` exactly for the right secret.
    pub fn reuse(hash: &'a str) -> Self {
        Self {
            existing: Some(hash),
            keep_salt: true,
            cost: None,
        }
    }

    pub fn with_existing(mut self, hash: &'a str) -> Self {
        self.existing = Some(hash);
        self
    }

    pub fn with_keep_salt(mut self, keep_salt: bool) -> Self {
        self.keep_salt = keep_salt;
        self
    }

    pub fn with_cost(mut self, cost: impl Into<Cost>) -> Self {
        self.cost = Some(cost.into());
        self
    }
}

/// A password hash scheme.
pub trait PasswordHash: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `hash` belongs to this scheme. Does no cryptographic work.
    fn identify(&self, hash: &str) -> bool {
        self.parse(hash).is_ok()
    }

    /// Splits `hash` into its fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] when `hash` does not follow the scheme's
    /// grammar or carries an out-of-range cost.
    fn parse(&self, hash: &str) -> Result<HashRecord>;

    /// Hashes `secret` into a new hash string.
    fn encrypt(&self, secret: &[u8], options: &HashOptions<'_>) -> Result<String>;

    /// Cost tiers, for schemes with a variable cost.
    fn cost_tiers(&self) -> Option<CostTiers> {
        None
    }

    /// Hashes `secret` with a fresh salt and the default cost.
    fn hash(&self, secret: &[u8]) -> Result<String> {
        self.encrypt(secret, &HashOptions::default())
    }

    /// Checks `secret` against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] when `hash` does not parse or holds no
    /// checksum.
    fn verify(&self, secret: &[u8], hash: &str) -> Result<bool> {
        if self.parse(hash)?.is_template() {
            return Err(Error::Format(format!("{} hash has no checksum", self.name())));
        }
        let computed = self.encrypt(secret, &HashOptions::reuse(hash))?;
        Ok(consteq(computed.as_bytes(), hash.as_bytes()))
    }
}

/// Constant-time equality; only the lengths leak.
pub fn consteq(left: &[u8], right: &[u8]) -> bool {
    left.ct_eq(right).into()
}

/// Secret bytes up to the first NUL, the way C crypt routines receive them.
pub(crate) fn c_string(secret: &[u8]) -> &[u8] {
    secret
        .iter()
        .position(|&b| b == 0)
        .map_or(secret, |end| &secret[..end])
}

/// Salt for a new hash: the existing one when asked to keep it, else fresh.
pub(crate) fn choose_salt(
    existing: Option<&HashRecord>,
    keep_salt: bool,
    len: usize,
) -> Result<Vec<u8>> {
    match existing {
        Some(record) if keep_salt => Ok(record.salt().to_vec()),
        _ => random_bytes(len),
    }
}

/// Rounds for a new hash: an explicit cost wins, then the existing hash's,
/// then the fast tier.
pub(crate) fn choose_rounds(
    scheme: &str,
    tiers: &CostTiers,
    existing: Option<&HashRecord>,
    cost: Option<&Cost>,
) -> u32 {
    match (cost, existing.and_then(HashRecord::rounds)) {
        (Some(cost), _) => tiers.resolve(scheme, cost),
        (None, Some(rounds)) => rounds,
        (None, None) => tiers.fast,
    }
}

/// Parses a decimal round count without sign or leading zeros.
pub(crate) fn parse_decimal(scheme: &str, text: &str) -> Result<u32> {
    let canonical = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'));
    if !canonical {
        return Err(Error::Format(format!("{scheme}: malformed rounds {text:?}")));
    }
    text.parse()
        .map_err(|_| Error::Format(format!("{scheme}: rounds {text:?} out of range")))
}
