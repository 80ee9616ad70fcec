//! `$3$$<hex>`: MD4 over the UTF-16LE secret.

use zeroize::Zeroizing;

use crate::Result;
use crate::crypto::md4::md4;
use crate::error::Error;
use crate::scheme::{HashOptions, HashRecord, PasswordHash};

pub const NAME: &str = "nthash";

const PREFIX: &str = "$3$$";

#[derive(Debug, Default)]
pub struct NtHash;

impl NtHash {
    /// Raw 16-byte digest of `secret`.
    pub fn raw(secret: &[u8]) -> Result<[u8; 16]> {
        let text = std::str::from_utf8(secret)
            .map_err(|_| Error::Domain(format!("{NAME}: secret is not valid UTF-8")))?;
        let wide: Zeroizing<Vec<u8>> =
            Zeroizing::new(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
        Ok(md4(&wide))
    }
}

impl PasswordHash for NtHash {
    fn name(&self) -> &'static str {
        NAME
    }

    fn parse(&self, hash: &str) -> Result<HashRecord> {
        let digest = hash
            .strip_prefix(PREFIX)
            .ok_or_else(|| Error::Format(format!("{NAME}: missing {PREFIX:?} prefix")))?;
        let lower_hex = digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if digest.len() != 32 || !lower_hex {
            return Err(Error::Format(format!("{NAME}: expected 32 lowercase hex digits")));
        }
        let checksum = hex::decode(digest).map_err(|e| Error::Format(format!("{NAME}: {e}")))?;
        Ok(HashRecord::new(NAME, "3", None, Vec::new(), Some(checksum), hash))
    }

    fn encrypt(&self, secret: &[u8], options: &HashOptions<'_>) -> Result<String> {
        if let Some(existing) = options.existing {
            self.parse(existing)?;
        }
        Ok(format!("{PREFIX}{}", hex::encode(Self::raw(secret)?)))
    }
}
