//! Traditional crypt(3): 2 salt characters followed by 11 checksum
//! characters, 25 salted DES iterations over a zero block.

use crate::Result;
use crate::crypto::des::{encrypt_int_block, secret_to_key};
use crate::error::Error;
use crate::format::h64;
use crate::scheme::{HashOptions, HashRecord, PasswordHash, c_string, choose_salt};

pub const NAME: &str = "des-crypt";

const ROUNDS: u32 = 25;
const SALT_CHARS: usize = 2;
const CHECKSUM_CHARS: usize = 11;

#[derive(Debug, Default)]
pub struct DesCrypt;

impl PasswordHash for DesCrypt {
    fn name(&self) -> &'static str {
        NAME
    }

    fn parse(&self, hash: &str) -> Result<HashRecord> {
        if hash.len() != SALT_CHARS && hash.len() != SALT_CHARS + CHECKSUM_CHARS {
            return Err(Error::Format(format!("{NAME}: wrong length {}", hash.len())));
        }
        if !h64::is_h64(hash) {
            return Err(Error::Format(format!("{NAME}: invalid character")));
        }
        let (salt, checksum) = hash.split_at(SALT_CHARS);
        let salt = h64::decode_int_le(salt)? as u16;
        let checksum = match checksum {
            "" => None,
            text => Some(h64::decode_dc_int64(text)?.to_be_bytes().to_vec()),
        };
        Ok(HashRecord::new(
            NAME,
            "",
            Some(ROUNDS),
            salt.to_le_bytes().to_vec(),
            checksum,
            hash,
        ))
    }

    fn encrypt(&self, secret: &[u8], options: &HashOptions<'_>) -> Result<String> {
        let existing = options.existing.map(|h| self.parse(h)).transpose()?;
        let salt = match choose_salt(existing.as_ref(), options.keep_salt, 2)?.as_slice() {
            &[lo, hi] => u16::from_le_bytes([lo, hi]) & 0x0fff,
            _ => return Err(Error::Domain(format!("{NAME}: salt must be 12 bits"))),
        };

        let key = secret_to_key(c_string(secret));
        let result = encrypt_int_block(key, 0, u32::from(salt), ROUNDS)?;
        Ok(format!(
            "{}{}",
            h64::encode_int12(salt),
            h64::encode_dc_int64(result)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTORS: &[(&str, &str)] = &[
        ("test", "aZGJuE6EXrjEE"),
        ("password", "xOAFZqRz5RduI"),
        ("", "OgAwTx2l6NADI"),
        ("test", "N1tQbOFcM5fpg"),
    ];

    #[test]
    fn crypt3_vectors() {
        let scheme = DesCrypt;
        for (secret, hash) in VECTORS {
            assert!(scheme.verify(secret.as_bytes(), hash).unwrap(), "{hash}");
            let salt_only = &hash[..2];
            assert_eq!(
                scheme
                    .encrypt(secret.as_bytes(), &HashOptions::reuse(salt_only))
                    .unwrap(),
                *hash
            );
        }
        assert!(!scheme.verify(b"tesT", "aZGJuE6EXrjEE").unwrap());
    }

    #[test]
    fn only_eight_bytes_before_nul_count() {
        let scheme = DesCrypt;
        let hash = scheme.encrypt(b"password", &HashOptions::new()).unwrap();
        assert!(scheme.verify(b"password-and-more", &hash).unwrap());
        assert!(scheme.verify(b"password\0ignored", &hash).unwrap());

        let short = scheme.encrypt(b"pass", &HashOptions::new()).unwrap();
        assert!(scheme.verify(b"pass\0word", &short).unwrap());
        assert!(!scheme.verify(b"passw", &short).unwrap());
    }

    #[test]
    fn parse_and_identify() {
        let scheme = DesCrypt;
        let record = scheme.parse("aZGJuE6EXrjEE").unwrap();
        assert_eq!(record.salt(), &h64::decode_int_le("aZ").unwrap().to_le_bytes()[..2]);
        assert_eq!(record.checksum().map(<[u8]>::len), Some(8));
        assert!(scheme.parse("aZ").unwrap().is_template());

        for bad in ["", "a", "aZGJuE6EXrjE", "aZGJuE6EXrjEEx", "aZGJuE6EXrj$E"] {
            assert!(!scheme.identify(bad), "{bad:?}");
        }
    }
}
