//! bcrypt's expensive key schedule over Blowfish.
//!
//! [`bcrypt_raw`] is the builtin computation. With the `native-bcrypt`
//! feature, the `bcrypt` crate is offered as an accelerated backend and is
//! bound only if it reproduces a published `$2a$` hash.

use blowfish::Blowfish;
use zeroize::Zeroizing;

use crate::Result;
use crate::backend::{Backend, BackendSlot};
use crate::error::Error;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// Bytes of the final ciphertext kept in the hash.
pub const RAW_LEN: usize = 23;

/// Longest key bcrypt reads, terminating NUL included.
const MAX_KEY_LEN: usize = 72;

// "OrpheanBeholderScryDoubt"
const MAGIC: [u32; 6] = [
    0x4f72_7068, 0x6561_6e42, 0x6568_6f6c, 0x6465_7253, 0x6372_7944, 0x6f75_6274,
];

/// Runs EksBlowfish and returns the 23 checksum bytes.
///
/// With `nul_terminated` (`$2a$`) the key is the secret plus a trailing NUL;
/// without it (`$2$`) the key is the bare secret. Either way the key is cut
/// to 72 bytes, so secrets sharing their first 72 bytes hash identically.
pub fn bcrypt_raw(
    secret: &[u8],
    salt: &[u8; SALT_LEN],
    cost: u32,
    nul_terminated: bool,
) -> Result<[u8; RAW_LEN]> {
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(Error::Domain(format!(
            "bcrypt cost {cost} outside {MIN_COST}..={MAX_COST}"
        )));
    }

    let mut key = Zeroizing::new(Vec::with_capacity(secret.len() + 1));
    key.extend_from_slice(secret);
    // An empty `$2$` key still reads the C string's terminator.
    if nul_terminated || key.is_empty() {
        key.push(0);
    }
    key.truncate(MAX_KEY_LEN);

    let mut state: Blowfish = Blowfish::bc_init_state();
    state.salted_expand_key(salt, &key);
    for _ in 0..1u64 << cost {
        state.bc_expand_key(&key);
        state.bc_expand_key(salt);
    }

    let mut ctext = MAGIC;
    for pair in ctext.chunks_exact_mut(2) {
        for _ in 0..64 {
            let [l, r] = state.bc_encrypt([pair[0], pair[1]]);
            pair[0] = l;
            pair[1] = r;
        }
    }

    let mut full = Zeroizing::new([0u8; 24]);
    for (chunk, word) in full.chunks_exact_mut(4).zip(ctext.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    let mut raw = [0u8; RAW_LEN];
    raw.copy_from_slice(&full[..RAW_LEN]);
    Ok(raw)
}

/// A bcrypt implementation.
pub trait BcryptBackend: Backend {
    /// Checksum bytes for `secret`; see [`bcrypt_raw`] for `nul_terminated`.
    fn raw_hash(
        &self,
        secret: &[u8],
        salt: &[u8; SALT_LEN],
        cost: u32,
        nul_terminated: bool,
    ) -> Result<[u8; RAW_LEN]>;
}

pub struct BuiltinBcrypt;

impl Backend for BuiltinBcrypt {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn is_available(&self) -> bool {
        true
    }
}

impl BcryptBackend for BuiltinBcrypt {
    fn raw_hash(
        &self,
        secret: &[u8],
        salt: &[u8; SALT_LEN],
        cost: u32,
        nul_terminated: bool,
    ) -> Result<[u8; RAW_LEN]> {
        bcrypt_raw(secret, salt, cost, nul_terminated)
    }
}

#[cfg(feature = "native-bcrypt")]
mod native {
    use tracing::warn;

    use super::{BcryptBackend, RAW_LEN, SALT_LEN, bcrypt_raw};
    use crate::Result;
    use crate::backend::Backend;
    use crate::error::Error;
    use crate::format::bcrypt64;

    // "password" at cost 5
    const PROBE_SALT: &str = "bvIG6Nmid91Mu9RcmmWZfO";
    const PROBE_CHECKSUM: &str = "5HJIMCT8riNW0hEp8f6/FuA2/mHZFpe";

    /// The `bcrypt` crate.
    pub struct NativeBcrypt;

    impl NativeBcrypt {
        fn probe(&self) -> Result<bool> {
            let salt: [u8; SALT_LEN] = bcrypt64::decode(PROBE_SALT)?
                .try_into()
                .map_err(|_| Error::Format("probe salt length".into()))?;
            let raw = self.raw_hash(b"password", &salt, 5, true)?;
            Ok(bcrypt64::encode(&raw) == PROBE_CHECKSUM)
        }
    }

    impl Backend for NativeBcrypt {
        fn name(&self) -> &'static str {
            "bcrypt-crate"
        }

        fn is_available(&self) -> bool {
            let ok = matches!(self.probe(), Ok(true));
            if !ok {
                warn!(backend = self.name(), "known-answer test failed, backend rejected");
            }
            ok
        }
    }

    impl BcryptBackend for NativeBcrypt {
        fn raw_hash(
            &self,
            secret: &[u8],
            salt: &[u8; SALT_LEN],
            cost: u32,
            nul_terminated: bool,
        ) -> Result<[u8; RAW_LEN]> {
            // The crate always appends the NUL, so `$2$` keys stay builtin.
            if !nul_terminated {
                return bcrypt_raw(secret, salt, cost, false);
            }
            let parts = ::bcrypt::hash_with_salt(secret, cost, *salt)
                .map_err(|e| Error::Backend(e.to_string()))?;
            let formatted = parts.format_for_version(::bcrypt::Version::TwoA);
            let tail = formatted
                .len()
                .checked_sub(31)
                .and_then(|start| formatted.get(start..))
                .ok_or_else(|| Error::Backend("short hash from bcrypt crate".into()))?;
            bcrypt64::decode(tail)?
                .try_into()
                .map_err(|_| Error::Backend("bad checksum length from bcrypt crate".into()))
        }
    }
}

pub(crate) static BCRYPT_BACKEND: BackendSlot<dyn BcryptBackend> = BackendSlot::new("bcrypt");

static BUILTIN: BuiltinBcrypt = BuiltinBcrypt;

#[allow(unused_mut)]
fn candidates() -> Vec<&'static dyn BcryptBackend> {
    let mut found: Vec<&'static dyn BcryptBackend> = Vec::new();
    #[cfg(feature = "native-bcrypt")]
    found.push(&native::NativeBcrypt);
    found
}

/// The backend bound for this process.
pub fn bcrypt_backend() -> &'static dyn BcryptBackend {
    BCRYPT_BACKEND.get_or_select(candidates, &BUILTIN)
}

pub fn builtin_bcrypt() -> &'static dyn BcryptBackend {
    &BUILTIN
}

#[cfg(feature = "native-bcrypt")]
pub fn native_bcrypt() -> &'static dyn BcryptBackend {
    &native::NativeBcrypt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::bcrypt64;

    fn salt(text: &str) -> [u8; SALT_LEN] {
        bcrypt64::decode(text).unwrap().try_into().unwrap()
    }

    #[test]
    fn published_vectors() {
        let raw = bcrypt_raw(b"password", &salt("bvIG6Nmid91Mu9RcmmWZfO"), 5, true).unwrap();
        assert_eq!(bcrypt64::encode(&raw), "5HJIMCT8riNW0hEp8f6/FuA2/mHZFpe");

        let raw = bcrypt_raw(b"", &salt("DCq7YPn5Rq63x1Lad4cll."), 6, true).unwrap();
        assert_eq!(bcrypt64::encode(&raw), "TV4S6ytwfsfvkgY8jIucDrjc8deX1s.");
    }

    #[test]
    fn minor_zero_key_has_no_terminator() {
        let s = salt("bvIG6Nmid91Mu9RcmmWZfO");
        let raw = bcrypt_raw(b"password", &s, 5, false).unwrap();
        assert_eq!(bcrypt64::encode(&raw), "W01wFeT1RrsgrYBZQqoJxsvqi6NQiA6");

        // an empty key still reads the terminator
        assert_eq!(
            bcrypt_raw(b"", &s, 4, false).unwrap(),
            bcrypt_raw(b"", &s, 4, true).unwrap()
        );
        assert_eq!(
            bcrypt_raw(&[b'x'; 72], &s, 4, false).unwrap(),
            bcrypt_raw(&[b'x'; 72], &s, 4, true).unwrap()
        );
    }

    #[test]
    fn key_is_cut_at_72_bytes() {
        let s = salt("bvIG6Nmid91Mu9RcmmWZfO");
        let long = [b'x'; 72];
        let longer = [b'x'; 100];
        assert_eq!(
            bcrypt_raw(&long, &s, 4, true).unwrap(),
            bcrypt_raw(&longer, &s, 4, true).unwrap()
        );
        assert_ne!(
            bcrypt_raw(&long[..71], &s, 4, true).unwrap(),
            bcrypt_raw(&long, &s, 4, true).unwrap()
        );
    }

    #[test]
    fn cost_out_of_range_is_rejected() {
        let s = [0u8; SALT_LEN];
        assert!(matches!(bcrypt_raw(b"pw", &s, 3, true), Err(Error::Domain(_))));
        assert!(matches!(bcrypt_raw(b"pw", &s, 32, false), Err(Error::Domain(_))));
    }

    #[test]
    fn selected_backend_agrees_with_builtin() {
        let s = salt("DCq7YPn5Rq63x1Lad4cll.");
        assert_eq!(
            bcrypt_backend().raw_hash(b"hunter2", &s, 4, true).unwrap(),
            builtin_bcrypt().raw_hash(b"hunter2", &s, 4, true).unwrap()
        );
    }

    #[test]
    #[cfg(feature = "native-bcrypt")]
    fn native_matches_builtin() {
        assert!(native_bcrypt().is_available());
        let s = salt("bvIG6Nmid91Mu9RcmmWZfO");
        let secrets: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"a".to_vec(),
            b"correct horse battery staple".to_vec(),
            vec![b'y'; 90],
        ];
        for secret in &secrets {
            for nul_terminated in [true, false] {
                assert_eq!(
                    native_bcrypt().raw_hash(secret, &s, 4, nul_terminated).unwrap(),
                    builtin_bcrypt().raw_hash(secret, &s, 4, nul_terminated).unwrap()
                );
            }
        }
    }
}
