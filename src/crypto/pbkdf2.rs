//! PBKDF2 key derivation (RFC 2898) with HMAC as the PRF.
//!
//! The builtin backend computes HMAC and the block chaining here, over any
//! RustCrypto [`Digest`]. With the `native-pbkdf2` feature, the RustCrypto
//! `pbkdf2` crate is probed at first use and takes over when it passes its
//! known-answer test. Both produce identical bytes for every input.

use std::fmt;
use std::str::FromStr;

use digest::Digest;
use digest::core_api::BlockSizeUser;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::Result;
use crate::backend::{Backend, BackendSlot};
use crate::error::Error;

/// Digest driving the HMAC pseudorandom function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrfDigest {
    Sha1,
    Sha256,
    Sha512,
}

impl PrfDigest {
    pub fn name(self) -> &'static str {
        match self {
            PrfDigest::Sha1 => "sha1",
            PrfDigest::Sha256 => "sha256",
            PrfDigest::Sha512 => "sha512",
        }
    }

    /// Digest output size in bytes, which is also the PBKDF2 block size.
    pub fn output_size(self) -> usize {
        match self {
            PrfDigest::Sha1 => 20,
            PrfDigest::Sha256 => 32,
            PrfDigest::Sha512 => 64,
        }
    }
}

impl fmt::Display for PrfDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrfDigest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(PrfDigest::Sha1),
            "sha256" | "sha-256" => Ok(PrfDigest::Sha256),
            "sha512" | "sha-512" => Ok(PrfDigest::Sha512),
            other => Err(Error::Domain(format!("unsupported pbkdf2 digest {other:?}"))),
        }
    }
}

/// Rejects parameters PBKDF2 cannot honor, before any HMAC work.
fn check_params(rounds: u32, key_len: usize, block_len: usize) -> Result<()> {
    if rounds < 1 {
        return Err(Error::Domain("pbkdf2 rounds must be >= 1".into()));
    }
    let max = u64::from(u32::MAX) * block_len as u64;
    if key_len as u64 > max {
        return Err(Error::Domain(format!(
            "pbkdf2 key length {key_len} exceeds {max} bytes"
        )));
    }
    Ok(())
}

/// HMAC with the padded key absorbed once, cloned per message.
struct Hmac<D> {
    inner: D,
    outer: D,
}

impl<D: Digest + BlockSizeUser + Clone> Hmac<D> {
    fn new(key: &[u8]) -> Self {
        let block_len = D::block_size();
        let mut padded = Zeroizing::new(vec![0u8; block_len]);
        if key.len() > block_len {
            let hashed = D::digest(key);
            padded[..hashed.len()].copy_from_slice(&hashed);
        } else {
            padded[..key.len()].copy_from_slice(key);
        }

        let ipad: Zeroizing<Vec<u8>> = Zeroizing::new(padded.iter().map(|b| b ^ 0x36).collect());
        let opad: Zeroizing<Vec<u8>> = Zeroizing::new(padded.iter().map(|b| b ^ 0x5c).collect());

        let mut inner = <D as Digest>::new();
        Digest::update(&mut inner, &ipad[..]);
        let mut outer = <D as Digest>::new();
        Digest::update(&mut outer, &opad[..]);
        Self { inner, outer }
    }

    fn mac(&self, parts: &[&[u8]]) -> digest::Output<D> {
        let mut inner = self.inner.clone();
        for part in parts {
            Digest::update(&mut inner, part);
        }
        let mut outer = self.outer.clone();
        Digest::update(&mut outer, inner.finalize());
        outer.finalize()
    }
}

fn derive_into<D: Digest + BlockSizeUser + Clone>(
    secret: &[u8],
    salt: &[u8],
    rounds: u32,
    out: &mut [u8],
) {
    let prf = Hmac::<D>::new(secret);
    for (index, block) in out.chunks_mut(<D as Digest>::output_size()).enumerate() {
        let counter = (index as u32 + 1).to_be_bytes();
        let mut u = prf.mac(&[salt, &counter]);
        let mut t = u.clone();
        for _ in 1..rounds {
            u = prf.mac(&[u.as_slice()]);
            t.iter_mut().zip(u.iter()).for_each(|(acc, b)| *acc ^= b);
        }
        block.copy_from_slice(&t[..block.len()]);
    }
}

/// A PBKDF2 implementation.
pub trait Pbkdf2Backend: Backend {
    /// Fills `out` with derived key bytes. Parameters are already validated.
    fn derive_into(
        &self,
        secret: &[u8],
        salt: &[u8],
        rounds: u32,
        digest: PrfDigest,
        out: &mut [u8],
    ) -> Result<()>;
}

/// The HMAC and block chaining computed in this module.
pub struct BuiltinPbkdf2;

impl Backend for BuiltinPbkdf2 {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn is_available(&self) -> bool {
        true
    }
}

impl Pbkdf2Backend for BuiltinPbkdf2 {
    fn derive_into(
        &self,
        secret: &[u8],
        salt: &[u8],
        rounds: u32,
        digest: PrfDigest,
        out: &mut [u8],
    ) -> Result<()> {
        match digest {
            PrfDigest::Sha1 => derive_into::<Sha1>(secret, salt, rounds, out),
            PrfDigest::Sha256 => derive_into::<Sha256>(secret, salt, rounds, out),
            PrfDigest::Sha512 => derive_into::<Sha512>(secret, salt, rounds, out),
        }
        Ok(())
    }
}

#[cfg(feature = "native-pbkdf2")]
mod native {
    use sha1::Sha1;
    use sha2::{Sha256, Sha512};
    use tracing::warn;

    use super::{Pbkdf2Backend, PrfDigest};
    use crate::Result;
    use crate::backend::Backend;

    // RFC 6070, test case 1.
    const PROBE_EXPECTED: &str = "0c60c80f961f0e71f3a9b524af6012062fe037a6";

    /// The RustCrypto `pbkdf2` crate.
    pub struct NativePbkdf2;

    impl Backend for NativePbkdf2 {
        fn name(&self) -> &'static str {
            "pbkdf2-crate"
        }

        fn is_available(&self) -> bool {
            let mut out = [0u8; 20];
            let probed = self
                .derive_into(b"password", b"salt", 1, PrfDigest::Sha1, &mut out)
                .is_ok();
            let ok = probed && hex::encode(out) == PROBE_EXPECTED;
            if !ok {
                warn!(backend = self.name(), "known-answer test failed, backend rejected");
            }
            ok
        }
    }

    impl Pbkdf2Backend for NativePbkdf2 {
        fn derive_into(
            &self,
            secret: &[u8],
            salt: &[u8],
            rounds: u32,
            digest: PrfDigest,
            out: &mut [u8],
        ) -> Result<()> {
            match digest {
                PrfDigest::Sha1 => ::pbkdf2::pbkdf2_hmac::<Sha1>(secret, salt, rounds, out),
                PrfDigest::Sha256 => ::pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, rounds, out),
                PrfDigest::Sha512 => ::pbkdf2::pbkdf2_hmac::<Sha512>(secret, salt, rounds, out),
            }
            Ok(())
        }
    }
}

pub(crate) static PBKDF2_BACKEND: BackendSlot<dyn Pbkdf2Backend> = BackendSlot::new("pbkdf2");

static BUILTIN: BuiltinPbkdf2 = BuiltinPbkdf2;

#[allow(unused_mut)]
fn candidates() -> Vec<&'static dyn Pbkdf2Backend> {
    let mut found: Vec<&'static dyn Pbkdf2Backend> = Vec::new();
    #[cfg(feature = "native-pbkdf2")]
    found.push(&native::NativePbkdf2);
    found
}

/// The backend bound for this process.
pub fn pbkdf2_backend() -> &'static dyn Pbkdf2Backend {
    PBKDF2_BACKEND.get_or_select(candidates, &BUILTIN)
}

/// The builtin backend, regardless of what was selected.
pub fn builtin_pbkdf2() -> &'static dyn Pbkdf2Backend {
    &BUILTIN
}

/// The `pbkdf2` crate backend, regardless of what was selected.
#[cfg(feature = "native-pbkdf2")]
pub fn native_pbkdf2() -> &'static dyn Pbkdf2Backend {
    &native::NativePbkdf2
}

/// Derives `key_len` bytes with the process-wide backend.
///
/// # Errors
///
/// Returns [`Error::Domain`] if `rounds` is zero or `key_len` exceeds
/// `(2^32 - 1) * digest.output_size()`.
pub fn derive(
    secret: &[u8],
    salt: &[u8],
    rounds: u32,
    key_len: usize,
    digest: PrfDigest,
) -> Result<Zeroizing<Vec<u8>>> {
    derive_using(pbkdf2_backend(), secret, salt, rounds, key_len, digest)
}

/// Derives `key_len` bytes with an explicit backend.
pub fn derive_using(
    backend: &dyn Pbkdf2Backend,
    secret: &[u8],
    salt: &[u8],
    rounds: u32,
    key_len: usize,
    digest: PrfDigest,
) -> Result<Zeroizing<Vec<u8>>> {
    check_params(rounds, key_len, digest.output_size())?;
    let mut out = Zeroizing::new(vec![0u8; key_len]);
    backend.derive_into(secret, salt, rounds, digest, &mut out)?;
    Ok(out)
}

/// Derives `key_len` bytes with the builtin computation over digest `D`.
pub fn derive_with<D: Digest + BlockSizeUser + Clone>(
    secret: &[u8],
    salt: &[u8],
    rounds: u32,
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    check_params(rounds, key_len, <D as Digest>::output_size())?;
    let mut out = Zeroizing::new(vec![0u8; key_len]);
    derive_into::<D>(secret, salt, rounds, &mut out);
    Ok(out)
}
