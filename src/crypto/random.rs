use getrandom::fill;

use crate::Result;
use crate::error::Error;

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| Error::Random)
}

/// Generate `n` fresh salt bytes
pub fn random_bytes(n: usize) -> Result<Vec<u8>> {
    let mut salt = vec![0u8; n];
    secure_random(&mut salt)?;
    Ok(salt)
}
