pub mod backend;
pub mod crypto;
mod error;
pub mod format;
pub mod scheme;

pub use crate::error::Error;
pub use crate::scheme::bcrypt::Bcrypt;
pub use crate::scheme::bsdi_crypt::BsdiCrypt;
pub use crate::scheme::des_crypt::DesCrypt;
pub use crate::scheme::grub::GrubPbkdf2;
pub use crate::scheme::nthash::NtHash;
pub use crate::scheme::pbkdf2::Pbkdf2;
pub use crate::scheme::{Cost, CostTiers, HashOptions, HashRecord, PasswordHash};

pub type Result<T> = std::result::Result<T, Error>;

/// Every scheme with its default configuration, in identification order.
pub fn schemes() -> Vec<Box<dyn PasswordHash>> {
    vec![
        Box::new(Bcrypt::new()),
        Box::new(Pbkdf2::sha1()),
        Box::new(Pbkdf2::sha256()),
        Box::new(Pbkdf2::sha512()),
        Box::new(GrubPbkdf2::new()),
        Box::new(BsdiCrypt::new()),
        Box::new(DesCrypt),
        Box::new(NtHash),
    ]
}

/// Looks a scheme up by name.
pub fn scheme(name: &str) -> Option<Box<dyn PasswordHash>> {
    schemes().into_iter().find(|s| s.name() == name)
}

/// The first scheme that recognizes `hash`.
pub fn identify(hash: &str) -> Option<Box<dyn PasswordHash>> {
    schemes().into_iter().find(|s| s.identify(hash))
}
