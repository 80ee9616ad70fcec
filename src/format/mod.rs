//! Text codecs for hash strings.

pub mod bcrypt64;
pub mod h64;
