pub mod des;
pub mod eks;
pub mod md4;
pub mod pbkdf2;
pub mod random;
