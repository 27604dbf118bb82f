use rand::RngCore;
use sha2::{Digest, Sha256};

/// A freshly issued password-reset credential. The plain value goes into the
/// emailed link; only the hash is persisted.
pub struct IssuedResetToken {
    pub plain: String,
    pub hashed: String,
}

pub fn issue() -> IssuedResetToken {
    let mut raw = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    let plain = hex::encode(raw);
    let hashed = hash_token(&plain);
    IssuedResetToken { plain, hashed }
}

/// One-way hash applied both when storing and when checking an incoming
/// plain token.
pub fn hash_token(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}
