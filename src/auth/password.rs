use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// bcrypt is CPU bound; run it off the async workers.
pub async fn hash_password(plain: &str, cost: u32) -> Result<String, PasswordError> {
    let plain = plain.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??)
}

pub async fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let (plain, hash) = (plain.to_string(), hash.to_string());
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash)).await??)
}

/// New reset token: 20 random bytes as hex for the user, and the sha256 hex
/// of that string for storage.
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let hashed = hash_reset_token(&token);
    (token, hashed)
}

pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
