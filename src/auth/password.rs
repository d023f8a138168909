use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("malformed password hash: {0}")]
    Malformed(String),
    #[error("password verification task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// Checks `plain` against a stored hash. bcrypt hashes (`$2?$`) and PHC
/// strings (argon2) are both accepted. Comparison is constant time in both
/// libraries.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    if is_bcrypt(hash) {
        return bcrypt::verify(plain, hash).map_err(|e| PasswordError::Malformed(e.to_string()));
    }
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Malformed(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs [`verify_password`] off the async workers; both hashes are CPU bound.
pub async fn verify_password_async(plain: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

#[cfg(test)]
pub fn hash_password(plain: &str) -> String {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use rand::rngs::OsRng;

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .expect("argon2 hash")
        .to_string()
}
