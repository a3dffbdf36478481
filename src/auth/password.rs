use std::sync::OnceLock;

/// Hash a password for storage.
pub fn hash(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Verify a plaintext password against a stored bcrypt hash.
/// Malformed hashes verify as false.
pub fn verify(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Hash checked when the username is unknown, so a miss costs the same
/// bcrypt work as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash("forum-dummy-password").unwrap_or_else(|e| {
            tracing::error!("Failed to hash dummy password: {}", e);
            String::new()
        })
    })
}

/// Spend one bcrypt verification on a login whose user does not exist.
pub fn verify_missing_user(password: &str) {
    let matched = verify(password, dummy_hash());
    tracing::debug!("Dummy password check for unknown user (matched: {})", matched);
}
