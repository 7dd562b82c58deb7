//! Password hashing.

use std::sync::OnceLock;

/// Lowest bcrypt cost accepted anywhere in the portal.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Hash a password with a fresh salt. Costs below [`MIN_BCRYPT_COST`] are raised to it.
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost.max(MIN_BCRYPT_COST))
}

/// Check a password against a stored hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Run one verification against a throwaway hash so that logins for unknown
/// usernames take as long as logins with a wrong password.
pub(crate) fn burn_verification(password: &str) {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| {
        bcrypt::hash("curanet-timing-equalizer", MIN_BCRYPT_COST).unwrap_or_default()
    });
    let _ = verify_password(password, hash);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret", MIN_BCRYPT_COST).unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
    }

    #[test]
    fn test_cost_floor() {
        let hash = hash_password("s3cret", 4).unwrap();
        // $2b$10$...
        assert_eq!(&hash[4..6], "10");
    }

    #[test]
    fn test_salted() {
        let a = hash_password("same", MIN_BCRYPT_COST).unwrap();
        let b = hash_password("same", MIN_BCRYPT_COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_mismatch() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
