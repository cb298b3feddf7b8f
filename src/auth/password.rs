/// Hash a password with bcrypt at the given cost.
pub fn hash(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Check a password against a stored hash. A missing or malformed hash never
/// verifies.
pub fn verify(password: &str, hash: Option<&str>) -> bool {
    match hash {
        Some(hash) => bcrypt::verify(password, hash).unwrap_or_else(|e| {
            tracing::warn!("Stored password hash could not be checked: {}", e);
            false
        }),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let h = hash("cat", 4).unwrap();
        assert!(verify("cat", Some(&h)));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let h = hash("cat", 4).unwrap();
        assert!(!verify("dog", Some(&h)));
        assert!(!verify("", Some(&h)));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash("cat", 4).unwrap(), hash("cat", 4).unwrap());
    }

    #[test]
    fn missing_or_garbage_hash_never_verifies() {
        assert!(!verify("cat", None));
        assert!(!verify("cat", Some("not-a-bcrypt-hash")));
    }
}
