//! Password hashing and verification using bcrypt

use crate::core::error::{RegistryError, Result};

/// Salted bcrypt hashing at a fixed cost
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password; the digest embeds its own salt and cost
    pub fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| RegistryError::CredentialError(format!("Failed to hash password: {}", e)))
    }

    /// Verify a password against a digest
    ///
    /// A digest that cannot be parsed never matches.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        match bcrypt::verify(password, digest) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password digest is malformed");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_invalid_cost_is_credential_error() {
        let result = PasswordHasher::new(3).hash("secret123");
        assert!(matches!(result, Err(RegistryError::CredentialError(_))));
    }

    #[test]
    fn test_hash_is_salted() {
        let h = hasher();
        let a = h.hash("secret123").unwrap();
        let b = h.hash("secret123").unwrap();

        assert_ne!(a, b);
        assert!(h.verify("secret123", &a));
        assert!(h.verify("secret123", &b));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let h = hasher();
        let digest = h.hash("secret123").unwrap();

        assert!(!h.verify("secret124", &digest));
        assert!(!h.verify("", &digest));
    }

    #[test]
    fn test_malformed_digest_fails_closed() {
        assert!(!hasher().verify("secret123", "not-a-bcrypt-digest"));
        assert!(!hasher().verify("secret123", ""));
    }

    #[test]
    fn test_unicode_password() {
        let h = hasher();
        let digest = h.hash("pässwörd-日本語").unwrap();
        assert!(h.verify("pässwörd-日本語", &digest));
        assert!(!h.verify("passwoerd-日本語", &digest));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_hash_then_verify(password in "\\PC{0,16}", other in "\\PC{0,16}") {
            let h = hasher();
            let digest = h.hash(&password).unwrap();
            prop_assert!(h.verify(&password, &digest));
            if other != password {
                prop_assert!(!h.verify(&other, &digest));
            }
        }
    }
}
