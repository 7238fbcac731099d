//! Password hashing with Argon2id.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};

use super::error::HashError;

/// Argon2 work factor.
///
/// Defaults follow the argon2 crate's recommended parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashParams {
    /// The cheapest parameters Argon2 accepts.
    ///
    /// Offers no brute-force resistance; only for tests and local tooling.
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }

    /// Check the parameters against Argon2's limits.
    ///
    /// # Errors
    ///
    /// Returns `HashError::InvalidParams` if Argon2 rejects the combination.
    pub fn validate(&self) -> Result<Params, HashError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| HashError::InvalidParams(e.to_string()))
    }
}

/// One-way password hasher and verifier.
///
/// Produces PHC strings (`$argon2id$v=19$m=...`) with a fresh random salt per
/// call. Verification reads the parameters embedded in the digest, so raising
/// the work factor does not invalidate existing hashes.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl CredentialHasher {
    /// Create a hasher with the given work factor.
    ///
    /// # Errors
    ///
    /// Returns `HashError::InvalidParams` if the parameters are out of range.
    pub fn new(params: HashParams) -> Result<Self, HashError> {
        Ok(Self {
            params: params.validate()?,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password.
    ///
    /// # Errors
    ///
    /// Returns `HashError::Hash` if Argon2 fails (e.g. allocation failure).
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    /// Verify a password against a stored digest.
    ///
    /// Returns `false` for a wrong password and for a digest that is not a
    /// valid PHC string. The digest comparison is constant-time.
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hash on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `HashError::Hash` if hashing fails or the worker task dies.
    pub async fn hash_blocking(&self, password: SecretString) -> Result<String, HashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(password.expose_secret()))
            .await
            .map_err(|e| HashError::Hash(format!("hashing task failed: {e}")))?
    }

    /// Verify on the blocking thread pool.
    ///
    /// A worker task that dies counts as a failed verification.
    pub async fn verify_blocking(&self, password: SecretString, digest: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(password.expose_secret(), &digest))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "password verification task failed");
                false
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(HashParams::minimal()).unwrap()
    }

    #[test]
    fn test_verify_accepts_own_hash() {
        let hasher = fast_hasher();
        for password in ["secret1", "", "correct horse battery staple", "pässwörd"] {
            let digest = hasher.hash(password).unwrap();
            assert!(hasher.verify(password, &digest), "{password:?}");
        }
    }

    #[test]
    fn test_verify_rejects_other_password() {
        let hasher = fast_hasher();
        let digest = hasher.hash("secret1").unwrap();
        assert!(!hasher.verify("secret2", &digest));
        assert!(!hasher.verify("Secret1", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = fast_hasher();
        let a = hasher.hash("secret1").unwrap();
        let b = hasher.hash("secret1").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("secret1", &a));
        assert!(hasher.verify("secret1", &b));
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hasher = fast_hasher();
        let digest = hasher.hash("plaintext-marker").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("plaintext-marker"));
    }

    #[test]
    fn test_malformed_digest_is_false() {
        let hasher = fast_hasher();
        for digest in ["", "not-a-hash", "$argon2id$", "$2b$10$abcdefghijklmnopqrstuv"] {
            assert!(!hasher.verify("secret1", digest), "{digest:?}");
        }
    }

    #[test]
    fn test_verify_uses_digest_params() {
        let strong = CredentialHasher::new(HashParams {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let digest = strong.hash("secret1").unwrap();

        assert!(fast_hasher().verify("secret1", &digest));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = CredentialHasher::new(HashParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(HashError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let hasher = fast_hasher();
        let digest = hasher
            .hash_blocking(SecretString::from("secret1"))
            .await
            .unwrap();

        assert!(
            hasher
                .verify_blocking(SecretString::from("secret1"), digest.clone())
                .await
        );
        assert!(
            !hasher
                .verify_blocking(SecretString::from("wrong"), digest)
                .await
        );
    }
}
