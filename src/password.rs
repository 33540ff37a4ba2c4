use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

/// One-way password digests. `work_factor` is the cost knob the
/// application configures; `verify` must compare in constant time.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str, work_factor: u32) -> anyhow::Result<String>;
    fn verify(&self, plain: &str, digest: &str) -> anyhow::Result<bool>;
}

/// Argon2id digests in PHC string format. The work factor is the
/// iteration count; memory cost is fixed per hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    memory_kib: u32,
}

impl Argon2Hasher {
    pub fn new(memory_kib: u32) -> Self {
        Self { memory_kib }
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(Params::DEFAULT_M_COST)
    }
}

/// Argon2id cost parameters for a memory cost and work factor.
pub fn argon2_params(memory_kib: u32, work_factor: u32) -> anyhow::Result<Params> {
    Params::new(memory_kib, work_factor, Params::DEFAULT_P_COST, None).map_err(|e| {
        error!(error = %e, work_factor, memory_kib, "argon2 params error");
        anyhow::anyhow!(e.to_string())
    })
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str, work_factor: u32) -> anyhow::Result<String> {
        let params = argon2_params(self.memory_kib, work_factor)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, plain: &str, digest: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(digest).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        // Cost parameters come from the digest itself.
        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(anyhow::anyhow!(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Hasher {
        Argon2Hasher::new(1024)
    }

    #[test]
    fn digest_verifies_only_its_own_password() {
        let digest = cheap().hash("secret1", 1).expect("hash secret1");
        assert_ne!(digest, "secret1");
        assert!(digest.starts_with("$argon2id$"));
        assert!(cheap().verify("secret1", &digest).expect("verify secret1"));
        assert!(!cheap().verify("wrong", &digest).expect("verify wrong"));
    }

    #[test]
    fn work_factor_lands_in_digest() {
        let hash = cheap().hash("pw", 3).expect("hashing should succeed");
        assert!(hash.contains("t=3"));
        // A hasher configured differently still verifies it.
        assert!(Argon2Hasher::default().verify("pw", &hash).unwrap());
    }

    #[test]
    fn unusable_params_are_rejected() {
        assert!(argon2_params(1024, 0).is_err());
        assert!(argon2_params(4, 1).is_err());
        assert!(argon2_params(1024, 1).is_ok());
        assert!(cheap().hash("pw", 0).is_err());
    }

    #[test]
    fn salts_differ() {
        let a = cheap().hash("same", 1).unwrap();
        let b = cheap().hash("same", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn phone_number_is_not_a_digest() {
        let err = cheap().verify("secret1", "+14155550100").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
