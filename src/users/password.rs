use std::{fmt::Debug, ops::RangeInclusive};

use argon2::{
    password_hash::{PasswordHasher as _, Salt, SaltString},
    Argon2,
};
use md5::{Digest, Md5};
use tracing::error;

/// Accepted application salt length in bytes, before base64 encoding.
pub const SALT_LEN: RangeInclusive<usize> = 8..=48;

/// One-way transform applied to a plaintext password before it is stored or
/// compared. Equal inputs must give equal digests: login compares digests in
/// the store, never plaintext.
pub trait PasswordHasher: Send + Sync + Debug {
    fn hash(&self, plain: &str) -> anyhow::Result<String>;
}

/// Argon2id keyed with the application salt.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    salt: SaltString,
}

impl Argon2Hasher {
    pub fn new(salt: &str) -> anyhow::Result<Self> {
        if !SALT_LEN.contains(&salt.len()) {
            anyhow::bail!(
                "password salt must be {} to {} bytes, got {}",
                SALT_LEN.start(),
                SALT_LEN.end(),
                salt.len()
            );
        }
        let salt = SaltString::encode_b64(salt.as_bytes()).map_err(|e| {
            error!(error = %e, "argon2 salt rejected");
            anyhow::anyhow!("invalid password salt: {e}")
        })?;
        // encode_b64 does not check the bounds hash_password enforces later.
        Salt::from_b64(salt.as_str()).map_err(|e| anyhow::anyhow!("invalid password salt: {e}"))?;
        Ok(Self { salt })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &self.salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }
}

/// Unsalted MD5 as lowercase hex. Only for databases whose rows were written
/// by the legacy scheme; new deployments use [`Argon2Hasher`].
#[derive(Debug, Clone, Default)]
pub struct Md5Hasher;

impl PasswordHasher for Md5Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        Ok(hex::encode(Md5::digest(plain.as_bytes())))
    }
}
