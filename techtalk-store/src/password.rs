//! Password hashing behind a small trait so tests can use a cheap cost.

use crate::StoreError;

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, StoreError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, StoreError>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, StoreError> {
        bcrypt::hash(password, self.cost).map_err(|e| StoreError::Hash(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, StoreError> {
        bcrypt::verify(password, hash).map_err(|e| StoreError::Hash(e.to_string()))
    }
}
