// ABOUTME: Persisted CSRF secret key, created lazily on first use
// ABOUTME: Races between processes resolve through the storage layer's create-if-absent insert

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ctc_core::CSRF_SECRET_KEY_NAME;
use ctc_storage::SecretKeyStorage;
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CsrfError;

/// Secret key size (256 bits)
pub const SECRET_KEY_LEN: usize = 32;

/// Symmetric key used to MAC CSRF tokens
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; SECRET_KEY_LEN]);

impl SecretKey {
    pub fn from_array(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CsrfError> {
        let array: [u8; SECRET_KEY_LEN] =
            bytes.try_into().map_err(|_| CsrfError::InvalidKeyLength {
                expected: SECRET_KEY_LEN,
                found: bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.0
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Anything that can hand out the CSRF secret key
#[async_trait]
pub trait SecretKeyProvider: Send + Sync {
    async fn secret_key(&self) -> Result<SecretKey, CsrfError>;
}

/// A fixed key, for tests and for deployments that inject their own
#[async_trait]
impl SecretKeyProvider for SecretKey {
    async fn secret_key(&self) -> Result<SecretKey, CsrfError> {
        Ok(self.clone())
    }
}

/// Source of the single per-deployment CSRF key
#[derive(Clone)]
pub struct CsrfKeyStore {
    storage: SecretKeyStorage,
    name: String,
    rng: Arc<SystemRandom>,
}

impl CsrfKeyStore {
    pub fn new(storage: SecretKeyStorage) -> Self {
        Self {
            storage,
            name: CSRF_SECRET_KEY_NAME.to_string(),
            rng: Arc::new(SystemRandom::new()),
        }
    }

    /// Use a different row name than the default `"csrf"`
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the persisted key, generating and storing one if none exists yet.
    ///
    /// A caller that loses the insert race re-reads and adopts the stored key,
    /// so every process ends up with the same bytes.
    pub async fn get_or_create_secret_key(&self) -> Result<SecretKey, CsrfError> {
        if let Some(bytes) = self.storage.get(&self.name).await? {
            debug!(name = %self.name, "Loaded existing CSRF secret key");
            return SecretKey::from_slice(&bytes);
        }

        let mut candidate = [0u8; SECRET_KEY_LEN];
        self.rng.fill(&mut candidate)?;
        let key = SecretKey::from_array(candidate);
        candidate.zeroize();

        if self
            .storage
            .insert_if_absent(&self.name, key.as_bytes())
            .await?
        {
            info!(name = %self.name, "Created CSRF secret key");
            return Ok(key);
        }

        debug!(name = %self.name, "Another writer created the CSRF secret key first");
        match self.storage.get(&self.name).await? {
            Some(bytes) => SecretKey::from_slice(&bytes),
            None => Err(CsrfError::KeyNotPersisted(self.name.clone())),
        }
    }
}

#[async_trait]
impl SecretKeyProvider for CsrfKeyStore {
    async fn secret_key(&self) -> Result<SecretKey, CsrfError> {
        self.get_or_create_secret_key().await
    }
}
