//! CSRF tokens bound to a principal, a request path, and an issue time.
//!
//! A token has the wire form `"<hex HMAC-SHA256 digest> <unix seconds>"`. The
//! digest covers `"{principal} {path} {issued_at}"` under a single persisted
//! secret key, so validation needs no server-side session state: the server
//! recomputes the token for the current principal and path and compares.
//!
//! Validation never fails with an error. Malformed, expired, anonymous, and
//! forged tokens all come back as `false` so callers cannot leak which check
//! rejected a request.

mod key_store;
mod token;

pub use key_store::{CsrfKeyStore, SecretKey, SecretKeyProvider, SECRET_KEY_LEN};
pub use token::{tokens_are_equal, CsrfTokenEngine, DEFAULT_TOKEN_VALIDITY};

use ctc_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("Secret key storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("Secret key has invalid length: expected {expected} bytes, found {found}")]
    InvalidKeyLength { expected: usize, found: usize },

    #[error("Failed to generate random data for the secret key")]
    RandomGeneration,

    #[error("Secret key '{0}' was not persisted")]
    KeyNotPersisted(String),
}

impl From<ring::error::Unspecified> for CsrfError {
    fn from(_: ring::error::Unspecified) -> Self {
        CsrfError::RandomGeneration
    }
}
