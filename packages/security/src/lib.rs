// ABOUTME: Security functionality for CTC projects
// ABOUTME: Provides the CSRF secret key store and the token engine built on it

pub mod csrf;

// Re-export main types for convenience
pub use csrf::{
    tokens_are_equal, CsrfError, CsrfKeyStore, CsrfTokenEngine, SecretKey, SecretKeyProvider,
    DEFAULT_TOKEN_VALIDITY, SECRET_KEY_LEN,
};
