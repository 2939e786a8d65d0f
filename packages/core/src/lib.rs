// ABOUTME: Core constants and utilities for CTC projects
// ABOUTME: Foundational package shared by storage, security, and the HTTP layer

pub mod constants;
pub mod utils;

// Re-export constants
pub use constants::{
    ctc_dir, database_file, CSRF_SECRET_KEY_NAME, CSRF_TOKEN_HEADER, CSRF_TOKEN_PARAM,
    DEFAULT_CSRF_TOKEN_TTL_SECS,
};

// Re-export utilities
pub use utils::unix_timestamp;
