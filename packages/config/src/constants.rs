// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across CTC projects

// Server Configuration
pub const CTC_API_HOST: &str = "CTC_API_HOST";
pub const CTC_API_PORT: &str = "CTC_API_PORT";
pub const PORT: &str = "PORT"; // Legacy

// Storage Configuration
pub const CTC_DATABASE_PATH: &str = "CTC_DATABASE_PATH";
pub const CTC_DB_MAX_CONNECTIONS: &str = "CTC_DB_MAX_CONNECTIONS";

// CSRF Configuration
pub const CTC_CSRF_TOKEN_TTL_SECS: &str = "CTC_CSRF_TOKEN_TTL_SECS";
pub const CTC_CSRF_PRINCIPAL_HEADER: &str = "CTC_CSRF_PRINCIPAL_HEADER";
pub const CTC_CSRF_MAX_FORM_BYTES: &str = "CTC_CSRF_MAX_FORM_BYTES";
