use std::env;
use std::path::PathBuf;

/// Name of the singleton row holding the CSRF secret key
pub const CSRF_SECRET_KEY_NAME: &str = "csrf";

/// Form field / query parameter carrying a submitted CSRF token
pub const CSRF_TOKEN_PARAM: &str = "csrf_token";

/// Header carrying a submitted CSRF token (for script-initiated requests)
pub const CSRF_TOKEN_HEADER: &str = "X-CSRF-Token";

/// Default lifetime of a CSRF token in seconds (one week)
pub const DEFAULT_CSRF_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Get the path to the CTC data directory (~/.ctc)
pub fn ctc_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".ctc")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ctc")
    }
}

/// Get the path to the SQLite database (~/.ctc/ctc.db)
pub fn database_file() -> PathBuf {
    ctc_dir().join("ctc.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_database_file_lives_in_ctc_dir() {
        let db = database_file();
        assert_eq!(db.parent(), Some(ctc_dir().as_path()));
        assert_eq!(db.file_name().and_then(|n| n.to_str()), Some("ctc.db"));
    }
}
