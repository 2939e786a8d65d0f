// ABOUTME: Shared utility functions for CTC projects
// ABOUTME: Wall-clock helpers used when minting and checking CSRF tokens

use chrono::Utc;

/// Current time as whole seconds since the Unix epoch
pub fn unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_timestamp_is_monotonic_enough() {
        let first = unix_timestamp();
        let second = unix_timestamp();
        assert!(first > 1_600_000_000);
        assert!(second >= first);
    }
}
