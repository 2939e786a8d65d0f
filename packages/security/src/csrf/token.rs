// ABOUTME: Stateless CSRF token minting and validation
// ABOUTME: HMAC-SHA256 over principal, path, and issue time with a constant-time comparison

use std::time::Duration;

use ring::hmac;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::SecretKey;

/// How long a token stays valid after it was minted
pub const DEFAULT_TOKEN_VALIDITY: Duration =
    Duration::from_secs(ctc_core::DEFAULT_CSRF_TOKEN_TTL_SECS);

/// Mints and checks tokens under one secret key
#[derive(Clone)]
pub struct CsrfTokenEngine {
    key: hmac::Key,
    validity: Duration,
}

impl std::fmt::Debug for CsrfTokenEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenEngine")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

/// Issue time of a well-formed token.
///
/// Well-formed means exactly one space, a non-empty digest, and a decimal
/// issue time.
fn parse_issued_at(token: &str) -> Option<i64> {
    if token.bytes().filter(|b| *b == b' ').count() != 1 {
        return None;
    }

    let (digest, issued_at) = token.split_once(' ')?;
    if digest.is_empty() || issued_at.is_empty() || !issued_at.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    issued_at.parse::<i64>().ok()
}

impl CsrfTokenEngine {
    pub fn new(secret: &SecretKey) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            validity: DEFAULT_TOKEN_VALIDITY,
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Mint a token for `principal` posting back to `path`.
    ///
    /// Anonymous callers (no principal, or an empty id) never get a token.
    pub fn mint(&self, principal: Option<&str>, path: &str, issued_at: i64) -> Option<String> {
        let principal = principal.filter(|p| !p.is_empty())?;

        let message = format!("{} {} {}", principal, path, issued_at);
        let tag = hmac::sign(&self.key, message.as_bytes());

        Some(format!("{} {}", hex::encode(tag.as_ref()), issued_at))
    }

    /// [`CsrfTokenEngine::mint`] stamped with the current time
    pub fn mint_now(&self, principal: Option<&str>, path: &str) -> Option<String> {
        self.mint(principal, path, ctc_core::unix_timestamp())
    }

    /// Check a submitted token against whoever is authenticated now.
    ///
    /// Every rejection reason collapses to `false`.
    pub fn is_valid(
        &self,
        token: Option<&str>,
        principal: Option<&str>,
        path: &str,
        now: i64,
    ) -> bool {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            debug!(path = %path, "CSRF token rejected: missing");
            return false;
        };

        let Some(issued_at) = parse_issued_at(token) else {
            debug!(path = %path, "CSRF token rejected: malformed");
            return false;
        };

        if self.is_expired(issued_at, now) {
            debug!(path = %path, issued_at, now, "CSRF token rejected: expired");
            return false;
        }

        let Some(expected) = self.mint(principal, path, issued_at) else {
            debug!(path = %path, "CSRF token rejected: no authenticated principal");
            return false;
        };

        let matches = tokens_are_equal(&expected, token);
        if !matches {
            debug!(path = %path, "CSRF token rejected: digest mismatch");
        }
        matches
    }

    /// [`CsrfTokenEngine::is_valid`] checked against the current time
    pub fn is_valid_now(&self, token: Option<&str>, principal: Option<&str>, path: &str) -> bool {
        self.is_valid(token, principal, path, ctc_core::unix_timestamp())
    }

    fn is_expired(&self, issued_at: i64, now: i64) -> bool {
        let validity = i64::try_from(self.validity.as_secs()).unwrap_or(i64::MAX);
        now.saturating_sub(issued_at) > validity
    }
}

/// Compare two tokens in time independent of where they first differ.
///
/// Differing lengths return `false` straight away; equal lengths inspect
/// every byte.
pub fn tokens_are_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use rstest::rstest;

    const MOCKED_TIME: i64 = 123;
    const WEEK: i64 = 604_800;

    fn engine() -> CsrfTokenEngine {
        CsrfTokenEngine::new(&SecretKey::from_array([42u8; 32]))
    }

    // Make Token

    #[test]
    fn test_make_token_wire_format() {
        let token = engine().mint(Some("u1"), "/", MOCKED_TIME).unwrap();
        let (digest, time) = token.split_once(' ').unwrap();

        assert_eq!(digest.len(), 64);
        assert!(digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_eq!(time, "123");
    }

    #[test]
    fn test_make_token_includes_time() {
        let engine = engine();

        let token1 = engine.mint(Some("u1"), "/", MOCKED_TIME).unwrap();
        let token2 = engine.mint(Some("u1"), "/", 456).unwrap();
        let token3 = engine.mint(Some("u1"), "/", 456).unwrap();

        assert_eq!(token2.split(' ').last(), Some("456"));
        assert_ne!(token1.split(' ').next(), token2.split(' ').next());
        assert_eq!(token2, token3);
    }

    #[test]
    fn test_make_token_requires_login() {
        let engine = engine();

        assert_eq!(engine.mint(None, "/", MOCKED_TIME), None);
        assert_eq!(engine.mint(Some(""), "/", MOCKED_TIME), None);
        assert!(engine.mint(Some("u1"), "/", MOCKED_TIME).is_some());
    }

    #[test]
    fn test_make_token_includes_path() {
        let engine = engine();

        let token1 = engine.mint(Some("u1"), "/action/1", MOCKED_TIME);
        let token2 = engine.mint(Some("u1"), "/action/23", MOCKED_TIME);
        let token3 = engine.mint(Some("u1"), "/action/23", MOCKED_TIME);

        assert_ne!(token1, token2);
        assert_eq!(token2, token3);
    }

    #[test]
    fn test_make_token_includes_principal() {
        let engine = engine();

        let token1 = engine.mint(Some("u1"), "/widgets/5", MOCKED_TIME);
        let token2 = engine.mint(Some("u2"), "/widgets/5", MOCKED_TIME);

        assert_ne!(token1, token2);
    }

    #[test]
    fn test_make_token_depends_on_key() {
        let other = CsrfTokenEngine::new(&SecretKey::from_array([7u8; 32]));

        assert_ne!(
            engine().mint(Some("u1"), "/", MOCKED_TIME),
            other.mint(Some("u1"), "/", MOCKED_TIME)
        );
    }

    #[test]
    fn test_mint_now_uses_current_time() {
        let before = ctc_core::unix_timestamp();
        let token = engine().mint_now(Some("u1"), "/").unwrap();
        let issued: i64 = token.split(' ').last().unwrap().parse().unwrap();

        assert!(issued >= before);
        assert!(engine().is_valid_now(Some(&token), Some("u1"), "/"));
    }

    // Token Is Valid

    #[test]
    fn test_token_is_valid() {
        let engine = engine();
        let token = engine.mint(Some("u1"), "/", MOCKED_TIME).unwrap();

        assert!(engine.is_valid(Some(&token), Some("u1"), "/", MOCKED_TIME));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(""))]
    #[case::no_timestamp(Some("hello"))]
    #[case::bare_timestamp(Some(" 123"))]
    #[case::empty_timestamp(Some("abcdef "))]
    #[case::two_spaces(Some("abc 123 456"))]
    #[case::double_space(Some("abc  123"))]
    #[case::signed_timestamp(Some("abc -123"))]
    #[case::non_numeric_timestamp(Some("abc 12x"))]
    #[case::overflowing_timestamp(Some("abc 99999999999999999999999"))]
    fn test_malformed_tokens_are_invalid(#[case] token: Option<&str>) {
        assert!(!engine().is_valid(token, Some("u1"), "/", MOCKED_TIME));
    }

    #[test]
    fn test_expired_placeholder_token_is_invalid() {
        assert!(!engine().is_valid(Some("hello 123"), Some("u1"), "/", 9_999_999_999_999));
    }

    #[rstest]
    #[case::just_minted(0, true)]
    #[case::one_second_before_expiry(WEEK - 1, true)]
    #[case::at_expiry(WEEK, true)]
    #[case::one_second_after_expiry(WEEK + 1, false)]
    #[case::far_future(WEEK * 52, false)]
    fn test_expiry_boundary(#[case] elapsed: i64, #[case] expected: bool) {
        let engine = engine();
        let issued_at = 1_700_000_000;
        let token = engine.mint(Some("u1"), "/", issued_at).unwrap();

        assert_eq!(
            engine.is_valid(Some(&token), Some("u1"), "/", issued_at + elapsed),
            expected
        );
    }

    #[test]
    fn test_custom_validity_window() {
        let engine = engine().with_validity(Duration::from_secs(60));
        let token = engine.mint(Some("u1"), "/", MOCKED_TIME).unwrap();

        assert_eq!(engine.validity(), Duration::from_secs(60));
        assert!(engine.is_valid(Some(&token), Some("u1"), "/", MOCKED_TIME + 60));
        assert!(!engine.is_valid(Some(&token), Some("u1"), "/", MOCKED_TIME + 61));
    }

    #[test]
    fn test_logout_invalidates_token() {
        let engine = engine();
        let token = engine.mint(Some("u1"), "/", MOCKED_TIME).unwrap();

        assert!(!engine.is_valid(Some(&token), None, "/", MOCKED_TIME));
        assert!(!engine.is_valid(Some(&token), Some(""), "/", MOCKED_TIME));
        assert!(engine.is_valid(Some(&token), Some("u1"), "/", MOCKED_TIME));
    }

    #[test]
    fn test_token_bound_to_principal_and_path() {
        let engine = engine();
        let token = engine.mint(Some("u1"), "/widgets/5", MOCKED_TIME).unwrap();

        assert!(!engine.is_valid(Some(&token), Some("u2"), "/widgets/5", MOCKED_TIME));
        assert!(!engine.is_valid(Some(&token), Some("u1"), "/widgets/6", MOCKED_TIME));
    }

    #[test]
    fn test_any_digest_change_is_invalid() {
        let engine = engine();
        let token = engine.mint(Some("u1"), "/", MOCKED_TIME).unwrap();

        for position in 0..64 {
            let mut bytes = token.clone().into_bytes();
            bytes[position] = if bytes[position] == b'0' { b'1' } else { b'0' };
            let modified = String::from_utf8(bytes).unwrap();

            assert!(
                !engine.is_valid(Some(&modified), Some("u1"), "/", MOCKED_TIME),
                "tampered digest at position {} was accepted",
                position
            );
        }
    }

    #[test]
    fn test_rewritten_issue_time_is_invalid() {
        let engine = engine();
        let token = engine.mint(Some("u1"), "/", MOCKED_TIME).unwrap();
        let (digest, _) = token.split_once(' ').unwrap();

        let moved = format!("{} {}", digest, MOCKED_TIME + 1);
        let padded = format!("{} 0{}", digest, MOCKED_TIME);

        assert!(!engine.is_valid(Some(&moved), Some("u1"), "/", MOCKED_TIME + 1));
        assert!(!engine.is_valid(Some(&padded), Some("u1"), "/", MOCKED_TIME));
    }

    // Constant-time comparison

    #[rstest]
    #[case::different_lengths("a", "ab", false)]
    #[case::last_byte_differs("abcde", "abcdf", false)]
    #[case::first_byte_differs("xbcde", "abcde", false)]
    #[case::equal("abcde", "abcde", true)]
    #[case::both_empty("", "", true)]
    fn test_tokens_are_equal(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
        assert_eq!(tokens_are_equal(a, b), expected);
        assert_eq!(tokens_are_equal(b, a), expected);
    }
}
