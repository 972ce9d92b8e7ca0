//! Anti-forgery token issue and verification.
//!
//! One token lives in the session. It is created on first request and kept
//! until the session ends; this module never rotates or clears it.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::session::{SessionStore, TOKEN_SESSION_KEY};

/// Why a submitted token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Nothing (or an empty string) was submitted.
    Missing,
    /// The session never issued a token.
    NoSessionToken,
    /// The submitted token differs from the session's.
    Mismatch,
}

impl TokenRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            TokenRejection::Missing => "missing token",
            TokenRejection::NoSessionToken => "no token in session",
            TokenRejection::Mismatch => "token mismatch",
        }
    }
}

/// Return the session's token, creating and storing one if needed.
pub fn get_token(session: &mut dyn SessionStore) -> String {
    session.get_or_insert_with(TOKEN_SESSION_KEY, &mut |session_id| {
        debug!("issuing form token");
        generate_token(session_id)
    })
}

/// Whether the session already holds a token.
pub fn has_token(session: &dyn SessionStore) -> bool {
    session.get(TOKEN_SESSION_KEY).is_some()
}

/// Compare a submitted token with the session's token.
pub fn verify_token(session: &dyn SessionStore, submitted: Option<&str>) -> Result<(), TokenRejection> {
    let submitted = submitted.unwrap_or_default();
    if submitted.is_empty() {
        return Err(TokenRejection::Missing);
    }

    let stored = session
        .get(TOKEN_SESSION_KEY)
        .ok_or(TokenRejection::NoSessionToken)?;

    if bool::from(submitted.as_bytes().ct_eq(stored.as_bytes())) {
        Ok(())
    } else {
        Err(TokenRejection::Mismatch)
    }
}

/// Hash random bytes, the session id and the current time into a hex token.
fn generate_token(session_id: &str) -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);

    let timestamp = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(random_bytes);
    hasher.update(timestamp.to_le_bytes());

    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::MemorySession;

    #[test]
    fn test_token_format() {
        let token = generate_token("session");
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_differ_for_same_session() {
        assert_ne!(generate_token("s"), generate_token("s"));
    }

    #[test]
    fn test_get_token_is_lazy_and_stable() {
        let mut session = MemorySession::new();
        assert!(!has_token(&session));

        let first = get_token(&mut session);
        assert!(has_token(&session));
        assert_eq!(get_token(&mut session), first);
    }

    #[test]
    fn test_verify_token() {
        let mut session = MemorySession::new();
        assert_eq!(
            verify_token(&session, Some("abc")),
            Err(TokenRejection::NoSessionToken)
        );

        let token = get_token(&mut session);
        assert_eq!(verify_token(&session, None), Err(TokenRejection::Missing));
        assert_eq!(verify_token(&session, Some("")), Err(TokenRejection::Missing));
        assert_eq!(
            verify_token(&session, Some("abc")),
            Err(TokenRejection::Mismatch)
        );
        assert_eq!(verify_token(&session, Some(&token)), Ok(()));
    }

    #[test]
    fn test_token_survives_verification() {
        let mut session = MemorySession::new();
        let token = get_token(&mut session);
        assert!(verify_token(&session, Some(&token)).is_ok());
        assert!(verify_token(&session, Some(&token)).is_ok());
    }
}
