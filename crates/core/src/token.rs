//! Correlation tokens binding an outbound message to its expected reply.
//!
//! The token is derived deterministically from `(email, subject)` so that a
//! later reply lookup can re-derive it without storage, and a second send to
//! the same person with the same subject reuses the same token. The digest is
//! truncated to 28 bits for compatibility with the documented wire contract,
//! which makes collisions plausible at high candidate volume; callers accept
//! that risk.

const TOKEN_BITS_MASK: u32 = 0x0fff_ffff;

/// Derives the short hex correlation token for one `(email, subject)` pair.
/// Pure and infallible; identical inputs always yield identical output.
pub fn correlation_token(email: &str, subject: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(email.as_bytes());
    hasher.update(b"\n");
    hasher.update(subject.as_bytes());
    let digest = hasher.finalize();
    let bytes = digest.as_bytes();
    let word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    format!("{:x}", word & TOKEN_BITS_MASK)
}

#[cfg(test)]
mod tests {
    use super::correlation_token;

    #[test]
    fn identical_inputs_yield_identical_tokens() {
        let first = correlation_token("ada@x.com", "Hi");
        let second = correlation_token("ada@x.com", "Hi");
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn token_varies_with_email_and_subject() {
        let base = correlation_token("ada@x.com", "Hi");
        assert_ne!(base, correlation_token("ada@x.com", "Hello"));
        assert_ne!(base, correlation_token("grace@x.com", "Hi"));
    }

    #[test]
    fn token_fits_the_truncated_width() {
        let token = correlation_token("e.reed@example.com", "Invitation to speak");
        assert!(token.len() <= 7, "28-bit token renders to at most 7 hex digits");
        assert!(u32::from_str_radix(&token, 16).is_ok());
    }
}
