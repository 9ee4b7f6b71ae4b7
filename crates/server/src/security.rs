use axum::http::{header, HeaderMap, StatusCode};
use concierge_core::config::AuthConfig;
use concierge_providers::relay::sign_payload;
use secrecy::{ExposeSecret, SecretString};

pub struct AuthDenied {
    pub status: StatusCode,
    pub reason: String,
}

/// Bearer-token check for mutating endpoints. With no token configured the
/// policy is open, which is the expected shape for a local demo process.
pub fn authorize(auth: &AuthConfig, headers: &HeaderMap, scope: &str) -> Result<(), AuthDenied> {
    let Some(expected) = auth.token.as_ref() else { return Ok(()) };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token)
            if constant_time_eq(token.as_bytes(), expected.expose_secret().as_bytes()) => {}
        _ => {
            return Err(AuthDenied {
                status: StatusCode::UNAUTHORIZED,
                reason: "missing or invalid bearer token".to_owned(),
            });
        }
    }

    if !auth.scopes.iter().any(|granted| granted == scope) {
        return Err(AuthDenied {
            status: StatusCode::FORBIDDEN,
            reason: format!("token lacks the {scope} scope"),
        });
    }
    Ok(())
}

/// Checks the hex HMAC signature a relay attaches to inbound webhook bodies.
pub fn verify_signature(secret: &SecretString, body: &[u8], provided: &str) -> bool {
    let expected = sign_payload(secret.expose_secret(), body);
    constant_time_eq(expected.as_bytes(), provided.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderMap, StatusCode};
    use concierge_core::config::AuthConfig;
    use concierge_providers::relay::sign_payload;
    use secrecy::SecretString;

    use super::{authorize, verify_signature};

    fn policy(token: Option<&str>, scopes: &[&str]) -> AuthConfig {
        AuthConfig {
            token: token.map(|value| SecretString::from(value.to_owned())),
            scopes: scopes.iter().map(|scope| (*scope).to_owned()).collect(),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().expect("header value"),
        );
        headers
    }

    #[test]
    fn open_policy_allows_anonymous_requests() {
        let auth = policy(None, &[]);
        assert!(authorize(&auth, &HeaderMap::new(), "outreach:run").is_ok());
    }

    #[test]
    fn wrong_token_is_unauthorized() {
        let auth = policy(Some("super-secret-token-value"), &["outreach:run"]);
        let denied =
            authorize(&auth, &bearer("not-the-token"), "outreach:run").expect_err("must deny");
        assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_scope_is_forbidden() {
        let auth = policy(Some("super-secret-token-value"), &["candidates:write"]);
        let denied = authorize(&auth, &bearer("super-secret-token-value"), "outreach:run")
            .expect_err("must deny");
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn matching_token_and_scope_pass() {
        let auth = policy(Some("super-secret-token-value"), &["outreach:run"]);
        assert!(authorize(&auth, &bearer("super-secret-token-value"), "outreach:run").is_ok());
    }

    #[test]
    fn signature_verification_rejects_tampered_bodies() {
        let secret = SecretString::from("webhook-secret".to_owned());
        let body = br#"{"refToken":"abc123"}"#;
        let signature = sign_payload("webhook-secret", body);

        assert!(verify_signature(&secret, body, &signature));
        assert!(!verify_signature(&secret, br#"{"refToken":"zzz999"}"#, &signature));
        assert!(!verify_signature(&secret, body, "deadbeef"));
    }
}
