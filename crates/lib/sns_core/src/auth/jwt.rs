//! JWT access token generation and verification.
//!
//! Access tokens are HS256-signed, carry only the user id and expiry, and
//! cannot be revoked individually. Their short lifetime bounds exposure.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};

use super::AuthError;
use super::config::SessionConfig;
use crate::models::auth::{AccessClaims, UserId};

/// The only algorithm accepted on verification.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Stateless signer/verifier for access tokens.
///
/// Holds the process-wide secret; immutable after construction so it can be
/// shared freely across request tasks.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is compared against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.access_token_ttl)
    }

    /// Access token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a signed access token for `user_id`, valid for the codec TTL.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Like [`issue`](Self::issue) with an explicit issue time.
    pub fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let exp = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Internal("access token expiry out of range".into()))?;
        let claims = AccessClaims {
            user_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify an access token, returning its subject.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Like [`verify`](Self::verify) against an explicit clock.
    ///
    /// The header is checked before anything else: a token announcing any
    /// algorithm other than HS256 (including `none`) is rejected outright.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        if header.alg != ALGORITHM {
            return Err(AuthError::InvalidToken);
        }

        let data =
            decode::<AccessClaims>(token, &self.decoding, &self.validation).map_err(classify)?;

        if now.timestamp() >= data.claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(data.claims.user_id)
    }
}

/// Map `jsonwebtoken` failures onto the access-token error taxonomy.
fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedClaims,
        _ => AuthError::InvalidToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-prod";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, Duration::hours(1))
    }

    fn sign_raw(alg: Algorithm, secret: &[u8], claims: &serde_json::Value) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn issue_then_verify_returns_subject() {
        let codec = codec();
        let token = codec.issue(42).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), 42);
    }

    #[test]
    fn expiry_past_the_calendar_is_internal() {
        let codec = TokenCodec::new(SECRET, Duration::days(365));
        assert!(matches!(
            codec.issue_at(42, DateTime::<Utc>::MAX_UTC - Duration::days(1)),
            Err(AuthError::Internal(_))
        ));
    }

    #[test]
    fn token_expires_after_ttl() {
        let codec = codec();
        let issued = Utc::now();
        let token = codec.issue_at(42, issued).unwrap();

        assert_eq!(codec.verify_at(&token, issued).unwrap(), 42);
        assert_eq!(
            codec
                .verify_at(&token, issued + Duration::minutes(59))
                .unwrap(),
            42
        );
        assert!(matches!(
            codec.verify_at(&token, issued + Duration::hours(1) + Duration::seconds(1)),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let other = TokenCodec::new(b"some-other-secret", Duration::hours(1));
        let token = other.issue(42).unwrap();
        assert!(matches!(codec().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn other_hmac_algorithm_is_invalid() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = sign_raw(Algorithm::HS512, SECRET, &json!({"user_id": 42, "exp": exp}));
        assert!(matches!(codec().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn unsigned_none_token_is_invalid() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(json!({"user_id": 42, "exp": exp}).to_string());
        let token = format!("{header}.{claims}.");
        assert!(matches!(codec().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(codec().verify("not-a-jwt"), Err(AuthError::InvalidToken)));
        assert!(matches!(codec().verify(""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn missing_subject_is_malformed() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = sign_raw(Algorithm::HS256, SECRET, &json!({"exp": exp}));
        assert!(matches!(codec().verify(&token), Err(AuthError::MalformedClaims)));
    }

    #[test]
    fn mistyped_subject_is_malformed() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = sign_raw(
            Algorithm::HS256,
            SECRET,
            &json!({"user_id": "forty-two", "exp": exp}),
        );
        assert!(matches!(codec().verify(&token), Err(AuthError::MalformedClaims)));
    }

    #[test]
    fn missing_expiry_is_malformed() {
        let token = sign_raw(Algorithm::HS256, SECRET, &json!({"user_id": 42, "iat": 0}));
        assert!(matches!(codec().verify(&token), Err(AuthError::MalformedClaims)));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let codec = codec();
        let token = codec.issue(42).unwrap();
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let forged = URL_SAFE_NO_PAD.encode(json!({"user_id": 1, "exp": exp}).to_string());
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged;
        assert!(matches!(codec.verify(&parts.join(".")), Err(AuthError::InvalidToken)));
    }
}
