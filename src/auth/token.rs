use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::AuthConfig;
use crate::entities::users::Role;

/// Claims carried by an access token. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the principal.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    Expired,
}

/// Issues and verifies HMAC-signed JWTs with a server-only symmetric key.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8], algorithm: &str, default_ttl: Duration) -> Result<Self, TokenError> {
        let algorithm = match Algorithm::from_str(algorithm) {
            Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => alg,
            _ => return Err(TokenError::UnsupportedAlgorithm(algorithm.to_string())),
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            default_ttl,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        Self::new(
            config.secret_key.as_bytes(),
            &config.algorithm,
            Duration::minutes(i64::from(config.default_token_expire_minutes)),
        )
    }

    /// Signs `{sub, role, iat, exp}`. `ttl` falls back to the configured default.
    pub fn issue(
        &self,
        subject: &str,
        role: Role,
        ttl: Option<Duration>,
    ) -> Result<String, TokenError> {
        self.issue_at(subject, role, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        role: Role,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let exp = now + ttl.unwrap_or(self.default_ttl);
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(TokenError::Encode)
    }

    /// Checks signature and algorithm, then expiry against `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is compared against the caller's clock below.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(TokenError::Invalid)?;

        if data.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"unit-test-secret", "HS256", Duration::minutes(15)).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let token = issuer.issue("alice", Role::Technician, None).unwrap();
        let claims = issuer.verify(&token, Utc::now()).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::Technician);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_explicit_ttl() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer
            .issue_at("bob", Role::Standard, Some(Duration::minutes(30)), now)
            .unwrap();
        let claims = issuer.verify(&token, now).unwrap();
        assert_eq!(claims.exp, (now + Duration::minutes(30)).timestamp());
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let now = Utc::now();
        let token = issuer.issue_at("carol", Role::Admin, None, now).unwrap();

        let later = now + Duration::minutes(16);
        assert!(matches!(
            issuer.verify(&token, later),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issuer().issue("dave", Role::Standard, None).unwrap();
        let other = TokenIssuer::new(b"another-secret", "HS256", Duration::minutes(15)).unwrap();
        assert!(matches!(
            other.verify(&token, Utc::now()),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let token = issuer().issue("erin", Role::Standard, None).unwrap();
        let hs512 =
            TokenIssuer::new(b"unit-test-secret", "HS512", Duration::minutes(15)).unwrap();
        assert!(hs512.verify(&token, Utc::now()).is_err());
    }

    #[test]
    fn test_unsupported_algorithm() {
        assert!(matches!(
            TokenIssuer::new(b"k", "RS256", Duration::minutes(1)),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
        assert!(TokenIssuer::new(b"k", "nonsense", Duration::minutes(1)).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(issuer().verify("not.a.jwt", Utc::now()).is_err());
    }
}
