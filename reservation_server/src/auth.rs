//! Bearer-token authentication.
//!
//! Identity verification itself is an external concern; all the core needs is a verified `user_id` on every request.
//! Tokens are HS256 JWTs carrying `{sub, iat, exp}`, presented in the `Authorization: Bearer <token>` header.
//! [`JwtClaims`] doubles as an actix extractor, so handlers simply take a `claims: JwtClaims` argument.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The verified user id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Issues access tokens. Only used by the operator CLI and tests; user-facing credential flows live outside this
/// service.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    expiry: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()),
            expiry: Duration::minutes(config.token_expiry_minutes),
        }
    }

    pub fn issue_token(&self, user_id: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AuthError::TokenIssueError(e.to_string()))
    }
}

/// Validates bearer tokens. One instance is shared through app data.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;
        Ok(data.claims)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let verifier = req
        .app_data::<web::Data<TokenVerifier>>()
        .ok_or_else(|| ServerError::ConfigurationError("TokenVerifier is not registered".to_string()))?;
    let header = req.headers().get(header::AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|_| AuthError::InvalidToken("Header is not valid UTF-8".to_string()))?;
    let token = value.strip_prefix(BEARER_PREFIX).ok_or(AuthError::MissingToken)?;
    Ok(verifier.verify(token)?)
}

#[cfg(test)]
mod test {
    use srs_common::Secret;

    use super::*;

    fn config() -> AuthConfig {
        AuthConfig { jwt_secret: Secret::new("a-test-secret-that-is-long-enough".to_string()), token_expiry_minutes: 15 }
    }

    #[test]
    fn issued_tokens_verify() {
        let config = config();
        let token = TokenIssuer::new(&config).issue_token("alice").unwrap();
        let claims = TokenVerifier::new(&config).verify(&token).unwrap();
        assert_eq!(claims.user_id(), "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let config = config();
        let mut token = TokenIssuer::new(&config).issue_token("alice").unwrap();
        token.replace_range(token.len() - 4.., "0000");
        let err = TokenVerifier::new(&config).verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = TokenIssuer::new(&config()).issue_token("alice").unwrap();
        let other =
            AuthConfig { jwt_secret: Secret::new("a-different-secret-entirely".to_string()), token_expiry_minutes: 15 };
        assert!(TokenVerifier::new(&other).verify(&token).is_err());
    }
}
