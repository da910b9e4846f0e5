//! Bearer-token validation.
//!
//! Tokens are HS256 JWTs minted by the external auth service. This service
//! holds the shared secret only to verify them and never issues tokens.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use millwright_core::types::DbId;
use serde::{Deserialize, Serialize};

/// Default clock-skew allowance for `exp`, in seconds.
const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Claims read from an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's id in the auth service.
    pub sub: DbId,
    /// Single role name, e.g. `"production_manager"`.
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret shared with the auth service.
    pub secret: String,
    /// Seconds an expired token is still accepted.
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// Load from `JWT_SECRET` (required) and `JWT_LEEWAY_SECS` (default `30`).
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is unset or empty, or the leeway is not a number.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let leeway_secs = std::env::var("JWT_LEEWAY_SECS")
            .map(|raw| raw.parse().expect("JWT_LEEWAY_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_LEEWAY_SECS);

        Self {
            secret,
            leeway_secs,
        }
    }
}

/// Why a bearer token was refused.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token carries no role")]
    MissingRole,
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// Verify signature and expiry of an HS256 token and return its claims.
///
/// Tokens signed with any other algorithm are refused.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = config.leeway_secs;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(err),
    })?
    .claims;

    if claims.role.trim().is_empty() {
        return Err(TokenError::MissingRole);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "shared-secret-with-the-auth-service";

    fn config() -> JwtConfig {
        JwtConfig {
            secret: SECRET.to_string(),
            leeway_secs: 30,
        }
    }

    fn mint(role: &str, expires_in: i64, algorithm: Algorithm, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 7,
            role: role.to_string(),
            exp: now + expires_in,
            iat: Some(now),
            jti: None,
        };
        encode(
            &Header::new(algorithm),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_token_from_auth_service() {
        let token = mint("quality_inspector", 600, Algorithm::HS256, SECRET);
        let claims = validate_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "quality_inspector");
    }

    #[test]
    fn expiry_honours_leeway() {
        let grace = mint("operator", -10, Algorithm::HS256, SECRET);
        assert!(validate_token(&grace, &config()).is_ok());

        let stale = mint("operator", -300, Algorithm::HS256, SECRET);
        assert_matches!(validate_token(&stale, &config()), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_or_algorithm_is_invalid() {
        let foreign = mint("admin", 600, Algorithm::HS256, "some-other-secret");
        assert_matches!(
            validate_token(&foreign, &config()),
            Err(TokenError::Invalid(_))
        );

        let hs512 = mint("admin", 600, Algorithm::HS512, SECRET);
        assert_matches!(validate_token(&hs512, &config()), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn blank_role_is_refused() {
        let token = mint(" ", 600, Algorithm::HS256, SECRET);
        assert_matches!(
            validate_token(&token, &config()),
            Err(TokenError::MissingRole)
        );
    }
}
