/// JWT Token Generation and Validation
///
/// Access and refresh tokens are HS256 JWTs signed with separate secrets,
/// so a token of one kind never verifies as the other.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::JwtSettings;
use crate::error::AuthError;
use crate::store::UserRecord;

/// Generate a new access token for a user
pub fn generate_access_token(user: &UserRecord, config: &JwtSettings) -> Result<String, AuthError> {
    let claims = AccessClaims::new(user, config.access_token_expiry, config.issuer.clone());
    sign(&claims, &config.access_token_secret)
}

/// Generate a new refresh token for a user
pub fn generate_refresh_token(user_id: Uuid, config: &JwtSettings) -> Result<String, AuthError> {
    let claims = RefreshClaims::new(user_id, config.refresh_token_expiry, config.issuer.clone());
    sign(&claims, &config.refresh_token_secret)
}

/// Validate and extract claims from an access token
///
/// # Errors
/// `Expired` when the signature is good but `exp` has passed,
/// `InvalidToken` for everything else.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<AccessClaims, AuthError> {
    verify(token, &config.access_token_secret, &config.issuer)
}

/// Validate and extract claims from a refresh token
pub fn validate_refresh_token(
    token: &str,
    config: &JwtSettings,
) -> Result<RefreshClaims, AuthError> {
    verify(token, &config.refresh_token_secret, &config.issuer)
}

fn sign<T: serde::Serialize>(claims: &T, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Crypto(format!("Token generation failed: {}", e)))
}

fn verify<T: DeserializeOwned>(token: &str, secret: &str, issuer: &str) -> Result<T, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.leeway = 0;
    // valid only while now < exp
    validation.reject_tokens_expiring_in_less_than = 1;

    decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => {
                tracing::debug!("JWT validation error: {}", e);
                AuthError::InvalidToken
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_token_secret: "test-access-secret-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
            refresh_token_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    fn test_user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Liddell".to_string(),
            avatar: String::new(),
            cover_image: String::new(),
            password_hash: "hash".to_string(),
            refresh_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = get_test_config();
        let user = test_user();

        let token = generate_access_token(&user, &config).expect("Failed to generate token");
        let claims = validate_access_token(&token, &config).expect("Failed to validate token");

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = generate_refresh_token(user_id, &config).expect("Failed to generate token");
        let claims = validate_refresh_token(&token, &config).expect("Failed to validate token");

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_token_kinds_do_not_cross_verify() {
        let config = get_test_config();
        let user = test_user();

        let access = generate_access_token(&user, &config).unwrap();
        let refresh = generate_refresh_token(user.id, &config).unwrap();

        assert_eq!(validate_refresh_token(&access, &config).unwrap_err(), AuthError::InvalidToken);
        assert_eq!(validate_access_token(&refresh, &config).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_invalid_token() {
        let config = get_test_config();
        let result = validate_access_token("invalid.token.here", &config);

        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_tampered_token() {
        let config = get_test_config();
        let token = generate_access_token(&test_user(), &config).unwrap();

        let tampered = format!("{}X", token);
        assert_eq!(validate_access_token(&tampered, &config).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_expired_token_is_expired_not_invalid() {
        let mut config = get_test_config();
        config.access_token_expiry = -10;

        let token = generate_access_token(&test_user(), &config).unwrap();
        assert_eq!(validate_access_token(&token, &config).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn test_token_at_expiry_second_is_expired() {
        let mut config = get_test_config();
        config.access_token_expiry = 0;
        config.refresh_token_expiry = 0;
        let user = test_user();

        let access = generate_access_token(&user, &config).unwrap();
        let refresh = generate_refresh_token(user.id, &config).unwrap();

        assert_eq!(validate_access_token(&access, &config).unwrap_err(), AuthError::Expired);
        assert_eq!(validate_refresh_token(&refresh, &config).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn test_wrong_issuer() {
        let mut config = get_test_config();
        let token = generate_access_token(&test_user(), &config).unwrap();

        config.issuer = "wrong-issuer".to_string();
        assert_eq!(validate_access_token(&token, &config).unwrap_err(), AuthError::InvalidToken);
    }
}
