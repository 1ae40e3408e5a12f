/// Token Authority
///
/// Issues, verifies, rotates and revokes access/refresh token pairs.
/// Exactly one refresh token per user is valid at a time: the one stored on
/// the user record. Rotation replaces it with a compare-and-swap so two
/// requests racing with the same token cannot both succeed.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::jwt::{
    generate_access_token, generate_refresh_token, validate_access_token, validate_refresh_token,
};
use crate::auth::password::{digest_password, verify_password};
use crate::configuration::JwtSettings;
use crate::error::AuthError;
use crate::store::{UserRecord, UserStore};

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenAuthority {
    store: Arc<dyn UserStore>,
    settings: JwtSettings,
}

impl TokenAuthority {
    pub fn new(store: Arc<dyn UserStore>, settings: JwtSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    /// Mint a pair for `user_id` and make its refresh token the current one.
    pub async fn issue(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        self.issue_for(&user).await
    }

    /// Authenticate by username or email.
    ///
    /// `NotFound` and `InvalidCredential` are distinct here; the HTTP layer
    /// folds them together so clients cannot probe for accounts.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(UserRecord, TokenPair), AuthError> {
        let identifier = identifier.trim().to_lowercase();
        let user = self
            .store
            .find_by_identifier(&identifier)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.check_password(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredential);
        }

        let pair = self.issue_for(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, pair))
    }

    /// Exchange the current refresh token for a new pair.
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let claims = validate_refresh_token(presented, &self.settings).map_err(|e| match e {
            // An expired refresh token just means "log in again"
            AuthError::Expired => AuthError::InvalidToken,
            other => other,
        })?;
        let user_id = claims.user_id()?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.refresh_token.as_deref() != Some(presented) {
            tracing::warn!(user_id = %user_id, "Superseded refresh token presented");
            return Err(AuthError::TokenReuseDetected);
        }

        let pair = self.mint(&user)?;
        let swapped = self
            .store
            .swap_refresh_token(user_id, presented, &pair.refresh_token)
            .await?;
        if !swapped {
            tracing::warn!(user_id = %user_id, "Lost refresh token rotation race");
            return Err(AuthError::TokenReuseDetected);
        }

        tracing::info!(user_id = %user_id, "Refresh token rotated");
        Ok(pair)
    }

    /// Stateless access-token check; never touches the store.
    pub fn verify_access(&self, presented: &str) -> Result<Uuid, AuthError> {
        validate_access_token(presented, &self.settings)?.user_id()
    }

    /// Logout. Idempotent.
    pub async fn revoke(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store.clear_refresh_token(user_id).await?;
        tracing::info!(user_id = %user_id, "Refresh token revoked");
        Ok(())
    }

    /// Replace the password after checking the old one. Also revokes the
    /// current refresh token, so every other session has to log in again.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.check_password(old_password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredential);
        }

        let new_password = new_password.to_string();
        let new_hash = tokio::task::spawn_blocking(move || digest_password(&new_password))
            .await
            .map_err(|e| AuthError::Crypto(e.to_string()))??;

        self.store.update_password_hash(user_id, &new_hash).await?;
        tracing::info!(user_id = %user_id, "Password changed; sessions revoked");
        Ok(())
    }

    async fn issue_for(&self, user: &UserRecord) -> Result<TokenPair, AuthError> {
        let pair = self.mint(user)?;
        self.store
            .set_refresh_token(user.id, &pair.refresh_token)
            .await?;
        Ok(pair)
    }

    fn mint(&self, user: &UserRecord) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: generate_access_token(user, &self.settings)?,
            refresh_token: generate_refresh_token(user.id, &self.settings)?,
        })
    }

    // bcrypt is CPU-bound; keep it off the request workers
    async fn check_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Crypto(e.to_string()))?
    }
}
