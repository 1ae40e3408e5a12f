/// User Store
///
/// Persisted user records, consumed by the token authority and the
/// user routes through the `UserStore` trait.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

/// A stored user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password_hash: String,
    /// The single refresh token currently accepted for this user
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a user. Duplicate username or email yields
    /// `DatabaseError::UniqueConstraintViolation`.
    async fn insert(&self, user: NewUser) -> Result<UserRecord, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError>;

    /// Finds the user whose username or email equals `identifier`.
    async fn find_by_identifier(&self, identifier: &str)
        -> Result<Option<UserRecord>, DatabaseError>;

    /// Unconditionally overwrites the stored refresh token.
    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<(), DatabaseError>;

    /// Replaces the stored refresh token only if it still equals `expected`.
    /// Returns whether the swap happened.
    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, DatabaseError>;

    /// Clears the stored refresh token. Unknown ids are not an error.
    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Stores a new password hash and clears the refresh token in one write.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str)
        -> Result<(), DatabaseError>;
}
