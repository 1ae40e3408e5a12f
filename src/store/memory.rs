use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{NewUser, UserRecord, UserStore};
use crate::error::DatabaseError;

/// Process-local user store. Every operation holds the lock for its whole
/// read-check-write, so `swap_refresh_token` is atomic.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, UserRecord>>, DatabaseError> {
        self.users
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<UserRecord, DatabaseError> {
        let mut users = self.lock()?;

        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email or username already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            password_hash: user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self
            .lock()?
            .values()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<(), DatabaseError> {
        let mut users = self.lock()?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.refresh_token = Some(token.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, DatabaseError> {
        let mut users = self.lock()?;
        match users.get_mut(&id) {
            Some(user) if user.refresh_token.as_deref() == Some(expected) => {
                user.refresh_token = Some(replacement.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_refresh_token(&self, id: Uuid) -> Result<(), DatabaseError> {
        if let Some(user) = self.lock()?.get_mut(&id) {
            if user.refresh_token.take().is_some() {
                user.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let mut users = self.lock()?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.password_hash = password_hash.to_string();
        user.refresh_token = None;
        user.updated_at = Utc::now();
        Ok(())
    }
}
