use std::sync::Arc;

use crate::config::{LimitsConfig, MAX_PAGE_SIZE};
use crate::error::{AppError, AppResult};
use crate::ids;
use crate::metrics;
use crate::model::{BlockAction, User};
use crate::storage::{Cursor, StorageGateway, Table};

use super::{decode, encode, Listing};

/// User registration, listing and block relationships.
pub struct UserRegistry {
    storage: Arc<dyn StorageGateway>,
    limits: LimitsConfig,
}

impl UserRegistry {
    pub fn new(storage: Arc<dyn StorageGateway>, limits: LimitsConfig) -> Self {
        Self { storage, limits }
    }

    pub async fn register(&self, username: &str) -> AppResult<User> {
        if username.is_empty() {
            return Err(AppError::InvalidRequest(
                "Username must not be empty.".to_string(),
            ));
        }
        if username.len() > self.limits.max_username_length {
            return Err(AppError::InvalidRequest(format!(
                "Username exceeds maximum length of {} characters.",
                self.limits.max_username_length
            )));
        }

        let user = User {
            user_id: ids::generate(),
            username: username.to_string(),
            blocked_users: Vec::new(),
        };
        self.storage
            .put_item(Table::Users, &user.user_id, encode(&user)?)
            .await?;

        metrics::USERS_REGISTERED_TOTAL.inc();
        tracing::info!(user_id = %user.user_id, "User registered");
        Ok(user)
    }

    /// Key-ordered page of all users.
    pub async fn list(
        &self,
        limit: Option<usize>,
        cursor: Option<Cursor>,
    ) -> AppResult<Listing<User>> {
        let limit = limit
            .unwrap_or(self.limits.users_page_size)
            .clamp(1, MAX_PAGE_SIZE);
        let page = self.storage.scan(Table::Users, limit, cursor).await?;

        let items = page
            .items
            .into_iter()
            .map(decode::<User>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Listing {
            items,
            next_cursor: page.next_cursor,
        })
    }

    pub async fn get(&self, user_id: &str) -> AppResult<User> {
        let doc = self.storage.get_item(Table::Users, user_id).await?;
        match doc {
            Some(doc) => Ok(decode(doc)?),
            None => Err(AppError::NotFound("User not found.".to_string())),
        }
    }

    /// Whether `user_id` has blocked `target_id`. The target does not have
    /// to exist.
    pub async fn is_blocked(&self, user_id: &str, target_id: &str) -> AppResult<bool> {
        let user = self.get(user_id).await?;
        Ok(user.blocked_users.iter().any(|id| id == target_id))
    }

    /// Adds or removes a block relationship and returns the updated user.
    /// Blocking is idempotent; unblocking removes every occurrence. The
    /// target id is not validated against the registry.
    pub async fn set_block(
        &self,
        user_id: &str,
        target_id: &str,
        action: BlockAction,
    ) -> AppResult<User> {
        if action == BlockAction::Block && user_id == target_id {
            return Err(AppError::InvalidRequest(
                "Users cannot block themselves.".to_string(),
            ));
        }

        let mut user = self.get(user_id).await?;
        match action {
            BlockAction::Block => {
                if !user.blocked_users.iter().any(|id| id == target_id) {
                    user.blocked_users.push(target_id.to_string());
                }
            }
            BlockAction::Unblock => {
                user.blocked_users.retain(|id| id != target_id);
            }
        }

        self.storage
            .put_item(Table::Users, user_id, encode(&user)?)
            .await?;

        tracing::debug!(user_id = %user_id, action = ?action, "Block list updated");
        Ok(user)
    }
}
