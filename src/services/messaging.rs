use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::config::LimitsConfig;
use crate::error::{AppError, AppResult};
use crate::ids;
use crate::metrics;
use crate::model::Message;
use crate::storage::{Cursor, IndexQuery, StorageGateway, Table};

use super::groups::GroupService;
use super::users::UserRegistry;
use super::{decode, encode, Listing};

/// Secondary index over messages, keyed by receiver and sorted by creation
/// time. Attribute names match the wire names of `Message`.
pub const RECEIVER_INDEX: &str = "receiverId-timestamp-index";
const ATTR_RECEIVER_ID: &str = "receiverId";
const ATTR_TIMESTAMP: &str = "timestamp";
const ATTR_READ: &str = "read";

/// Direct and group message delivery and retrieval.
///
/// Retrieval and read-state are two explicit operations: `fetch_unread`
/// never mutates, `mark_read` is the write. The HTTP layer composes them.
pub struct MessagingService {
    storage: Arc<dyn StorageGateway>,
    users: Arc<UserRegistry>,
    groups: Arc<GroupService>,
    limits: LimitsConfig,
}

impl MessagingService {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        users: Arc<UserRegistry>,
        groups: Arc<GroupService>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            storage,
            users,
            groups,
            limits,
        }
    }

    fn validate_content(&self, content: &str) -> AppResult<()> {
        if content.is_empty() {
            return Err(AppError::InvalidRequest(
                "Message content must not be empty.".to_string(),
            ));
        }
        if content.len() > self.limits.max_content_length {
            return Err(AppError::InvalidRequest(format!(
                "Message content exceeds maximum of {} bytes.",
                self.limits.max_content_length
            )));
        }
        Ok(())
    }

    /// Sends a direct message. Both parties must exist and the receiver
    /// must not have blocked the sender.
    pub async fn send(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> AppResult<Message> {
        self.validate_content(content)?;

        match self.users.get(sender_id).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                return Err(AppError::NotFound(
                    "Sender or receiver not found.".to_string(),
                ))
            }
            Err(other) => return Err(other),
        }
        let receiver = match self.users.get(receiver_id).await {
            Ok(receiver) => receiver,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::NotFound(
                    "Sender or receiver not found.".to_string(),
                ))
            }
            Err(other) => return Err(other),
        };

        if receiver.blocked_users.iter().any(|id| id == sender_id) {
            tracing::debug!(
                sender_id = %sender_id,
                receiver_id = %receiver_id,
                "Send rejected, sender is blocked"
            );
            return Err(AppError::Forbidden("User is blocked.".to_string()));
        }

        let message = Message {
            message_id: ids::generate(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            read: false,
        };
        self.storage
            .put_item(Table::Messages, &message.message_id, encode(&message)?)
            .await?;

        metrics::MESSAGES_SENT_TOTAL.inc();
        tracing::info!(message_id = %message.message_id, "Message sent");
        Ok(message)
    }

    /// Unread messages addressed to `user_id`, newest first. Read-only;
    /// callers that want the returned page consumed must follow up with
    /// `mark_read`.
    pub async fn fetch_unread(
        &self,
        user_id: &str,
        cursor: Option<Cursor>,
    ) -> AppResult<Listing<Message>> {
        let page = self
            .storage
            .query_index(IndexQuery {
                table: Table::Messages,
                index: RECEIVER_INDEX,
                key_attr: ATTR_RECEIVER_ID,
                key_value: user_id,
                filter: Some((ATTR_READ, json!(false))),
                sort_attr: ATTR_TIMESTAMP,
                limit: self.limits.unread_page_size,
                cursor,
            })
            .await?;

        let items = page
            .items
            .into_iter()
            .map(decode::<Message>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Listing {
            items,
            next_cursor: page.next_cursor,
        })
    }

    /// Flips `read` on every given message. The updates run concurrently
    /// with no ordering guarantee among them; any individual failure fails
    /// the whole batch.
    pub async fn mark_read(&self, messages: &[Message]) -> AppResult<()> {
        let updates = messages.iter().map(|message| {
            self.storage
                .update_attribute(Table::Messages, &message.message_id, ATTR_READ, json!(true))
        });
        futures_util::future::try_join_all(updates).await?;

        metrics::MESSAGES_MARKED_READ_TOTAL.inc_by(messages.len() as u64);
        Ok(())
    }

    /// Appends a message to a group's embedded list. The sender must exist
    /// and be a member of the group.
    pub async fn send_to_group(
        &self,
        group_id: &str,
        sender_id: &str,
        content: &str,
    ) -> AppResult<Message> {
        self.validate_content(content)?;

        let mut group = self.groups.get(group_id).await?;
        self.users.get(sender_id).await?;
        if !group.members.iter().any(|id| id == sender_id) {
            return Err(AppError::Forbidden(
                "User is not a member of the group.".to_string(),
            ));
        }

        let message = Message {
            message_id: ids::generate(),
            sender_id: sender_id.to_string(),
            receiver_id: group_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            read: false,
        };
        self.groups.append_message(&mut group, message.clone()).await?;

        metrics::GROUP_MESSAGES_SENT_TOTAL.inc();
        tracing::info!(message_id = %message.message_id, group_id = %group_id, "Group message sent");
        Ok(message)
    }

    /// The group's embedded messages, in insertion order.
    pub async fn fetch_for_group(&self, group_id: &str) -> AppResult<Vec<Message>> {
        let group = self.groups.get(group_id).await?;
        Ok(group.messages)
    }
}
