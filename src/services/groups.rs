use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::ids;
use crate::model::{Group, MemberAction, Message};
use crate::storage::{StorageGateway, Table};

use super::{decode, encode};

/// Group creation and membership. Membership has set semantics: creation
/// deduplicates, add is idempotent, remove strips every occurrence.
pub struct GroupService {
    storage: Arc<dyn StorageGateway>,
}

impl GroupService {
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        Self { storage }
    }

    /// Creates a group. Member ids are taken as given and not validated
    /// against the user registry.
    pub async fn create(&self, members: Vec<String>) -> AppResult<Group> {
        let mut seen = HashSet::new();
        let members = members
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let group = Group {
            group_id: ids::generate(),
            members,
            messages: Vec::new(),
        };
        self.storage
            .put_item(Table::Groups, &group.group_id, encode(&group)?)
            .await?;

        tracing::info!(group_id = %group.group_id, members = group.members.len(), "Group created");
        Ok(group)
    }

    pub async fn get(&self, group_id: &str) -> AppResult<Group> {
        let doc = self.storage.get_item(Table::Groups, group_id).await?;
        match doc {
            Some(doc) => Ok(decode(doc)?),
            None => Err(AppError::NotFound("Group not found.".to_string())),
        }
    }

    pub async fn manage_members(
        &self,
        group_id: &str,
        member_id: &str,
        action: MemberAction,
    ) -> AppResult<Group> {
        let mut group = self.get(group_id).await?;
        match action {
            MemberAction::Add => {
                if !group.members.iter().any(|id| id == member_id) {
                    group.members.push(member_id.to_string());
                }
            }
            MemberAction::Remove => {
                group.members.retain(|id| id != member_id);
            }
        }

        self.storage
            .put_item(Table::Groups, group_id, encode(&group)?)
            .await?;

        tracing::debug!(group_id = %group_id, action = ?action, "Group membership updated");
        Ok(group)
    }

    /// Appends a message to the group's embedded list.
    pub(crate) async fn append_message(&self, group: &mut Group, message: Message) -> AppResult<()> {
        group.messages.push(message);
        self.storage
            .put_item(Table::Groups, &group.group_id, encode(group)?)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;

    fn service() -> GroupService {
        GroupService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn create_deduplicates_members() {
        let groups = service();
        let group = groups
            .create(vec!["a".into(), "b".into(), "a".into()])
            .await
            .unwrap();
        assert_eq!(group.members, vec!["a".to_string(), "b".to_string()]);
        assert!(group.messages.is_empty());
    }

    #[tokio::test]
    async fn add_is_idempotent_and_remove_restores_length() {
        let groups = service();
        let group = groups.create(vec!["a".into(), "b".into()]).await.unwrap();

        let added = groups
            .manage_members(&group.group_id, "c", MemberAction::Add)
            .await
            .unwrap();
        assert_eq!(added.members, vec!["a", "b", "c"]);

        let added_again = groups
            .manage_members(&group.group_id, "c", MemberAction::Add)
            .await
            .unwrap();
        assert_eq!(added_again.members.len(), 3);

        let removed = groups
            .manage_members(&group.group_id, "c", MemberAction::Remove)
            .await
            .unwrap();
        assert_eq!(removed.members.len(), group.members.len());
    }

    #[tokio::test]
    async fn managing_an_unknown_group_is_not_found() {
        let groups = service();
        let err = groups
            .manage_members("ghost", "a", MemberAction::Add)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
