use std::sync::Arc;

use crate::config::Config;
use crate::services::groups::GroupService;
use crate::services::messaging::MessagingService;
use crate::services::users::UserRegistry;
use crate::storage::StorageGateway;

/// Application context containing shared dependencies
/// This reduces parameter passing and makes it easier to add new dependencies
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<dyn StorageGateway>,
    pub users: Arc<UserRegistry>,
    pub messaging: Arc<MessagingService>,
    pub groups: Arc<GroupService>,
    pub config: Arc<Config>,
}

impl AppContext {
    /// Wires the domain services over the given storage backend.
    pub fn new(storage: Arc<dyn StorageGateway>, config: Arc<Config>) -> Self {
        let users = Arc::new(UserRegistry::new(storage.clone(), config.limits.clone()));
        let groups = Arc::new(GroupService::new(storage.clone()));
        let messaging = Arc::new(MessagingService::new(
            storage.clone(),
            users.clone(),
            groups.clone(),
            config.limits.clone(),
        ));

        Self {
            storage,
            users,
            messaging,
            groups,
            config,
        }
    }
}
