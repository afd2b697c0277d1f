use crate::config::Config;
use crate::session::SessionStore;
use crate::storage::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            sessions: SessionStore::default(),
        }
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.config.admin_username == username
    }
}
