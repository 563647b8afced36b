use std::sync::Arc;

use vault_core::services::{AuthService, ChatService, DocumentService, FundService, UserService};
use vault_shared::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub funds: Arc<FundService>,
    pub documents: Arc<DocumentService>,
    pub chat: Arc<ChatService>,
    pub config: Arc<AppConfig>,
}
