use std::sync::Arc;

use configs::AppConfig;
use service::admin::AdminService;
use service::auth::{AuthService, AuthSettings};
use service::properties::PropertyService;
use service::site::SiteService;
use service::storage::DocumentStore;
use service::users::UserService;

/// Everything a handler needs. Cheap to clone; the services share one store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub properties: Arc<PropertyService>,
    pub site: Arc<SiteService>,
    pub admin: Arc<AdminService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<DocumentStore>, config: AppConfig) -> Self {
        Self {
            auth: Arc::new(AuthService::new(store.clone(), AuthSettings::from(&config.auth))),
            users: Arc::new(UserService::new(store.clone())),
            properties: Arc::new(PropertyService::new(store.clone(), config.uploads.allowed_extensions.clone())),
            site: Arc::new(SiteService::new(store.clone())),
            admin: Arc::new(AdminService::new(store.clone())),
            store,
            config: Arc::new(config),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.config.app.properties_per_page
    }
}
