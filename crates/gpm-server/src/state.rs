//! Shared application state.

use std::sync::Arc;

use gpm_auth::{AuthConfig, AuthService, ResetNotifier};
use gpm_db::repository::{
    SurrealPasswordResetRepository, SurrealPracticeRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

/// The auth service as wired against SurrealDB.
pub type ServerAuthService = AuthService<
    SurrealUserRepository<Any>,
    SurrealPracticeRepository<Any>,
    SurrealPasswordResetRepository<Any>,
>;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<ServerAuthService>,
}

impl AppState {
    pub fn new(db: Surreal<Any>, config: AuthConfig, notifier: Arc<dyn ResetNotifier>) -> Self {
        let auth = AuthService::new(
            SurrealUserRepository::new(db.clone()),
            SurrealPracticeRepository::new(db.clone()),
            SurrealPasswordResetRepository::new(db),
            notifier,
            config,
        );
        Self {
            auth: Arc::new(auth),
        }
    }
}
