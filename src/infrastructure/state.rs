//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::{BillingSettings, Config};
use crate::domain::MaterialRepository;
use crate::infrastructure::SeaOrmMaterialRepository;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Material catalog repository
    pub material_repo: Arc<dyn MaterialRepository>,
    billing: BillingSettings,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &Config) -> Self {
        let material_repo = Arc::new(SeaOrmMaterialRepository::new(db.clone()));

        Self {
            db,
            material_repo,
            billing: config.billing.clone(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Billing settings used for event totals
    pub fn billing(&self) -> &BillingSettings {
        &self.billing
    }
}

// Handlers that only need the connection extract it directly
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
