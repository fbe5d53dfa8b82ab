use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;

use crate::config::AppConfig;
use crate::notify::{Notifier, SmtpNotifier};
use crate::storage::AvatarStore;
use crate::users::repo::{PgUserRepository, UserRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub storage: Arc<AvatarStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            warn!(error = %e, "migration failed; continuing");
        }

        let users = Arc::new(PgUserRepository::new(pool)) as Arc<dyn UserRepository>;
        let storage = Arc::new(AvatarStore::new(&config.storage)?);
        let notifier = Arc::new(SmtpNotifier::new(&config.smtp)?) as Arc<dyn Notifier>;

        Ok(Self {
            config,
            users,
            storage,
            notifier,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        storage: Arc<AvatarStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            users,
            storage,
            notifier,
        }
    }
}
