use crate::config::AppConfig;
use crate::email::{LogMailer, Mailer, SendgridMailer};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        // Without an API key outbound mail degrades to log lines.
        let mailer: Arc<dyn Mailer> = match config.mail.sendgrid_api_key.as_deref() {
            Some(key) => Arc::new(SendgridMailer::new(key, &config.mail.from)),
            None => Arc::new(LogMailer),
        };

        Ok(Self { db, config, mailer })
    }
}
