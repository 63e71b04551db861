use serde::Deserialize;

/// Secrets and lifetimes for the three token kinds. Each kind signs with its
/// own secret, so a token of one kind can never verify as another.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub session_secret: String,
    pub activation_secret: String,
    pub reset_secret: String,
    pub activation_ttl_hours: i64,
    pub reset_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// When unset, outbound mail is logged instead of sent.
    pub sendgrid_api_key: Option<String>,
    pub from: String,
    /// Base URL the activation/reset links in outbound mail point at.
    pub frontend_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub tokens: TokenConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let tokens = TokenConfig {
            session_secret: std::env::var("JWT_SECRET")?,
            activation_secret: std::env::var("JWT_SECRET_EMAIL")?,
            reset_secret: std::env::var("JWT_SECRET_PASSWORD")?,
            activation_ttl_hours: std::env::var("ACTIVATION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
            reset_ttl_hours: std::env::var("RESET_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let mail = MailConfig {
            sendgrid_api_key: std::env::var("SENDGRID_API_KEY").ok(),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@taskhub.dev".into()),
            frontend_base_url: std::env::var("FRONTEND_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        Ok(Self {
            database_url,
            tokens,
            mail,
        })
    }
}
