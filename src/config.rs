use std::env;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub tls: bool,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub cors_origin: String,
    /// `None` when `SMTP_HOST` is unset; messages are then only logged.
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(30);
        let reset_token_ttl_minutes = env::var("RESET_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60);
        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            access_token_ttl_minutes,
            reset_token_ttl_minutes,
            cors_origin,
            smtp: SmtpConfig::from_env(),
        })
    }
}

impl SmtpConfig {
    fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(587);
        let user = env::var("SMTP_USER").unwrap_or_default();
        let password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let tls = env::var("SMTP_TLS")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);
        let from = env::var("SMTP_FROM").unwrap_or_else(|_| user.clone());
        Some(Self {
            host,
            port,
            user,
            password,
            tls,
            from,
        })
    }
}
