use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub upload_dir: String,
}

impl AppConfig {
    /// Build configuration from the environment. Startup fails when
    /// `DATABASE_URL` or `JWT_SECRET` is missing.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cashbook".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "cashbook-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
        Ok(Self {
            database_url,
            jwt,
            upload_dir,
        })
    }
}
