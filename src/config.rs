use std::env;

/// Process configuration. `DATABASE_URL` is mandatory; `APP_HOST`/`APP_PORT`
/// fall back to a local development listener. `JWT_SECRET` is read where the
/// token is signed and verified, not here, so the migrate and seed binaries
/// can run without it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
        })
    }
}
