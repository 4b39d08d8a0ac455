use anyhow::Context;
use serde::Deserialize;

/// Longest token lifetime accepted from the environment (ten years).
pub const MAX_JWT_TTL_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| get(key).with_context(|| format!("{key} is not set"));

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                required("DB_USER")?,
                required("DB_PASSWORD")?,
                required("DB_HOST")?,
                get("DB_PORT").unwrap_or_else(|| "5432".into()),
                required("DB_NAME")?,
                get("DB_SSLMODE").unwrap_or_else(|| "disable".into()),
            ),
        };

        let max_connections = get("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let host = get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = get("PORT")
            .or_else(|| get("APP_PORT"))
            .map(|v| v.parse::<u16>().context("invalid port"))
            .transpose()?
            .unwrap_or(8080);

        let jwt = JwtConfig {
            secret: get("JWT_SECRET").unwrap_or_default(),
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "signup-login".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "signup-login-users".into()),
            ttl_hours: get("JWT_TTL_HOURS")
                .map(|v| parse_ttl_hours(&v).context("invalid JWT_TTL_HOURS"))
                .transpose()?
                .unwrap_or(168),
        };

        Ok(Self {
            database_url,
            max_connections,
            host,
            port,
            jwt,
        })
    }
}

fn parse_ttl_hours(raw: &str) -> anyhow::Result<u64> {
    let hours = raw.trim().parse::<u64>()?;
    anyhow::ensure!(
        (1..=MAX_JWT_TTL_HOURS).contains(&hours),
        "{hours} is outside 1..={MAX_JWT_TTL_HOURS}"
    );
    Ok(hours)
}
