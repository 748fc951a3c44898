use std::net::IpAddr;

use chrono::Duration;

const DEFAULT_CORS_ORIGINS: &str = concat!(
    "http://localhost:3000,http://127.0.0.1:3000,",
    "https://fruitfulab.net,https://fruitful-lab.vercel.app",
);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_size: usize,
    pub log_level: String,
}

/// Token signing settings. The secret stays optional here; the token service
/// refuses to sign or verify without it.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Option<String>,
    pub access_token_ttl: Duration,
}

impl JwtConfig {
    pub fn new(secret: Option<String>, access_token_ttl: Duration) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            access_token_ttl,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let ttl = parse_ttl_minutes(&env_or("JWT_ACCESS_TOKEN_EXPIRE_MINUTES", "60"))?;
        let jwt = JwtConfig::new(std::env::var("JWT_SECRET").ok(), ttl);

        let host: IpAddr = env_or("FRUITFUL_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid FRUITFUL_HOST: {e}"))?;

        let port: u16 = env_or("FRUITFUL_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid FRUITFUL_PORT: {e}"))?;

        let cors_origins = parse_origins(&env_or("FRUITFUL_CORS_ORIGINS", DEFAULT_CORS_ORIGINS));

        let max_upload_size: usize = env_or("FRUITFUL_MAX_UPLOAD_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid FRUITFUL_MAX_UPLOAD_SIZE: {e}"))?;

        let log_level = env_or("FRUITFUL_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt,
            host,
            port,
            cors_origins,
            max_upload_size,
            log_level,
        })
    }
}

fn parse_ttl_minutes(raw: &str) -> Result<Duration, String> {
    let minutes: i64 = raw
        .parse()
        .map_err(|e| format!("Invalid JWT_ACCESS_TOKEN_EXPIRE_MINUTES: {e}"))?;
    Duration::try_minutes(minutes).ok_or_else(|| {
        format!("Invalid JWT_ACCESS_TOKEN_EXPIRE_MINUTES: {minutes} is out of range")
    })
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
