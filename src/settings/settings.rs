use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub store: Store,
    pub redis: Redis,
    pub jwt: Jwt,
    pub cache: Cache,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "mysql" or "memory"
    pub mysql_dsn: Option<String>,
}

/// Remote cache connection. A missing or unreachable URL never fails
/// startup; the cache starts (or ends up) in fallback mode instead.
#[derive(Debug, Deserialize)]
pub struct Redis {
    pub url: Option<String>,
    pub op_timeout_ms: u64,
}

/// Token TTLs and claims. The signing key is deliberately NOT part of the
/// settings file: it comes from the JWT_SIGNING_KEY environment variable,
/// and its absence is a fatal startup error.
#[derive(Debug, Deserialize)]
pub struct Jwt {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    pub fallback_capacity: usize,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
