use std::{env, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `station` and `reading` tables in a sqlite database
    Sqlite,
    /// device records in an on-disk key-value file, no readings
    Shelf,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "shelf" => Ok(Backend::Shelf),
            other => Err(anyhow!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub database_url: String,
    pub shelf_path: PathBuf,
    pub bind_addr: String,
    pub port: u16,
    pub readme_path: PathBuf,
    pub cors_origin: Option<String>,
    pub init_schema: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            database_url: "api.db".to_string(),
            shelf_path: PathBuf::from("stations.shelf"),
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            readme_path: PathBuf::from("README.md"),
            cors_origin: None,
            init_schema: false,
        }
    }
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env` if
    /// there is one.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(backend) = lookup("STORE_BACKEND") {
            config.backend = backend.parse()?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(path) = lookup("SHELF_PATH") {
            config.shelf_path = path.into();
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{port}'"))?;
        }
        if let Some(path) = lookup("README_PATH") {
            config.readme_path = path.into();
        }
        config.cors_origin = lookup("CORS_ORIGIN").filter(|origin| !origin.is_empty());
        if let Some(init) = lookup("INIT_SCHEMA") {
            config.init_schema = parse_flag(&init)
                .with_context(|| format!("INIT_SCHEMA must be a boolean, got '{init}'"))?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("not a flag")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();

        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.database_url, "api.db");
        assert_eq!(config.port, 5000);
        assert!(config.cors_origin.is_none());
        assert!(!config.init_schema);
    }

    #[test]
    fn overrides_from_environment() {
        let config = config(&[
            ("STORE_BACKEND", "Shelf"),
            ("SHELF_PATH", "/tmp/devices.shelf"),
            ("PORT", "8081"),
            ("CORS_ORIGIN", "http://127.0.0.1:8080"),
            ("INIT_SCHEMA", "yes"),
        ])
        .unwrap();

        assert_eq!(config.backend, Backend::Shelf);
        assert_eq!(config.shelf_path, PathBuf::from("/tmp/devices.shelf"));
        assert_eq!(config.port, 8081);
        assert_eq!(config.cors_origin.as_deref(), Some("http://127.0.0.1:8080"));
        assert!(config.init_schema);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("STORE_BACKEND", "redis")]).is_err());
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("INIT_SCHEMA", "maybe")]).is_err());
    }
}
