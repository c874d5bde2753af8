//! Configuration loaded once from the environment at startup.

use std::env;
use std::str::FromStr;

/// Which store backs the expense collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Mongo,
    Memory,
}

/// How outstanding shares are grouped in `individualBalances`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceKey {
    /// Participants sharing a display name are merged.
    #[default]
    Name,
    /// Registered participants are keyed by user id, others by name.
    Identity,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Key used to verify `x-auth-token` signatures
    pub auth_secret: String,
    pub storage: Storage,
    /// Required when `storage` is `Mongo`
    pub mongodb_uri: Option<String>,
    pub database_name: String,
    pub host: String,
    pub port: u16,
    pub balance_key: BalanceKey,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let auth_secret = lookup("AUTH_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::MissingEnv("AUTH_SECRET"))?;

        let storage = lookup("STORAGE")
            .unwrap_or_else(|| "mongo".to_string())
            .parse()?;

        let mongodb_uri = lookup("MONGODB_URI");
        if storage == Storage::Mongo && mongodb_uri.is_none() {
            return Err(ConfigError::MissingEnv("MONGODB_URI"));
        }

        let database_name =
            lookup("DATABASE_NAME").unwrap_or_else(|| "ExpenseTracker".to_string());

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let balance_key = lookup("BALANCE_KEY")
            .unwrap_or_else(|| "name".to_string())
            .parse()?;

        Ok(Self {
            auth_secret,
            storage,
            mongodb_uri,
            database_name,
            host,
            port,
            balance_key,
        })
    }
}

impl FromStr for Storage {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Storage::Mongo),
            "memory" => Ok(Storage::Memory),
            _ => Err(ConfigError::InvalidValue("STORAGE")),
        }
    }
}

impl FromStr for BalanceKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "name" => Ok(BalanceKey::Name),
            "identity" | "id" => Ok(BalanceKey::Identity),
            _ => Err(ConfigError::InvalidValue("BALANCE_KEY")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("AUTH_SECRET", "s3cret"), ("MONGODB_URI", "mongodb://db")]).unwrap();
        assert_eq!(config.storage, Storage::Mongo);
        assert_eq!(config.database_name, "ExpenseTracker");
        assert_eq!(config.port, 3001);
        assert_eq!(config.balance_key, BalanceKey::Name);
    }

    #[test]
    fn secret_is_required() {
        assert!(matches!(
            load(&[("STORAGE", "memory")]),
            Err(ConfigError::MissingEnv("AUTH_SECRET"))
        ));
    }

    #[test]
    fn mongo_needs_uri_but_memory_does_not() {
        assert!(matches!(
            load(&[("AUTH_SECRET", "s")]),
            Err(ConfigError::MissingEnv("MONGODB_URI"))
        ));
        let config = load(&[("AUTH_SECRET", "s"), ("STORAGE", "memory")]).unwrap();
        assert_eq!(config.storage, Storage::Memory);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[("AUTH_SECRET", "s"), ("STORAGE", "memory"), ("PORT", "http")]),
            Err(ConfigError::InvalidValue("PORT"))
        ));
        assert!(matches!(
            load(&[("AUTH_SECRET", "s"), ("STORAGE", "memory"), ("BALANCE_KEY", "email")]),
            Err(ConfigError::InvalidValue("BALANCE_KEY"))
        ));
        let config =
            load(&[("AUTH_SECRET", "s"), ("STORAGE", "memory"), ("BALANCE_KEY", "identity")])
                .unwrap();
        assert_eq!(config.balance_key, BalanceKey::Identity);
    }
}
