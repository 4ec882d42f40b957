use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use rust_decimal::Decimal;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_batch_per_min: u32,

    /// Upper bound on monetizable days per reset; unbounded when unset.
    pub leave_monetization_cap: Option<Decimal>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));

        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let monetization_cap = lookup("LEAVE_MONETIZATION_CAP")
            .map(|v| parse::<Decimal>("LEAVE_MONETIZATION_CAP", &v))
            .transpose()?;
        if let Some(cap) = monetization_cap {
            anyhow::ensure!(
                cap >= Decimal::ZERO,
                "LEAVE_MONETIZATION_CAP must be a non-negative number"
            );
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: or_default("API_PREFIX", "/api"),
            log_dir: or_default("LOG_DIR", "logs"),
            db_max_connections: parse(
                "DB_MAX_CONNECTIONS",
                &or_default("DB_MAX_CONNECTIONS", "10"),
            )?,
            rate_protected_per_min: parse(
                "RATE_PROTECTED_PER_MIN",
                &or_default("RATE_PROTECTED_PER_MIN", "1000"),
            )?,
            rate_batch_per_min: parse(
                "RATE_BATCH_PER_MIN",
                &or_default("RATE_BATCH_PER_MIN", "6"),
            )?,
            leave_monetization_cap: monetization_cap,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {value:?}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use rust_decimal_macros::dec;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://hr:hr@localhost/hr"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.rate_protected_per_min, 1000);
        assert_eq!(config.rate_batch_per_min, 6);
        assert_eq!(config.leave_monetization_cap, None);
    }

    #[test]
    fn missing_required_value_names_the_key() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RATE_BATCH_PER_MIN", "six"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LEAVE_MONETIZATION_CAP", "-1"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn monetization_cap_is_read() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LEAVE_MONETIZATION_CAP", "10.5"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.leave_monetization_cap, Some(dec!(10.5)));
    }
}
