use std::{env, str::FromStr};

use anyhow::Context;

use crate::ledger::ShippingPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub shipping: ShippingPolicy,
    pub max_concurrent_requests: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("APP_PORT", 3000)?;

        let defaults = ShippingPolicy::default();
        let shipping = ShippingPolicy {
            flat_fee: env_or("SHIPPING_FLAT_FEE", defaults.flat_fee)?,
            free_threshold: env_or("FREE_SHIPPING_THRESHOLD", defaults.free_threshold)?,
        };
        if shipping.flat_fee < 0 || shipping.free_threshold < 0 {
            anyhow::bail!("shipping amounts must not be negative");
        }

        let max_concurrent_requests = env_or("MAX_CONCURRENT_REQUESTS", 100)?;

        Ok(Self {
            port,
            database_url,
            host,
            shipping,
            max_concurrent_requests,
        })
    }
}

/// Parses `key` when set, falls back to `default` when absent.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
