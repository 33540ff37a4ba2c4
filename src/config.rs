use anyhow::Context;
use serde::Deserialize;

use crate::password::argon2_params;

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub work_factor: u32,
    pub memory_kib: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            work_factor: 2,
            memory_kib: 19_456,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub password: PasswordConfig,
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Fails on Argon2 settings
    /// the hasher could not use.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            work_factor: parse(&var, "PASSWORD_WORK_FACTOR").unwrap_or(defaults.work_factor),
            memory_kib: parse(&var, "PASSWORD_MEMORY_KIB").unwrap_or(defaults.memory_kib),
        };
        argon2_params(password.memory_kib, password.work_factor).context("argon2 parameters")?;
        Ok(Self {
            database_url,
            max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            password,
        })
    }
}

fn parse<T, F>(var: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key).and_then(|v| v.parse::<T>().ok())
}
