use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{bail, Context};

use crate::users::password::SALT_LEN;

/// Which digest protects stored passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2,
    /// Unsalted MD5, kept for stores written by the legacy scheme.
    Md5,
}

impl FromStr for HashScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2" => Ok(Self::Argon2),
            "md5" => Ok(Self::Md5),
            other => bail!("unknown password hash scheme: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub scheme: HashScheme,
    pub salt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Deadline applied to every store call made while serving a request.
    pub query_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub db: DbConfig,
    pub password: PasswordConfig,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}: {e}")),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "APP_PORT", 8080)?;
        let listen_addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let db = DbConfig {
            url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_millis(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_MS", 3000)?),
            query_timeout: Duration::from_millis(parse_or(&lookup, "DB_QUERY_TIMEOUT_MS", 5000)?),
        };
        if db.max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be positive");
        }

        let scheme: HashScheme = parse_or(&lookup, "PASSWORD_HASH_SCHEME", HashScheme::Argon2)?;
        let salt = lookup("PASSWORD_SALT");
        if scheme == HashScheme::Argon2 {
            match salt.as_deref().map(str::len) {
                None => bail!("PASSWORD_SALT must be set for the argon2 scheme"),
                Some(len) if !SALT_LEN.contains(&len) => bail!(
                    "PASSWORD_SALT must be {} to {} bytes, got {len}",
                    SALT_LEN.start(),
                    SALT_LEN.end()
                ),
                Some(_) => {}
            }
        }

        Ok(Self {
            listen_addr,
            db,
            password: PasswordConfig { scheme, salt },
        })
    }
}
