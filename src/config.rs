use anyhow::Context;
use std::str::FromStr;

const DEFAULT_SERVER_PORT: u16 = 8080;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    server_port: u16,
}

impl Config {
    /// Reads `DATABASE_URL` (required) and `SERVER_PORT` (defaults to 8080).
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = load_var(&lookup, "DATABASE_URL")?
            .context("Missing environment variable DATABASE_URL")?;
        let server_port = load_var(&lookup, "SERVER_PORT")?.unwrap_or(DEFAULT_SERVER_PORT);
        Ok(Self {
            database_url,
            server_port,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }
}

fn load_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|val| {
            val.parse::<T>()
                .with_context(|| format!("Failed to parse environment variable {key}"))
        })
        .transpose()
}
