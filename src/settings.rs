use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the `sqlite3` database file.
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// A `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Settings {
    /// Loads the settings from, in increasing priority: built-in defaults, an optional
    /// `config.toml` in the working directory, `ROSTER__SECTION__KEY` environment variables, and
    /// `DATABASE_URL` (which may come from a `.env` file).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .set_default("database.url", "roster.sqlite3")?
            .set_default("log.filter", "therapy_roster=info")?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("ROSTER").separator("__"))
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
