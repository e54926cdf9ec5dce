//! Runtime configuration for Civicpulse
//!
//! Settings are layered: built-in defaults, then an optional
//! `civicpulse.toml` file, then `CIVICPULSE_*` environment variables.
//! The batch size limit lives here rather than as a hardcoded constant so
//! deployments can tune how many submissions accumulate before analysis.

use serde::Deserialize;

use crate::error::Result;

/// Service settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Path to the libSQL database file (`:memory:` for ephemeral use)
    pub database_path: String,

    /// Address the HTTP API binds to
    pub listen_addr: String,

    /// Submissions collected per (district, constituency) before a batch
    /// triggers analysis
    pub batch_limit: u32,
}

impl Settings {
    /// Load settings from defaults, optional config file, and environment
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .set_default("database_path", "civicpulse.db")?
            .set_default("listen_addr", "127.0.0.1:8080")?
            .set_default("batch_limit", 15i64)?
            .add_source(config::File::with_name("civicpulse").required(false))
            .add_source(config::Environment::with_prefix("CIVICPULSE"))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: "civicpulse.db".to_string(),
            listen_addr: "127.0.0.1:8080".to_string(),
            batch_limit: 15,
        }
    }
}
