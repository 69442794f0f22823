//! Server Configuration

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Process-level settings; provider settings live with their clients
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bot_token: String,
    pub bind_addr: String,
    pub assets_dir: PathBuf,
    pub pending_ttl: Duration,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let Some(bot_token) = lookup("BOT_TOKEN").filter(|t| !t.is_empty()) else {
            bail!("BOT_TOKEN not set");
        };

        let bind_addr = match (lookup("BIND_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port: u16 = port.parse().with_context(|| format!("invalid PORT {port:?}"))?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_BIND_ADDR.to_string(),
        };

        Ok(Self {
            bot_token,
            bind_addr,
            assets_dir: lookup("ASSETS_DIR").map_or_else(|| PathBuf::from("assets"), PathBuf::from),
            pending_ttl: seconds(&lookup, "PENDING_TTL_SECS", DEFAULT_PENDING_TTL)?,
            sweep_interval: seconds(&lookup, "PENDING_SWEEP_SECS", DEFAULT_SWEEP_INTERVAL)?,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> anyhow::Result<Duration> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    let secs: u64 = value
        .parse()
        .with_context(|| format!("invalid {key} {value:?}"))?;
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}
