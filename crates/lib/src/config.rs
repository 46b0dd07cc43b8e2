//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.contact/config.json`) and environment.

use crate::model::User;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// SMS gateway the router posts to.
    #[serde(default)]
    pub router: RouterConfig,

    /// Site recorded on mass texts (multi-site deployments). None when single-site.
    #[serde(default)]
    pub site_id: Option<u32>,

    /// Operators known to this deployment.
    #[serde(default)]
    pub users: Vec<User>,

    /// Username -> capability codes (e.g. "contact.can_message").
    #[serde(default)]
    pub permissions: HashMap<String, Vec<String>>,

    /// Where the contact store snapshot lives.
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP SMS gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    /// Send URL (default "http://127.0.0.1:13013/send").
    #[serde(default = "default_router_url")]
    pub url: String,

    /// Backend name the gateway is registered under; unregistered backends fall back to it.
    #[serde(default = "default_router_backend")]
    pub backend: String,

    /// Bearer token for the gateway. Overridden by CONTACT_ROUTER_TOKEN env.
    pub token: Option<String>,
}

fn default_router_url() -> String {
    "http://127.0.0.1:13013/send".to_string()
}

fn default_router_backend() -> String {
    "default".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            url: default_router_url(),
            backend: default_router_backend(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Snapshot JSON path. Relative paths resolve against the config file's parent.
    /// Default: `store.json` next to the config file.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

/// Resolve the router token: env CONTACT_ROUTER_TOKEN overrides config.
pub fn resolve_router_token(config: &Config) -> Option<String> {
    std::env::var("CONTACT_ROUTER_TOKEN")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .router
                .token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Look up an operator by username. Unknown names get an unauthenticated user.
pub fn resolve_user(config: &Config, username: &str) -> User {
    config
        .users
        .iter()
        .find(|u| u.username == username)
        .cloned()
        .unwrap_or_else(|| User {
            username: username.to_string(),
            ..User::anonymous()
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CONTACT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".contact").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Resolve the store snapshot path against the config file's directory.
pub fn resolve_snapshot_path(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.store.snapshot {
        Some(p) if !p.as_os_str().is_empty() => {
            if p.is_absolute() {
                p.clone()
            } else {
                config_parent.join(p)
            }
        }
        _ => config_parent.join("store.json"),
    }
}
