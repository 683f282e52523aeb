use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/client.json";

const SERVER_URL_ENV: &str = "BITTALK_SERVER_URL";
const WS_URL_ENV: &str = "BITTALK_WS_URL";
const STORAGE_PATH_ENV: &str = "BITTALK_STORAGE_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the chat backend, e.g. `http://127.0.0.1:8000`.
    pub server_url: String,
    /// Base URL for the realtime channel. Derived from `server_url` when absent.
    pub ws_url: Option<String>,
    /// SQLite file holding the token, cached user and message snapshots.
    pub storage_path: String,
    /// Attach the bearer token to `/auth/search/` requests.
    pub authenticated_search: bool,
    /// Capacity of the UI <-> session channels.
    pub channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            ws_url: None,
            storage_path: "data/session.db".to_string(),
            authenticated_search: false,
            channel_capacity: 100,
        }
    }
}

impl AppConfig {
    pub fn http_base(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    pub fn ws_base(&self) -> String {
        if let Some(ws_url) = &self.ws_url {
            return ws_url.trim_end_matches('/').to_string();
        }
        let base = self.http_base();
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{base}")
        }
    }

    /// Environment variables (including ones loaded from `.env`) win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(SERVER_URL_ENV) {
            self.server_url = url;
        }
        if let Ok(url) = env::var(WS_URL_ENV) {
            self.ws_url = Some(url);
        }
        if let Ok(path) = env::var(STORAGE_PATH_ENV) {
            self.storage_path = path;
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    let mut config = match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    };
    config.apply_env_overrides();
    if config.channel_capacity == 0 {
        log::warn!("channel_capacity must be positive; using 1");
        config.channel_capacity = 1;
    }
    config
}
