use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use cidgate_store::{KuboClient, KuboConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_CONFIG_PATH: &str = "./config.json";
pub const DEFAULT_PORT: u16 = 8080;

/// Gatekeeper settings loaded from the config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatekeeperConfig {
    /// Accepted Basic-auth users, `user -> password`.
    pub basic_auth_users: BTreeMap<String, String>,
    /// Absolute namespace path of the root directory, without a trailing `/`.
    pub ipfs_mfs_root: String,
    pub kubo_client: KuboConfig,
}

impl GatekeeperConfig {
    /// Load and validate a config file. `.toml` files are read as TOML,
    /// everything else as JSON.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text)?,
            _ => Self::from_json_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> ServerResult<Self> {
        serde_json::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        let root = &self.ipfs_mfs_root;
        if !root.starts_with('/') {
            return Err(ServerError::Config(format!(
                "ipfsMfsRoot must be an absolute path, got '{root}'"
            )));
        }
        if root.ends_with('/') {
            return Err(ServerError::Config(format!(
                "ipfsMfsRoot must not end with '/', got '{root}'"
            )));
        }
        if self.basic_auth_users.is_empty() {
            return Err(ServerError::Config(
                "basicAuthUsers must contain at least one user".into(),
            ));
        }
        KuboClient::new(&self.kubo_client)
            .map_err(|e| ServerError::Config(format!("kuboClient: {e}")))?;
        Ok(())
    }
}

/// Config file path from `CONFIG`, falling back to `./config.json`.
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os("CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted request body, in bytes.
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Listen address from `PORT` and `ADDRESS`.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Listen address from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|e| ServerError::Config(format!("PORT '{port}': {e}")))?;
            config.bind_addr.set_port(port);
        }
        if let Some(address) = lookup("ADDRESS") {
            let ip: IpAddr = address
                .trim()
                .parse()
                .map_err(|e| ServerError::Config(format!("ADDRESS '{address}': {e}")))?;
            config.bind_addr.set_ip(ip);
        }
        Ok(config)
    }
}
