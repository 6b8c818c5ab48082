//! Dashboard settings read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const STORE_PATH_VAR: &str = "AI_EXTRACT_DATA";
pub const API_KEY_VAR: &str = "API_KEY";
pub const PORT_VAR: &str = "PORT";
pub const ADDR_VAR: &str = "DASHBOARD_ADDR";

pub const DEFAULT_STORE_PATH: &str = "/tmp/data.json";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// JSON file holding every recorded event
    pub store_path: PathBuf,
    /// Shared secret for the protected endpoints; `None` rejects every request
    pub api_key: Option<String>,
    pub bind_addr: SocketAddr,
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self {
            store_path: config_rs::get_path(STORE_PATH_VAR, DEFAULT_STORE_PATH),
            api_key: config_rs::get_secret(API_KEY_VAR),
            bind_addr: config_rs::get_bind_address(ADDR_VAR, PORT_VAR, DEFAULT_PORT),
        }
    }
}
