//! config-rs/lib.rs
//! Shared configuration utilities for the dashboard service
//! Provides environment lookups for ports, bind addresses, paths and secrets

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Load variables from a `.env` file in the working directory, if one exists
///
/// # Returns
/// `true` when a `.env` file was found and loaded
pub fn load_dotenv() -> bool {
    dotenv::dotenv().is_ok()
}

/// Get a port from an environment variable with proper fallback
///
/// # Arguments
/// * `var_name` - The variable holding the port (e.g., "PORT")
/// * `default_port` - The port to use if the variable is unset or invalid
///
/// # Returns
/// The port number to listen on
pub fn get_port(var_name: &str, default_port: u16) -> u16 {
    match env::var(var_name) {
        Ok(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding the service
///
/// # Arguments
/// * `addr_var` - Variable holding a full address override (`host:port` or `http://host:port`)
/// * `port_var` - Variable holding just the port
/// * `default_port` - The port to use if neither variable is usable
///
/// # Returns
/// The address to bind, `0.0.0.0:<port>` unless overridden
pub fn get_bind_address(addr_var: &str, port_var: &str, default_port: u16) -> SocketAddr {
    if let Ok(addr_str) = env::var(addr_var) {
        if let Some(addr) = parse_socket_addr(&addr_str) {
            return addr;
        }
        log::warn!("Invalid address format in {}, using default", addr_var);
    }

    let port = get_port(port_var, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

fn parse_socket_addr(raw: &str) -> Option<SocketAddr> {
    let trimmed = raw.trim();
    if let Ok(addr) = trimmed.parse::<SocketAddr>() {
        return Some(addr);
    }

    // http://host:port form
    trimmed
        .split_once("://")
        .and_then(|(_, rest)| rest.trim_end_matches('/').parse::<SocketAddr>().ok())
}

/// Get a filesystem path from the environment
///
/// # Arguments
/// * `var_name` - The variable holding the path (e.g., "AI_EXTRACT_DATA")
/// * `default_path` - Path used when the variable is unset or blank
pub fn get_path(var_name: &str, default_path: &str) -> PathBuf {
    env::var(var_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default_path))
}

/// Get a secret from the environment
///
/// An unset or empty variable counts as "not configured".
pub fn get_secret(var_name: &str) -> Option<String> {
    match env::var(var_name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => {
            log::warn!("{} is not set; protected endpoints will reject every request", var_name);
            None
        }
    }
}
