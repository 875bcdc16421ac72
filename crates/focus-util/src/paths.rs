//! Where focusd keeps its files
//!
//! Everything lives under the user's own directories; no root is needed.
//! - Socket: `$XDG_RUNTIME_DIR/focusd/focusd.sock` or `/tmp/focusd-$USER/focusd.sock`
//! - Data: `$XDG_DATA_HOME/focusd` or `~/.local/share/focusd`
//! - Config: `$XDG_CONFIG_HOME/focusd/config.toml` or `~/.config/focusd/config.toml`

use std::path::PathBuf;

/// Overrides the socket path for both the daemon and views
pub const FOCUS_SOCKET_ENV: &str = "FOCUS_SOCKET";

/// Overrides the data directory
pub const FOCUS_DATA_DIR_ENV: &str = "FOCUS_DATA_DIR";

const SOCKET_FILENAME: &str = "focusd.sock";
const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "focusd";

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// `$xdg_var/focusd`, else `$HOME/<home_fallback>/focusd`
fn xdg_app_dir(xdg_var: &str, home_fallback: &[&str]) -> Option<PathBuf> {
    if let Some(dir) = env_path(xdg_var) {
        return Some(dir.join(APP_DIR));
    }
    env_path("HOME").map(|home| {
        home_fallback
            .iter()
            .fold(home, |path, part| path.join(part))
            .join(APP_DIR)
    })
}

/// `$FOCUS_SOCKET` if set, else [`socket_path_without_env`]
pub fn default_socket_path() -> PathBuf {
    env_path(FOCUS_SOCKET_ENV).unwrap_or_else(socket_path_without_env)
}

/// The socket location ignoring `$FOCUS_SOCKET`, for config defaults
pub fn socket_path_without_env() -> PathBuf {
    if let Some(runtime_dir) = env_path("XDG_RUNTIME_DIR") {
        return runtime_dir.join(APP_DIR).join(SOCKET_FILENAME);
    }

    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, user)).join(SOCKET_FILENAME)
}

/// `$FOCUS_DATA_DIR` if set, else [`data_dir_without_env`]
pub fn default_data_dir() -> PathBuf {
    env_path(FOCUS_DATA_DIR_ENV).unwrap_or_else(data_dir_without_env)
}

pub fn data_dir_without_env() -> PathBuf {
    xdg_app_dir("XDG_DATA_HOME", &[".local", "share"])
        .unwrap_or_else(|| PathBuf::from("/tmp").join(APP_DIR).join("data"))
}

pub fn default_config_path() -> PathBuf {
    xdg_app_dir("XDG_CONFIG_HOME", &[".config"])
        .unwrap_or_else(|| PathBuf::from("/etc").join(APP_DIR))
        .join(CONFIG_FILENAME)
}
