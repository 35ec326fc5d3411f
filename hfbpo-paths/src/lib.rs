//! XDG Base Directory paths for hfbpo.
//!
//! The decision process keeps its config next to other CLI tools and its
//! learned bandit state under the user's data directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "hfbpo";

/// File name of the persisted bandit beliefs inside [`data_dir`].
pub const STATE_FILE: &str = "bandit_state.json";

/// Get the hfbpo config directory.
///
/// Returns `$XDG_CONFIG_HOME/hfbpo` if set, otherwise `~/.config/hfbpo`.
///
/// # Examples
///
/// ```
/// use hfbpo_paths::config_dir;
///
/// let config_file = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_CONFIG_HOME"),
        dirs::home_dir().as_deref(),
        ".config",
    )
}

/// Get the hfbpo data directory.
///
/// Returns `$XDG_DATA_HOME/hfbpo` if set, otherwise `~/.local/share/hfbpo`.
/// The bandit state file and the default corpus directory live here.
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_DATA_HOME"),
        dirs::home_dir().as_deref(),
        ".local/share",
    )
}

/// Default location of the persisted bandit state.
pub fn state_path() -> PathBuf {
    data_dir().join(STATE_FILE)
}

/// Default location of the prebuilt corpus artifacts.
pub fn corpus_dir() -> PathBuf {
    data_dir().join("corpus")
}

// An empty XDG variable counts as unset
fn resolve(xdg: Option<OsString>, home: Option<&Path>, home_relative: &str) -> PathBuf {
    let base = match (xdg.filter(|v| !v.is_empty()), home) {
        (Some(xdg), _) => PathBuf::from(xdg),
        (None, Some(home)) => home.join(home_relative),
        (None, None) => PathBuf::from(home_relative),
    };
    base.join(APP_DIR)
}
