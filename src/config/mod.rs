pub mod types;

pub use types::{CertIssuerConfig, Config, OtelConfig, ScanConfig};

use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".ykubeedit.toml";

/// Get the global config file path (~/.ykubeedit.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (<scanned dir>/.ykubeedit.toml)
pub fn local_config_path(directory: &Path) -> PathBuf {
    directory.join(CONFIG_FILE_NAME)
}

/// Load configuration.
///
/// An explicit file must exist and parse. Otherwise the local config in the
/// scanned directory wins over the global one, and broken files are skipped
/// with a warning so a typo never blocks a scan.
pub fn load_config(explicit: Option<&Path>, directory: &Path) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return read_config_file(path);
    }

    let candidates = std::iter::once(local_config_path(directory)).chain(global_config_path());
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match read_config_file(&path) {
            Ok(config) => {
                log::debug!("Loaded configuration from {}", path.display());
                return Ok(config);
            }
            Err(e) => log::warn!("Ignoring configuration: {}", e),
        }
    }

    Ok(Config::default())
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParsingFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, path)
}
