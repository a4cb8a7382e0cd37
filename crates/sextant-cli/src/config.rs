//! Locating and loading the TOML session configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use sextant::{SextantError, config::ModelerConfig};

/// Why a configuration file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigError> for SextantError {
    fn from(err: ConfigError) -> Self {
        SextantError::Config(err.to_string())
    }
}

/// Where a configuration file may live, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// `sextant/config.toml` relative to the working directory.
    Local,
    /// `config.toml` in the platform configuration directory.
    System,
}

impl Location {
    const SEARCH_ORDER: [Location; 2] = [Location::Local, Location::System];

    fn path(self) -> Option<PathBuf> {
        match self {
            Location::Local => Some(PathBuf::from("sextant").join("config.toml")),
            Location::System => {
                ProjectDirs::from("com", "sextant", "sextant").map(|dirs| dirs.config_dir().join("config.toml"))
            }
        }
    }
}

/// Loads the session configuration.
///
/// An explicit path must exist. Otherwise the first file found among the
/// local and the platform locations is used, and the defaults apply when
/// there is none.
///
/// # Errors
///
/// Returns [`SextantError::Config`] for a missing explicit file or a file
/// that is not valid configuration TOML.
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<ModelerConfig, SextantError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let found = Location::SEARCH_ORDER
        .into_iter()
        .filter_map(|location| location.path().map(|path| (location, path)))
        .find(|(_, path)| path.is_file());
    match found {
        Some((location, path)) => {
            info!(location:?, path = path.display().to_string(); "Loading configuration");
            load_config_file(&path)
        }
        None => {
            debug!("No configuration file found, using defaults");
            Ok(ModelerConfig::default())
        }
    }
}

fn load_config_file(path: &Path) -> Result<ModelerConfig, SextantError> {
    if !path.is_file() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()).into())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sextant::config::{LaneSelection, RootElementPolicy};

    use super::*;

    #[test]
    fn test_explicit_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[copy_paste]\nlane_selection = \"include_participant\"\n\n[history]\nmax_entries = 5"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.copy_paste().lane_selection(), LaneSelection::IncludeParticipant);
        assert_eq!(config.copy_paste().root_elements(), RootElementPolicy::CloneOnce);
        assert_eq!(config.history().max_entries(), 5);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(dir.path().join("missing.toml")));
        assert!(matches!(result, Err(SextantError::Config(_))));
    }

    #[test]
    fn test_local_location_is_searched_first() {
        assert_eq!(Location::SEARCH_ORDER[0], Location::Local);
        assert_eq!(
            Location::Local.path(),
            Some(PathBuf::from("sextant").join("config.toml"))
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[copy_paste]\nroot_elements = \"sometimes\"").unwrap();
        assert!(matches!(load_config(Some(file.path())), Err(SextantError::Config(_))));
    }
}
