//! Config discovery.
//!
//! Looks for `config.toml` (or the older `config.yaml`) in
//! `$XDG_CONFIG_HOME/randrctl`, then `/etc/randrctl`. The first one that
//! parses decides where profiles are written.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::hooks::HooksConfig;

pub const CONFIG_NAME: &str = "config.toml";
pub const YAML_CONFIG_NAME: &str = "config.yaml";
pub const PROFILE_DIR_NAME: &str = "profiles";
pub const APP_DIR: &str = "randrctl";
pub const SYS_CONFIG_DIR: &str = "/etc/randrctl";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hooks: HooksConfig,
}

/// Config directories in priority order.
pub fn default_config_dirs() -> Vec<PathBuf> {
    let mut config_dirs: Vec<PathBuf> = dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .into_iter()
        .collect();
    config_dirs.push(PathBuf::from(SYS_CONFIG_DIR));
    config_dirs
}

/// Parse the config in `dir`, `config.toml` first, then `config.yaml`.
/// Missing, unreadable or invalid files give `None`, the latter two with
/// a warning.
pub fn read_config(dir: &Path) -> Option<Config> {
    [CONFIG_NAME, YAML_CONFIG_NAME].into_iter().find_map(|name| {
        let path = dir.join(name);
        if !path.is_file() {
            return None;
        }
        debug!("reading configuration from {}", path.display());
        let content = fs::read_to_string(&path)
            .map_err(|e| warn!("error reading configuration file {}: {}", path.display(), e))
            .ok()?;
        let parsed = if name == YAML_CONFIG_NAME {
            serde_yaml::from_str::<Config>(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str::<Config>(&content).map_err(|e| e.to_string())
        };
        parsed
            .map_err(|e| warn!("error reading configuration file {}: {}", path.display(), e))
            .ok()
    })
}

/// Every directory that holds a valid config, with that config.
pub fn configs(config_dirs: &[PathBuf]) -> impl Iterator<Item = (PathBuf, Config)> + '_ {
    config_dirs
        .iter()
        .filter_map(|dir| read_config(dir).map(|config| (dir.clone(), config)))
}

/// Resolved locations and settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub config: Config,
    pub primary_config_dir: PathBuf,
    pub profile_read_locations: Vec<PathBuf>,
    pub profile_write_location: PathBuf,
}

impl Context {
    /// The first valid config wins. Without one the first directory is
    /// used with defaults. Profiles are read from every directory,
    /// primary first.
    pub fn load(config_dirs: &[PathBuf]) -> Self {
        let (primary_config_dir, config) = configs(config_dirs).next().unwrap_or_else(|| {
            let first = config_dirs
                .first()
                .cloned()
                .unwrap_or_else(|| PathBuf::from(SYS_CONFIG_DIR));
            (first, Config::default())
        });

        let mut profile_read_locations = vec![primary_config_dir.join(PROFILE_DIR_NAME)];
        for dir in config_dirs {
            let location = dir.join(PROFILE_DIR_NAME);
            if !profile_read_locations.contains(&location) {
                profile_read_locations.push(location);
            }
        }

        Context {
            config,
            profile_write_location: primary_config_dir.join(PROFILE_DIR_NAME),
            primary_config_dir,
            profile_read_locations,
        }
    }
}
