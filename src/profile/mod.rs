//! Profile storage.
//!
//! Profiles live one per file in a list of directories. The file name is
//! the profile name; the content is a TOML (or JSON) document.

pub mod matcher;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{NamedMap, Output, Profile, Rule, XrandrConnection};

pub use matcher::ProfileMatcher;

/// Document format used when writing or printing a profile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Toml,
    Json,
}

/// Fingerprint stored in rules instead of the raw EDID.
pub fn hash(edid: Option<&str>) -> Option<String> {
    let edid = edid.filter(|e| !e.is_empty())?;
    Some(format!("{:x}", Md5::digest(edid.as_bytes())))
}

/// Read a profile document. JSON is recognised by its leading `{`;
/// anything else is TOML, or YAML as written by older releases.
pub fn deserialize(name: &str, location: &str, content: &str) -> Result<Profile> {
    let invalid = |reason: String| Error::InvalidProfile {
        location: location.to_string(),
        reason,
    };

    let mut profile: Profile = if content.trim_start().starts_with('{') {
        serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?
    } else {
        toml::from_str(content).or_else(|toml_err| {
            serde_yaml::from_str(content)
                .map_err(|yaml_err| invalid(format!("{} (as YAML: {})", toml_err, yaml_err)))
        })?
    };
    profile.name = name.to_string();
    Ok(profile)
}

pub fn serialize(profile: &Profile, format: Format) -> Result<String> {
    match format {
        Format::Toml => toml::to_string(profile).map_err(|e| Error::Serialize(e.to_string())),
        Format::Json => {
            serde_json::to_string_pretty(profile).map_err(|e| Error::Serialize(e.to_string()))
        }
    }
}

pub struct ProfileManager {
    read_locations: Vec<PathBuf>,
    write_location: PathBuf,
}

impl ProfileManager {
    /// Locations that are not directories are ignored for reading.
    pub fn new(read_locations: Vec<PathBuf>, write_location: PathBuf) -> Self {
        ProfileManager {
            read_locations: read_locations.into_iter().filter(|l| l.is_dir()).collect(),
            write_location,
        }
    }

    /// Every readable profile. Files within a location come in file name
    /// order; a name already read from an earlier location wins.
    /// Unreadable files are skipped with a warning.
    pub fn read_all(&self) -> Vec<Profile> {
        let mut profiles = Vec::new();
        let mut seen = HashSet::new();

        for location in &self.read_locations {
            for path in list_files(location) {
                match self.read_file(&path) {
                    Ok(profile) if seen.contains(&profile.name) => {
                        debug!("{} is shadowed by a profile of the same name", path.display());
                    }
                    Ok(profile) => {
                        seen.insert(profile.name.clone());
                        profiles.push(profile);
                    }
                    Err(e) => warn!("{}", e),
                }
            }
        }
        profiles
    }

    pub fn read_one(&self, profile_name: &str) -> Result<Profile> {
        self.read_locations
            .iter()
            .map(|location| location.join(profile_name))
            .find(|path| path.is_file())
            .map(|path| self.read_file(&path))
            .unwrap_or_else(|| {
                Err(Error::NoSuchProfile {
                    name: profile_name.to_string(),
                    locations: self.read_locations.clone(),
                })
            })
    }

    pub fn read_file(&self, path: &Path) -> Result<Profile> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = fs::read_to_string(path)?;
        deserialize(&name, &path.display().to_string(), &content)
    }

    /// Write the profile into the write location, creating it if needed.
    /// Only the last path component of the name is used as file name.
    pub fn write(&self, profile: &Profile, format: Format) -> Result<PathBuf> {
        let safe_name = Path::new(&profile.name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidProfile {
                location: profile.name.clone(),
                reason: "profile name is not a valid file name".to_string(),
            })?;

        fs::create_dir_all(&self.write_location)?;
        let path = self.write_location.join(&safe_name);
        if safe_name != profile.name {
            warn!("Illegal name provided. Writing as {}", path.display());
        }
        fs::write(&path, serialize(profile, format)?)?;
        Ok(path)
    }

    /// Snapshot the active outputs into a new profile, with a rule per
    /// output built from its EDID, preferred mode and current mode.
    pub fn profile_from_xrandr(&self, connections: &[XrandrConnection], profile_name: &str) -> Profile {
        let mut outputs = NamedMap::new();
        let mut rules = NamedMap::new();
        let mut primary = None;

        for connection in connections {
            let (output, display) = match (Output::from_connection(connection), &connection.display) {
                (Some(output), Some(display)) => (output, display),
                _ => continue,
            };
            if connection.primary {
                primary = Some(connection.name.clone());
            }
            outputs.insert(connection.name.clone(), output);
            rules.insert(
                connection.name.clone(),
                Rule {
                    edid: hash(display.edid.as_deref()),
                    prefers: display.preferred_mode.clone(),
                    supports: display.mode.clone(),
                },
            );
        }

        debug!(
            "Extracted {} outputs from {} xrandr connections",
            outputs.len(),
            connections.len()
        );

        let mut profile = Profile::new(profile_name, outputs);
        profile.rules = Some(rules);
        profile.primary = primary;
        profile
    }
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Vec<PathBuf> {
    let pattern = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join("*");
    match glob::glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect(),
        Err(e) => {
            warn!("Unable to list {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}
