//! Error types for randrctl
//!
//! Everything the library can fail with ends up here, so the
//! binary only has to log one type.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid profile {location}: {reason}")]
    InvalidProfile { location: String, reason: String },

    #[error("No such profile: {name}. Searched in: {}", display_locations(.locations))]
    NoSuchProfile {
        name: String,
        locations: Vec<PathBuf>,
    },

    #[error("Unable to parse xrandr output for {name} (status: {status}, state: {state})")]
    Parse {
        name: String,
        status: String,
        state: String,
    },

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("xrandr failed: {message} (args: {})", .args.join(" "))]
    Xrandr { message: String, args: Vec<String> },

    #[error("Unable to serialize profile: {0}")]
    Serialize(String),

    #[error("Underlying I/O error")]
    IOError(#[from] std::io::Error),
}

fn display_locations(locations: &[PathBuf]) -> String {
    locations
        .iter()
        .map(|l| l.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
