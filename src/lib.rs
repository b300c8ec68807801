//! Profile based screen manager for X11.
//!
//! Screen layouts are stored as named profiles and applied through
//! xrandr, either by name or by matching the connected displays.

pub mod config;
pub mod ctl;
pub mod error;
pub mod hooks;
pub mod model;
pub mod orientation;
pub mod profile;
pub mod xrandr;
