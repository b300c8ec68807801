//! Callbacks around a profile switch.

use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::Profile;

/// Called around every apply, in the order prior_switch, then either
/// post_switch or post_fail. Implementations must not fail the switch.
pub trait SwitchHooks {
    fn prior_switch(&self, profile: &Profile);
    fn post_switch(&self, profile: &Profile);
    fn post_fail(&self, profile: &Profile, err: &str);
}

/// `[hooks]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HooksConfig {
    pub prior_switch: Option<String>,
    pub post_switch: Option<String>,
    pub post_fail: Option<String>,
}

/// Runs configured shell commands with `randr_profile` (and `randr_error`
/// on failure) in their environment.
#[derive(Debug, Default)]
pub struct ShellHooks {
    config: HooksConfig,
}

impl ShellHooks {
    pub fn new(config: HooksConfig) -> Self {
        ShellHooks { config }
    }

    fn run(&self, hook: &Option<String>, profile: &Profile, err: Option<&str>) {
        let hook = match hook.as_deref().map(str::trim) {
            Some(hook) if !hook.is_empty() => hook,
            _ => return,
        };

        debug!("Calling '{}'", hook);
        let mut command = Command::new("sh");
        command.arg("-c").arg(hook).env("randr_profile", &profile.name);
        if let Some(err) = err {
            command.env("randr_error", err);
        }
        match command.status() {
            Ok(status) if !status.success() => {
                warn!("Hook '{}' exited with {}", hook, status);
            }
            Ok(_) => {}
            Err(e) => warn!("Error while executing hook '{}': {}", hook, e),
        }
    }
}

impl SwitchHooks for ShellHooks {
    fn prior_switch(&self, profile: &Profile) {
        self.run(&self.config.prior_switch, profile, None);
    }

    fn post_switch(&self, profile: &Profile) {
        self.run(&self.config.post_switch, profile, None);
    }

    fn post_fail(&self, profile: &Profile, err: &str) {
        self.run(&self.config.post_fail, profile, Some(err));
    }
}
