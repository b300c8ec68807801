//! Ties the profile store, the matcher, the display backend and the
//! hooks together. Each method is one user-facing command.

use tracing::{debug, warn};

use crate::error::Result;
use crate::hooks::SwitchHooks;
use crate::model::Profile;
use crate::profile::{Format, ProfileManager, ProfileMatcher};
use crate::xrandr::DisplayBackend;

/// Which parts of the live setup end up in a dumped profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    pub include_supports_rule: bool,
    pub include_preferred_rule: bool,
    pub include_edid_rule: bool,
    pub include_refresh_rate: bool,
    pub priority: i32,
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            include_supports_rule: true,
            include_preferred_rule: true,
            include_edid_rule: true,
            include_refresh_rate: true,
            priority: crate::model::DEFAULT_PRIORITY,
        }
    }
}

pub struct RandrCtl<B, H> {
    profile_manager: ProfileManager,
    backend: B,
    hooks: H,
}

impl<B: DisplayBackend, H: SwitchHooks> RandrCtl<B, H> {
    pub fn new(profile_manager: ProfileManager, backend: B, hooks: H) -> Self {
        RandrCtl {
            profile_manager,
            backend,
            hooks,
        }
    }

    fn apply(&self, profile: &Profile) -> Result<()> {
        self.hooks.prior_switch(profile);
        match self.backend.apply(profile) {
            Ok(()) => {
                self.hooks.post_switch(profile);
                Ok(())
            }
            Err(err) => {
                self.hooks.post_fail(profile, &err.to_string());
                Err(err)
            }
        }
    }

    /// Apply a profile by name.
    pub fn switch_to(&self, profile_name: &str) -> Result<()> {
        let profile = self.profile_manager.read_one(profile_name)?;
        self.apply(&profile)
    }

    /// Apply the best matching profile. Returns its name, or `None` when
    /// nothing matches, which is not an error.
    pub fn switch_auto(&self) -> Result<Option<String>> {
        let profiles = self.profile_manager.read_all();
        let outputs = self.backend.get_connected_outputs()?;

        match ProfileMatcher::new().find_best(&profiles, &outputs) {
            Some(profile) => {
                self.apply(profile)?;
                Ok(Some(profile.name.clone()))
            }
            None => {
                warn!("No matching profile found");
                Ok(None)
            }
        }
    }

    /// Snapshot the live setup as a profile. With `to_file` it is also
    /// written to the profile store in `format`.
    pub fn dump_current(
        &self,
        name: &str,
        options: DumpOptions,
        to_file: Option<Format>,
    ) -> Result<Profile> {
        let connections = self.backend.get_connected_outputs()?;
        let mut profile = self.profile_manager.profile_from_xrandr(&connections, name);
        profile.priority = options.priority;

        if !(options.include_edid_rule || options.include_supports_rule || options.include_preferred_rule) {
            profile.rules = None;
        } else if let Some(rules) = profile.rules.as_mut() {
            for rule in rules.values_mut() {
                if !options.include_supports_rule {
                    rule.supports = None;
                }
                if !options.include_preferred_rule {
                    rule.prefers = None;
                }
                if !options.include_edid_rule {
                    rule.edid = None;
                }
            }
        }

        if !options.include_refresh_rate {
            for output in profile.outputs.values_mut() {
                output.rate = None;
            }
        }

        if let Some(format) = to_file {
            let path = self.profile_manager.write(&profile, format)?;
            debug!("Profile {} written to {}", profile.name, path.display());
        }
        Ok(profile)
    }

    pub fn show(&self, name: &str) -> Result<Profile> {
        self.profile_manager.read_one(name)
    }

    pub fn list_all(&self) -> Vec<String> {
        self.profile_manager.read_all().into_iter().map(|p| p.name).collect()
    }

    pub fn list_all_long(&self) -> Vec<Profile> {
        self.profile_manager.read_all()
    }

    /// Profiles matching the connected outputs, best first.
    pub fn list_all_scored(&self) -> Result<Vec<(u32, Profile)>> {
        let profiles = self.profile_manager.read_all();
        let outputs = self.backend.get_connected_outputs()?;

        Ok(ProfileMatcher::new()
            .match_profiles(&profiles, &outputs)
            .into_iter()
            .map(|(score, p)| (score, p.clone()))
            .collect())
    }
}
