//! Matches stored profiles against the outputs that are connected right now.
//!
//! Every rule criterion that is set must hold, otherwise the whole
//! profile is out. Satisfied criteria add to the score: EDID 3,
//! preferred mode 2, supported mode 1. Ties on score go to the higher
//! priority, then to the profile listed first.

use std::collections::HashSet;

use tracing::debug;

use super::hash;
use crate::model::{Profile, Rule, XrandrConnection};

#[derive(Debug, Default)]
pub struct ProfileMatcher;

impl ProfileMatcher {
    pub fn new() -> Self {
        ProfileMatcher
    }

    /// Matching profiles with their scores, best first.
    pub fn match_profiles<'p>(
        &self,
        available_profiles: &'p [Profile],
        outputs: &[XrandrConnection],
    ) -> Vec<(u32, &'p Profile)> {
        let output_names: HashSet<&str> = outputs
            .iter()
            .filter(|o| o.is_connected())
            .map(|o| o.name.as_str())
            .collect();

        let candidates: Vec<&Profile> = available_profiles
            .iter()
            .filter(|p| {
                p.match_rules()
                    .map_or(false, |rules| rules.keys().all(|name| output_names.contains(name)))
            })
            .collect();

        debug!(
            "{}/{} profiles match outputs sets",
            candidates.len(),
            available_profiles.len()
        );

        let mut matching: Vec<(u32, &Profile)> = candidates
            .into_iter()
            .filter_map(|p| self.calculate_profile_score(p, outputs).map(|score| (score, p)))
            .collect();

        // Stable, so equal (score, priority) keep their input order.
        matching.sort_by(|a, b| (b.0, b.1.priority).cmp(&(a.0, a.1.priority)));
        matching
    }

    /// The best matching profile, if any.
    pub fn find_best<'p>(
        &self,
        available_profiles: &'p [Profile],
        outputs: &[XrandrConnection],
    ) -> Option<&'p Profile> {
        let matching = self.match_profiles(available_profiles, outputs);
        let (max_score, profile) = *matching.first()?;

        debug!("Found {} profiles with maximum score {}", matching.len(), max_score);
        debug!(
            "Selected profile {} with score {} and priority {}",
            profile.name, max_score, profile.priority
        );
        Some(profile)
    }

    /// Sum of the rule scores over the live outputs. Outputs without a
    /// rule add nothing. `None` as soon as one rule fails.
    fn calculate_profile_score(&self, profile: &Profile, outputs: &[XrandrConnection]) -> Option<u32> {
        debug!("Trying profile {}", profile.name);
        let rules = profile.match_rules()?;

        let mut score = 0;
        for output in outputs {
            let s = match rules.get(&output.name) {
                Some(rule) => self.score_rule(rule, output),
                None => Some(0),
            };
            match s {
                Some(s) => {
                    debug!("{} scored {} for output {}", profile.name, s, output.name);
                    score += s;
                }
                None => {
                    debug!("{} doesn't match {}", profile.name, output.name);
                    return None;
                }
            }
        }
        debug!("{} total score: {}", profile.name, score);
        Some(score)
    }

    /// Score of a single rule against a live output. A rule without
    /// criteria scores 0 but still needs a connected display.
    fn score_rule(&self, rule: &Rule, output: &XrandrConnection) -> Option<u32> {
        let display = output.display.as_ref()?;
        let mut score = 0;

        if let Some(edid) = &rule.edid {
            if hash(display.edid.as_deref()).as_ref() != Some(edid) {
                return None;
            }
            score += 3;
        }

        if let Some(prefers) = &rule.prefers {
            if display.preferred_mode.as_ref() != Some(prefers) {
                return None;
            }
            score += 2;
        }

        if let Some(supports) = &rule.supports {
            if !display.supported_modes.contains(supports) {
                return None;
            }
            score += 1;
        }

        Some(score)
    }
}
