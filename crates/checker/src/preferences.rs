use std::collections::BTreeMap;

use cadence_protocol::Preference;
use serde::{Deserialize, Serialize};

/// What to do with preferences that lost a conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruningPolicy {
    /// Report conflicts, keep every preference.
    #[default]
    ReportOnly,
    /// Report conflicts and drop the losers.
    AutoPrune,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceConflict {
    pub aspect: String,
    /// Id of the preference that wins.
    pub kept: String,
    /// Id of the preference that loses.
    pub overridden: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceResolution {
    pub resolved: Vec<Preference>,
    pub conflicts: Vec<PreferenceConflict>,
}

/// Resolve preferences that disagree on the same aspect.
///
/// Higher weight wins; on equal weight the later preference wins. Preferences
/// agreeing with the winner are never reported.
pub fn resolve_preferences(preferences: &[Preference], policy: PruningPolicy) -> PreferenceResolution {
    let mut by_aspect: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, pref) in preferences.iter().enumerate() {
        by_aspect
            .entry(pref.aspect.trim().to_lowercase())
            .or_default()
            .push(i);
    }

    let mut conflicts = Vec::new();
    let mut losers = vec![false; preferences.len()];

    for (aspect, members) in &by_aspect {
        if members.len() < 2 {
            continue;
        }
        // `>=` lets later entries take ties
        let winner = members.iter().copied().fold(members[0], |best, i| {
            if preferences[i].weight >= preferences[best].weight {
                i
            } else {
                best
            }
        });
        let kept = &preferences[winner];

        for &i in members {
            let other = &preferences[i];
            if i == winner || other.value.eq_ignore_ascii_case(&kept.value) {
                continue;
            }
            losers[i] = true;
            conflicts.push(PreferenceConflict {
                aspect: aspect.clone(),
                kept: kept.id.clone(),
                overridden: other.id.clone(),
                explanation: format!(
                    "{aspect}: '{}' (weight {}) overrides '{}' (weight {})",
                    kept.value, kept.weight, other.value, other.weight
                ),
            });
        }
    }

    let resolved = preferences
        .iter()
        .zip(&losers)
        .filter(|(_, lost)| policy == PruningPolicy::ReportOnly || !**lost)
        .map(|(pref, _)| pref.clone())
        .collect();

    if !conflicts.is_empty() {
        log::debug!(
            "Preference conflicts: {} ({:?})",
            conflicts.len(),
            policy
        );
    }

    PreferenceResolution {
        resolved,
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pref(id: &str, aspect: &str, value: &str, weight: f32) -> Preference {
        Preference {
            id: id.into(),
            aspect: aspect.into(),
            value: value.into(),
            weight,
        }
    }

    #[test]
    fn heavier_preference_wins() {
        let prefs = vec![
            pref("p1", "reverb", "plate", 2.0),
            pref("p2", "reverb", "hall", 1.0),
        ];
        let resolution = resolve_preferences(&prefs, PruningPolicy::AutoPrune);
        assert_eq!(resolution.conflicts.len(), 1);
        assert_eq!(resolution.conflicts[0].kept, "p1");
        assert_eq!(resolution.conflicts[0].overridden, "p2");
        assert_eq!(resolution.resolved, vec![prefs[0].clone()]);
    }

    #[test]
    fn later_preference_wins_ties() {
        let prefs = vec![
            pref("p1", "Reverb", "plate", 1.0),
            pref("p2", "reverb", "hall", 1.0),
        ];
        let resolution = resolve_preferences(&prefs, PruningPolicy::AutoPrune);
        assert_eq!(resolution.conflicts[0].kept, "p2");
        assert_eq!(resolution.resolved, vec![prefs[1].clone()]);
    }

    #[test]
    fn report_only_keeps_everything() {
        let prefs = vec![
            pref("p1", "reverb", "plate", 1.0),
            pref("p2", "reverb", "hall", 1.0),
            pref("p3", "delay", "ping-pong", 1.0),
        ];
        let resolution = resolve_preferences(&prefs, PruningPolicy::default());
        assert_eq!(resolution.conflicts.len(), 1);
        assert_eq!(resolution.resolved, prefs);
    }

    #[test]
    fn agreeing_preferences_are_not_conflicts() {
        let prefs = vec![
            pref("p1", "reverb", "plate", 1.0),
            pref("p2", "reverb", "Plate", 3.0),
        ];
        let resolution = resolve_preferences(&prefs, PruningPolicy::AutoPrune);
        assert!(resolution.conflicts.is_empty());
        assert_eq!(resolution.resolved.len(), 2);
    }
}
