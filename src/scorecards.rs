//! Grouping of top-level scorecard images.
//!
//! Monitor-style projects write one scorecard per domain
//! (`monitor_surface_<pair>_scorecard.png`, `monitor_temp_<pair>_scorecard.png`);
//! those are folded into a single entry per comparison pair. Everything else
//! becomes a flat entry keyed by the pair name or the raw file stem.
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Scorecards keyed by display name.
pub type ScorecardMap = BTreeMap<String, ScorecardEntry>;

/// Domain slot within a paired scorecard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorecardDomain {
    Surface,
    UpperAir,
}

/// One entry under the `Scorecards` key of a project taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScorecardEntry {
    /// A single scorecard image reference.
    Single(String),
    /// Surface and upper-air scorecards for the same comparison pair.
    Pair {
        #[serde(skip_serializing_if = "Option::is_none")]
        surface: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        upper_air: Option<String>,
    },
}

impl ScorecardEntry {
    /// Set one domain slot, keeping the other. A single entry is replaced.
    fn set_slot(&mut self, domain: ScorecardDomain, reference: String) {
        if let ScorecardEntry::Single(_) = self {
            *self = ScorecardEntry::Pair {
                surface: None,
                upper_air: None,
            };
        }
        if let ScorecardEntry::Pair { surface, upper_air } = self {
            match domain {
                ScorecardDomain::Surface => *surface = Some(reference),
                ScorecardDomain::UpperAir => *upper_air = Some(reference),
            }
        }
    }
}

/// Classifies scorecard file stems into the project's scorecard map.
#[derive(Debug)]
pub struct ScorecardGrouper {
    pair_enabled: bool,
    monitor: Regex,
    flat: Regex,
}

impl ScorecardGrouper {
    /// `pair_enabled` turns on monitor-style surface/upper-air pairing.
    pub fn new(pair_enabled: bool) -> Self {
        Self {
            pair_enabled,
            monitor: Regex::new(r"^monitor_(surface|temp)_(.+)_scorecard$")
                .expect("regex for monitor scorecards"),
            flat: Regex::new(r"(?i)^scorecard_(.+)_scorecard$")
                .expect("regex for flat scorecards"),
        }
    }

    /// Record a scorecard image; unparseable names fall through to a flat entry.
    pub fn add(&self, token: &str, reference: String, scorecards: &mut ScorecardMap) {
        if self.pair_enabled {
            if let Some((domain, key)) = self.monitor_pair(token) {
                scorecards
                    .entry(key)
                    .or_insert_with(|| ScorecardEntry::Pair {
                        surface: None,
                        upper_air: None,
                    })
                    .set_slot(domain, reference);
                return;
            }
        }
        let key = self.flat_key(token);
        scorecards.insert(key, ScorecardEntry::Single(reference));
    }

    fn monitor_pair(&self, token: &str) -> Option<(ScorecardDomain, String)> {
        let caps = self.monitor.captures(token)?;
        let domain = match caps.get(1).map(|m| m.as_str()) {
            Some("temp") => ScorecardDomain::UpperAir,
            _ => ScorecardDomain::Surface,
        };
        let pair = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        Some((domain, pair.replace("_vs_", " vs. ")))
    }

    fn flat_key(&self, token: &str) -> String {
        self.flat
            .captures(token)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn add_all(grouper: &ScorecardGrouper, tokens: &[&str]) -> ScorecardMap {
        let mut map = ScorecardMap::new();
        for token in tokens {
            grouper.add(token, format!("p/plots/{token}.png"), &mut map);
        }
        map
    }

    #[test]
    fn monitor_domains_pair_under_one_key() {
        let grouper = ScorecardGrouper::new(true);
        let map = add_all(
            &grouper,
            &[
                "monitor_surface_A_vs_B_scorecard",
                "monitor_temp_A_vs_B_scorecard",
            ],
        );
        assert_eq!(map.len(), 1);
        assert_eq!(
            map["A vs. B"],
            ScorecardEntry::Pair {
                surface: Some("p/plots/monitor_surface_A_vs_B_scorecard.png".to_string()),
                upper_air: Some("p/plots/monitor_temp_A_vs_B_scorecard.png".to_string()),
            }
        );
    }

    #[test]
    fn single_domain_sets_only_its_slot() {
        let grouper = ScorecardGrouper::new(true);
        let map = add_all(&grouper, &["monitor_temp_REF_vs_candidateX_scorecard"]);
        assert_eq!(
            map["REF vs. candidateX"],
            ScorecardEntry::Pair {
                surface: None,
                upper_air: Some(
                    "p/plots/monitor_temp_REF_vs_candidateX_scorecard.png".to_string()
                ),
            }
        );
        let json = serde_json::to_value(&map).expect("serialize");
        assert_eq!(
            json["REF vs. candidateX"],
            serde_json::json!({
                "upper_air": "p/plots/monitor_temp_REF_vs_candidateX_scorecard.png"
            })
        );
    }

    #[test]
    fn existing_single_entry_is_replaced_by_a_pair() {
        let grouper = ScorecardGrouper::new(true);
        let mut map = ScorecardMap::new();
        map.insert(
            "A vs. B".to_string(),
            ScorecardEntry::Single("p/plots/A_vs_B.png".to_string()),
        );
        grouper.add(
            "monitor_temp_A_vs_B_scorecard",
            "p/plots/monitor_temp_A_vs_B_scorecard.png".to_string(),
            &mut map,
        );
        assert_eq!(
            map["A vs. B"],
            ScorecardEntry::Pair {
                surface: None,
                upper_air: Some("p/plots/monitor_temp_A_vs_B_scorecard.png".to_string()),
            }
        );
    }

    #[test]
    fn repeated_domain_overwrites_only_that_slot() {
        let grouper = ScorecardGrouper::new(true);
        let mut map = ScorecardMap::new();
        grouper.add("monitor_surface_A_vs_B_scorecard", "s1".to_string(), &mut map);
        grouper.add("monitor_temp_A_vs_B_scorecard", "u1".to_string(), &mut map);
        grouper.add("monitor_surface_A_vs_B_scorecard", "s2".to_string(), &mut map);
        assert_eq!(
            map["A vs. B"],
            ScorecardEntry::Pair {
                surface: Some("s2".to_string()),
                upper_air: Some("u1".to_string()),
            }
        );
    }

    #[test]
    fn flat_names_use_pair_segment() {
        let grouper = ScorecardGrouper::new(false);
        let map = add_all(&grouper, &["Scorecard_X_scorecard", "scorecard_Y_vs_Z_SCORECARD"]);
        assert_eq!(
            map["X"],
            ScorecardEntry::Single("p/plots/Scorecard_X_scorecard.png".to_string())
        );
        assert!(map.contains_key("Y_vs_Z"));
    }

    #[test]
    fn monitor_names_stay_flat_when_pairing_disabled() {
        let grouper = ScorecardGrouper::new(false);
        let map = add_all(&grouper, &["monitor_surface_A_vs_B_scorecard"]);
        assert_eq!(
            map["monitor_surface_A_vs_B_scorecard"],
            ScorecardEntry::Single("p/plots/monitor_surface_A_vs_B_scorecard.png".to_string())
        );
    }

    #[test]
    fn unmatched_names_use_full_token() {
        let grouper = ScorecardGrouper::new(true);
        let map = add_all(&grouper, &["my_SCORECARD_summary", "monitor_upper_A_scorecard"]);
        assert!(map.contains_key("my_SCORECARD_summary"));
        assert!(map.contains_key("monitor_upper_A_scorecard"));
    }
}
