//! Category and variable navigation over a discovered taxonomy.
//!
//! Known project types declare their categories up front (a static map);
//! anything else gets categories inferred from variable names. Both go
//! through [`CategoryStrategy`] so callers never branch on the scheme.
use crate::discovery::{Taxonomy, SCORECARDS_KEY};
use crate::labels::{code_of, UPPER_AIR_PREFIX};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Surface/vertical filter applied to a category's variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Surface,
    Vertical,
    #[default]
    Any,
}

impl Orientation {
    fn accepts(&self, variable: &str) -> bool {
        match self {
            Orientation::Surface => !is_vertical(variable),
            Orientation::Vertical => is_vertical(variable),
            Orientation::Any => true,
        }
    }
}

/// A statically declared category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Plot-type prefix a variable must have to appear in this category.
    pub plot_type: String,
    #[serde(default)]
    pub orientation: Orientation,
}

/// Navigation settings for one project type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProjectProfile {
    /// Exact project name this profile applies to.
    pub id: String,
    /// Project names starting with this prefix also use the profile.
    #[serde(default)]
    pub match_prefix: Option<String>,
    /// Fold monitor-style surface/upper-air scorecards into pairs.
    #[serde(default)]
    pub pair_scorecards: bool,
    /// Declared categories; empty means categories are inferred.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Display priority of variable codes.
    #[serde(default)]
    pub variable_order: Vec<String>,
}

/// All configured profiles, looked up by project name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectProfiles {
    profiles: Vec<ProjectProfile>,
}

impl ProjectProfiles {
    pub fn new(profiles: Vec<ProjectProfile>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &[ProjectProfile] {
        &self.profiles
    }

    /// Exact id match first, then the longest matching prefix.
    pub fn profile_for(&self, project: &str) -> Option<&ProjectProfile> {
        if let Some(profile) = self.profiles.iter().find(|profile| profile.id == project) {
            return Some(profile);
        }
        self.profiles
            .iter()
            .filter_map(|profile| {
                let prefix = profile.match_prefix.as_deref()?;
                project.starts_with(prefix).then_some((prefix.len(), profile))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, profile)| profile)
    }

    pub fn strategy_for(&self, project: &str) -> CategoryStrategy<'_> {
        match self.profile_for(project) {
            Some(profile) if !profile.categories.is_empty() => CategoryStrategy::StaticMap {
                categories: &profile.categories,
                variable_order: &profile.variable_order,
            },
            Some(profile) => CategoryStrategy::SubstringInferred {
                variable_order: &profile.variable_order,
            },
            None => CategoryStrategy::SubstringInferred {
                variable_order: &[],
            },
        }
    }
}

/// Profiles used when no profiles file is configured.
pub fn builtin_profiles() -> ProjectProfiles {
    let category = |id: &str, label: &str, plot_type: &str, orientation| Category {
        id: id.to_string(),
        label: Some(label.to_string()),
        plot_type: plot_type.to_string(),
        orientation,
    };
    let monitor = ProjectProfile {
        id: "monitor".to_string(),
        match_prefix: Some("monitor".to_string()),
        pair_scorecards: true,
        categories: vec![
            category(
                "surface_lead_time",
                "Surface: lead time",
                "lead_time_series",
                Orientation::Surface,
            ),
            category(
                "surface_vt_hour",
                "Surface: valid hour",
                "vt_hour_series",
                Orientation::Surface,
            ),
            category(
                "upper_air_profile",
                "Upper air: profiles",
                "profile",
                Orientation::Vertical,
            ),
            category(
                "upper_air_lead_time",
                "Upper air: lead time",
                "lead_time_series",
                Orientation::Vertical,
            ),
            category(
                "upper_air_vt_hour",
                "Upper air: valid hour",
                "vt_hour_series",
                Orientation::Vertical,
            ),
        ],
        variable_order: [
            "PS", "T2M", "TD2M", "RH2M", "S10M", "D10M", "PE1", "CH", "VI", "TT", "TD", "RH",
            "QQ", "FF", "DD", "Z",
        ]
        .iter()
        .map(|code| code.to_string())
        .collect(),
    };
    let obsver = ProjectProfile {
        id: "obsver".to_string(),
        match_prefix: Some("obsver".to_string()),
        pair_scorecards: false,
        categories: vec![
            category("profile", "Profiles", "profile", Orientation::Any),
            category("timeseries", "Time series", "timeseries", Orientation::Any),
        ],
        variable_order: Vec::new(),
    };
    ProjectProfiles::new(vec![monitor, obsver])
}

/// How a project's categories are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStrategy<'a> {
    StaticMap {
        categories: &'a [Category],
        variable_order: &'a [String],
    },
    SubstringInferred {
        variable_order: &'a [String],
    },
}

impl CategoryStrategy<'_> {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryStrategy::StaticMap { .. } => "static_map",
            CategoryStrategy::SubstringInferred { .. } => "substring_inferred",
        }
    }

    fn variable_order(&self) -> &[String] {
        match *self {
            CategoryStrategy::StaticMap { variable_order, .. } => variable_order,
            CategoryStrategy::SubstringInferred { variable_order } => variable_order,
        }
    }
}

/// A variable key is vertical iff it carries the upper-air prefix.
pub fn is_vertical(variable: &str) -> bool {
    variable.starts_with(UPPER_AIR_PREFIX)
}

/// Category inferred from substrings of a variable key.
pub fn infer_category(variable: &str) -> &'static str {
    if variable.contains("profile") {
        "profile"
    } else if variable.contains("timeseries") {
        "timeseries"
    } else if variable.contains("temp") {
        "upper_air"
    } else {
        "surface"
    }
}

fn inferred_label(id: &str) -> &'static str {
    match id {
        "profile" => "Profiles",
        "timeseries" => "Time series",
        "upper_air" => "Upper air",
        _ => "Surface",
    }
}

fn is_reserved_key(key: &str) -> bool {
    key == SCORECARDS_KEY || key.starts_with('_')
}

/// Default selection for the initial view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultSelection {
    pub category: String,
    pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableSummary {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub id: String,
    pub label: String,
    pub variables: Vec<VariableSummary>,
}

/// Serializable navigation view of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationSummary {
    pub project: String,
    pub strategy: String,
    pub categories: Vec<CategorySummary>,
    pub default: Option<DefaultSelection>,
}

/// Answers category/variable queries for one project's taxonomy.
pub struct CategoryNavigator<'a> {
    taxonomy: &'a Taxonomy,
    strategy: CategoryStrategy<'a>,
}

impl<'a> CategoryNavigator<'a> {
    pub fn new(taxonomy: &'a Taxonomy, strategy: CategoryStrategy<'a>) -> Self {
        Self { taxonomy, strategy }
    }

    pub fn for_project(
        taxonomy: &'a Taxonomy,
        profiles: &'a ProjectProfiles,
        project: &str,
    ) -> Self {
        Self::new(taxonomy, profiles.strategy_for(project))
    }

    /// Display label of a variable, falling back to its key.
    pub fn label_of<'k>(&'k self, variable: &'k str) -> &'k str {
        self.taxonomy
            .var_labels
            .get(variable)
            .map(String::as_str)
            .unwrap_or(variable)
    }

    /// Category ids in priority order; `Scorecards` is always last.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = match self.strategy {
            CategoryStrategy::StaticMap { categories, .. } => {
                categories.iter().map(|category| category.id.clone()).collect()
            }
            CategoryStrategy::SubstringInferred { .. } => {
                let mut ids: Vec<String> = self
                    .navigable_variables()
                    .map(|variable| infer_category(variable).to_string())
                    .collect();
                ids.sort();
                ids.dedup();
                ids
            }
        };
        if self.taxonomy.has_scorecards() {
            categories.push(SCORECARDS_KEY.to_string());
        }
        categories
    }

    /// Display label for a category id.
    pub fn category_label(&self, id: &str) -> String {
        if id == SCORECARDS_KEY {
            return SCORECARDS_KEY.to_string();
        }
        match self.strategy {
            CategoryStrategy::StaticMap { categories, .. } => categories
                .iter()
                .find(|category| category.id == id)
                .and_then(|category| category.label.clone())
                .unwrap_or_else(|| id.to_string()),
            CategoryStrategy::SubstringInferred { .. } => inferred_label(id).to_string(),
        }
    }

    /// Ordered variable keys of a category; unknown categories are empty.
    pub fn variables(&self, category: &str) -> Vec<String> {
        if category == SCORECARDS_KEY {
            let mut keys: Vec<&str> = self.taxonomy.scorecards.keys().map(String::as_str).collect();
            keys.sort_by(|a, b| compare_labels(a, a, b, b));
            return keys.into_iter().map(str::to_string).collect();
        }
        let mut variables: Vec<&str> = match self.strategy {
            CategoryStrategy::StaticMap { categories, .. } => {
                let Some(declared) = categories.iter().find(|c| c.id == category) else {
                    return Vec::new();
                };
                self.navigable_variables()
                    .filter(|variable| declared.orientation.accepts(variable))
                    .filter(|variable| self.has_plot_type(variable, &declared.plot_type))
                    .collect()
            }
            CategoryStrategy::SubstringInferred { .. } => self
                .navigable_variables()
                .filter(|variable| infer_category(variable) == category)
                .collect(),
        };
        self.sort_variables(&mut variables);
        variables.into_iter().map(str::to_string).collect()
    }

    /// First category (in priority order) with variables, and its first variable.
    pub fn first_available(&self) -> Option<DefaultSelection> {
        self.categories().into_iter().find_map(|category| {
            let variable = self.variables(&category).into_iter().next()?;
            Some(DefaultSelection { category, variable })
        })
    }

    /// Variables of one category with their labels; `None` for unknown ids.
    pub fn category_summary(&self, id: &str) -> Option<CategorySummary> {
        if !self.categories().iter().any(|known| known == id) {
            return None;
        }
        Some(self.describe_category(id.to_string()))
    }

    pub fn summary(&self, project: &str) -> NavigationSummary {
        let categories = self
            .categories()
            .into_iter()
            .map(|id| self.describe_category(id))
            .collect();
        NavigationSummary {
            project: project.to_string(),
            strategy: self.strategy.as_str().to_string(),
            categories,
            default: self.first_available(),
        }
    }

    fn describe_category(&self, id: String) -> CategorySummary {
        let variables = self
            .variables(&id)
            .into_iter()
            .map(|key| VariableSummary {
                label: self.label_of(&key).to_string(),
                key,
            })
            .collect();
        CategorySummary {
            label: self.category_label(&id),
            id,
            variables,
        }
    }

    fn navigable_variables(&self) -> impl Iterator<Item = &'a str> {
        let taxonomy: &'a Taxonomy = self.taxonomy;
        taxonomy
            .variables
            .keys()
            .map(String::as_str)
            .filter(|key| !is_reserved_key(key))
    }

    fn has_plot_type(&self, variable: &str, plot_type: &str) -> bool {
        self.taxonomy
            .variables
            .get(variable)
            .is_some_and(|bucket| bucket.plot_types().any(|key| key.starts_with(plot_type)))
    }

    fn sort_variables(&self, variables: &mut [&str]) {
        let order = self.strategy.variable_order();
        let rank = |variable: &str| {
            order
                .iter()
                .position(|code| code == code_of(variable) || code == variable)
                .unwrap_or(order.len())
        };
        variables.sort_by(|a, b| {
            rank(*a)
                .cmp(&rank(*b))
                .then_with(|| compare_labels(self.label_of(a), a, self.label_of(b), b))
        });
    }
}

fn compare_labels(label_a: &str, key_a: &str, label_b: &str, key_b: &str) -> Ordering {
    label_a
        .to_lowercase()
        .cmp(&label_b.to_lowercase())
        .then_with(|| key_a.cmp(key_b))
}

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;
