//! Plot discovery over a project's `plots/` tree.
//!
//! Layouts have drifted over time: newer runs write one subdirectory per
//! variable, older runs dumped everything at the top level with the variable
//! encoded in the file name. Discovery turns either into a [`Taxonomy`] of
//! `variable -> plot type -> reference`, plus a scorecard map.
use crate::config::ViewerConfig;
use crate::error::ViewerResult;
use crate::labels::LabelCatalog;
use crate::paths::DataRoot;
use crate::scorecards::{ScorecardGrouper, ScorecardMap};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Subdirectory name that never becomes a variable.
pub const FILES_DIR: &str = "files";
/// Taxonomy key holding scorecard entries.
pub const SCORECARDS_KEY: &str = "Scorecards";
/// Taxonomy key holding the variable label side-map.
pub const VAR_LABELS_KEY: &str = "_var_labels";

const COMBINED_MARKER: &str = "combined_";
const PLOT_EXTENSION: &str = "png";

/// Which layouts discovery understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryMode {
    /// Only `plots/<variable>/*.png` (plus top-level scorecards).
    #[default]
    SubdirectoriesOnly,
    /// Also derive variables from top-level file names.
    WithLegacyTopLevel,
}

/// Plot types discovered for one variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableBucket {
    plots: BTreeMap<String, String>,
}

impl VariableBucket {
    /// Insert a plot, replacing any earlier plot with the same key.
    ///
    /// Returns the replaced reference so callers can log collisions.
    pub fn merge(&mut self, plot_type: String, reference: String) -> Option<String> {
        self.plots.insert(plot_type, reference)
    }

    pub fn plot_types(&self) -> impl Iterator<Item = &str> {
        self.plots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }
}

/// Everything discovered for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    pub variables: BTreeMap<String, VariableBucket>,
    pub scorecards: ScorecardMap,
    pub var_labels: BTreeMap<String, String>,
}

impl Taxonomy {
    /// Merge a plot into the named bucket, creating the bucket if needed.
    pub fn merge_plot(&mut self, variable: &str, plot_type: String, reference: String) {
        let bucket = self.variables.entry(variable.to_string()).or_default();
        if let Some(previous) = bucket.merge(plot_type, reference) {
            tracing::debug!(variable, replaced = %previous, "plot type collision");
        }
    }

    pub fn has_scorecards(&self) -> bool {
        !self.scorecards.is_empty()
    }
}

impl Serialize for Taxonomy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (variable, bucket) in &self.variables {
            map.serialize_entry(variable, bucket)?;
        }
        if !self.scorecards.is_empty() {
            map.serialize_entry(SCORECARDS_KEY, &self.scorecards)?;
        }
        if !self.var_labels.is_empty() {
            map.serialize_entry(VAR_LABELS_KEY, &self.var_labels)?;
        }
        map.end()
    }
}

/// Derive the plot-type key for a file stem inside a variable's bucket.
///
/// Policy, in order: strip an exact `<variable>_` prefix, otherwise remove
/// every occurrence of the variable name and trim leading separators; then
/// remove every `combined_`. An empty result falls back to the stem with
/// `combined_` removed and separators trimmed, so keys are never empty and
/// never carry the marker.
pub fn normalize_plot_type(variable: &str, token: &str) -> String {
    let prefix = format!("{variable}_");
    let stripped = match token.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None if variable.is_empty() => token.to_string(),
        None => token
            .replace(variable, "")
            .trim_start_matches(is_separator)
            .to_string(),
    };
    let normalized = if stripped.contains(COMBINED_MARKER) {
        remove_combined_marker(&stripped)
            .trim_start_matches(is_separator)
            .to_string()
    } else {
        stripped
    };
    if !normalized.is_empty() {
        return normalized;
    }
    // Nothing left after stripping: key by the stem itself, still without the marker.
    let fallback = remove_combined_marker(token);
    let fallback = fallback.trim_matches(is_separator);
    if fallback.is_empty() {
        COMBINED_MARKER.trim_end_matches('_').to_string()
    } else {
        fallback.to_string()
    }
}

/// Variable name encoded in a legacy top-level file stem.
///
/// `T2M_lead_time_series` → `T2M`; `temp_DD_profile` → `temp_DD`.
pub fn legacy_variable_name(token: &str) -> String {
    let mut parts = token.split('_');
    let first = parts.next().unwrap_or_default();
    match (first, parts.next()) {
        ("temp", Some(second)) => format!("temp_{second}"),
        _ => first.to_string(),
    }
}

/// Remove `combined_` until none is left, including ones formed by a removal.
fn remove_combined_marker(text: &str) -> String {
    let mut out = text.replace(COMBINED_MARKER, "");
    while out.contains(COMBINED_MARKER) {
        out = out.replace(COMBINED_MARKER, "");
    }
    out
}

fn is_separator(ch: char) -> bool {
    ch == '_' || ch == '-'
}

fn is_scorecard(token: &str) -> bool {
    token.to_ascii_lowercase().contains("scorecard")
}

fn is_reserved_variable(name: &str) -> bool {
    name.is_empty() || name == FILES_DIR || name == SCORECARDS_KEY || name.starts_with('_')
}

/// Entries of `dir`, sorted by path; unreadable directories yield nothing.
fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), %err, "skipping unreadable directory");
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    paths.sort();
    paths
}

fn png_stem(path: &Path) -> Option<String> {
    if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(PLOT_EXTENSION)
    {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

/// Discover every project under the configured data root.
///
/// A missing root fails before anything is listed.
pub fn discover_all(config: &ViewerConfig) -> ViewerResult<BTreeMap<String, Taxonomy>> {
    let start = Instant::now();
    let root = config.data_root()?;
    tracing::debug!(root = %root.root().display(), "discovering projects");
    let labels = config.load_labels();
    if labels.is_empty() {
        tracing::debug!(
            path = %config.labels_path.display(),
            "no variable labels; raw keys will be shown"
        );
    }
    let mut projects = BTreeMap::new();
    for project in root.list_projects()? {
        if let Some(taxonomy) = discover_project(config, &root, &labels, &project) {
            projects.insert(project, taxonomy);
        }
    }
    tracing::info!(
        projects = projects.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "plot discovery complete"
    );
    Ok(projects)
}

/// Discover one project; `None` when it has no `plots/` directory.
pub fn discover_project(
    config: &ViewerConfig,
    root: &DataRoot,
    labels: &LabelCatalog,
    project: &str,
) -> Option<Taxonomy> {
    let plots_dir = root.plots_dir(project);
    if !plots_dir.is_dir() {
        tracing::debug!(project, "no plots directory");
        return None;
    }
    let pair_scorecards = config
        .profiles
        .profile_for(project)
        .is_some_and(|profile| profile.pair_scorecards);
    let grouper = ScorecardGrouper::new(pair_scorecards);

    let entries = sorted_entries(&plots_dir);
    let mut taxonomy = Taxonomy::default();

    // Subdirectories are fully enumerated before top-level files.
    for dir in entries.iter().filter(|path| path.is_dir()) {
        let Some(variable) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if is_reserved_variable(variable) {
            continue;
        }
        taxonomy.variables.entry(variable.to_string()).or_default();
        for file in sorted_entries(dir) {
            let Some(token) = png_stem(&file) else {
                continue;
            };
            let plot_type = normalize_plot_type(variable, &token);
            taxonomy.merge_plot(variable, plot_type, root.relative_reference(&file));
        }
        if taxonomy
            .variables
            .get(variable)
            .is_some_and(VariableBucket::is_empty)
        {
            tracing::debug!(project, variable, "variable directory has no plots");
        }
    }

    for file in &entries {
        let Some(token) = png_stem(file) else {
            continue;
        };
        let reference = root.relative_reference(file);
        if is_scorecard(&token) {
            grouper.add(&token, reference, &mut taxonomy.scorecards);
            continue;
        }
        match config.discovery_mode {
            DiscoveryMode::WithLegacyTopLevel => {
                let variable = legacy_variable_name(&token);
                if is_reserved_variable(&variable) {
                    continue;
                }
                let plot_type = normalize_plot_type(&variable, &token);
                taxonomy.merge_plot(&variable, plot_type, reference);
            }
            DiscoveryMode::SubdirectoriesOnly => {
                tracing::debug!(project, file = %token, "ignoring top-level plot");
            }
        }
    }

    taxonomy.var_labels = taxonomy
        .variables
        .keys()
        .filter_map(|variable| {
            labels
                .lookup(variable)
                .filter(|label| label != variable)
                .map(|label| (variable.clone(), label))
        })
        .collect();

    tracing::debug!(
        project,
        variables = taxonomy.variables.len(),
        plots = taxonomy.variables.values().map(VariableBucket::len).sum::<usize>(),
        scorecards = taxonomy.scorecards.len(),
        "project discovered"
    );
    Some(taxonomy)
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
