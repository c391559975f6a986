//! Viewer configuration.
//!
//! Built once at startup from CLI flags and environment variables, then passed
//! by reference to discovery, navigation, metrics, and the server. Nothing
//! reads the environment after this point.
use crate::discovery::DiscoveryMode;
use crate::error::ViewerResult;
use crate::labels::{LabelCatalog, LABEL_CATALOG_FILE};
use crate::navigation::{builtin_profiles, ProjectProfile, ProjectProfiles};
use crate::paths::DataRoot;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Data root location, absolute or relative to the base directory.
pub const DATA_PATH_ENV: &str = "VERIF_DATA_PATH";
/// Label catalog location.
pub const LABELS_PATH_ENV: &str = "VERIF_VAR_NAMES";
/// Optional profiles file replacing the built-in project profiles.
pub const PROFILES_PATH_ENV: &str = "VERIF_PROFILES";
/// Enables legacy parsing of top-level plot names when set to `1`/`true`.
pub const LEGACY_TOP_LEVEL_ENV: &str = "VERIF_LEGACY_TOP_LEVEL";
/// Data root used when neither flag nor env var is set.
pub const DEFAULT_DATA_PATH: &str = "webapp/out/unified_verification";
/// Current schema version for the profiles file.
pub const PROFILES_SCHEMA_VERSION: u32 = 1;

/// On-disk shape of a profiles file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfilesFile {
    pub schema_version: u32,
    #[serde(default)]
    pub profiles: Vec<ProjectProfile>,
}

/// Explicit settings from the command line; `None` defers to the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_root: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub labels: Option<PathBuf>,
    pub profiles: Option<PathBuf>,
    pub legacy_top_level: bool,
}

/// Immutable settings shared by every request.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub data_path: PathBuf,
    pub base_dir: PathBuf,
    pub labels_path: PathBuf,
    pub discovery_mode: DiscoveryMode,
    pub profiles: ProjectProfiles,
}

impl ViewerConfig {
    /// Config with default labels location, discovery mode, and profiles.
    pub fn new(data_path: PathBuf, base_dir: PathBuf) -> Self {
        let labels_path = base_dir.join(LABEL_CATALOG_FILE);
        Self {
            data_path,
            base_dir,
            labels_path,
            discovery_mode: DiscoveryMode::default(),
            profiles: builtin_profiles(),
        }
    }

    /// Resolve the data root; evaluated per request so disk changes show up.
    pub fn data_root(&self) -> ViewerResult<DataRoot> {
        DataRoot::resolve(&self.data_path, &self.base_dir)
    }

    /// Load the label catalog; a missing catalog is empty, not an error.
    pub fn load_labels(&self) -> LabelCatalog {
        LabelCatalog::load(&self.labels_path)
    }
}

/// Build the config from CLI overrides and the process environment.
pub fn build_config(overrides: &ConfigOverrides) -> Result<ViewerConfig> {
    build_config_with_env(overrides, |key| std::env::var(key).ok())
}

/// Build the config using `env` for variable lookups.
pub fn build_config_with_env<F>(overrides: &ConfigOverrides, env: F) -> Result<ViewerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base_dir = match &overrides.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolve working directory")?,
    };
    let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    let data_path = overrides
        .data_root
        .clone()
        .or_else(|| non_empty(DATA_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

    let mut config = ViewerConfig::new(data_path, base_dir);

    if let Some(labels) = overrides
        .labels
        .clone()
        .or_else(|| non_empty(LABELS_PATH_ENV).map(PathBuf::from))
    {
        config.labels_path = resolve_against(&config.base_dir, &labels);
    }

    if let Some(profiles) = overrides
        .profiles
        .clone()
        .or_else(|| non_empty(PROFILES_PATH_ENV).map(PathBuf::from))
    {
        let path = resolve_against(&config.base_dir, &profiles);
        config.profiles = load_profiles(&path)?;
    }

    let legacy_env = non_empty(LEGACY_TOP_LEVEL_ENV)
        .map(|value| parse_flag(&value))
        .transpose()?
        .unwrap_or(false);
    if overrides.legacy_top_level || legacy_env {
        config.discovery_mode = DiscoveryMode::WithLegacyTopLevel;
    }

    tracing::debug!(
        data_path = %config.data_path.display(),
        base_dir = %config.base_dir.display(),
        labels_path = %config.labels_path.display(),
        discovery_mode = ?config.discovery_mode,
        profiles = config.profiles.profiles().len(),
        "viewer config built"
    );
    Ok(config)
}

/// Load and validate a profiles file.
pub fn load_profiles(path: &Path) -> Result<ProjectProfiles> {
    let bytes = fs::read(path).with_context(|| format!("read profiles {}", path.display()))?;
    let file: ProfilesFile =
        serde_json::from_slice(&bytes).context("parse profiles JSON")?;
    validate_profiles(&file)?;
    Ok(ProjectProfiles::new(file.profiles))
}

/// Validate schema version, ids, and category declarations.
pub fn validate_profiles(file: &ProfilesFile) -> Result<()> {
    if file.schema_version != PROFILES_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported profiles schema_version {}",
            file.schema_version
        ));
    }
    let mut profile_ids = BTreeSet::new();
    for profile in &file.profiles {
        if profile.id.trim().is_empty() {
            return Err(anyhow!("profile id must be non-empty"));
        }
        if !profile_ids.insert(profile.id.as_str()) {
            return Err(anyhow!("duplicate profile id {:?}", profile.id));
        }
        if let Some(prefix) = profile.match_prefix.as_deref() {
            if prefix.is_empty() {
                return Err(anyhow!(
                    "profile {:?}: match_prefix must be non-empty when set",
                    profile.id
                ));
            }
        }
        let mut category_ids = BTreeSet::new();
        for category in &profile.categories {
            let id = category.id.trim();
            if id.is_empty() || id == crate::discovery::SCORECARDS_KEY || id.starts_with('_') {
                return Err(anyhow!(
                    "profile {:?}: invalid category id {:?}",
                    profile.id,
                    category.id
                ));
            }
            if !category_ids.insert(id) {
                return Err(anyhow!(
                    "profile {:?}: duplicate category id {:?}",
                    profile.id,
                    category.id
                ));
            }
            if category.plot_type.trim().is_empty() {
                return Err(anyhow!(
                    "profile {:?}: category {:?} needs a plot_type",
                    profile.id,
                    category.id
                ));
            }
        }
    }
    Ok(())
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!(
            "{LEGACY_TOP_LEVEL_ENV} must be a boolean flag (got {other:?})"
        )),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
