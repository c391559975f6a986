//! JSON actions behind `/api` and the CLI query commands.
//!
//! Each action returns a status plus a JSON body; failures always use a
//! single `error` key so clients can branch on its presence.
use crate::config::ViewerConfig;
use crate::discovery::{discover_all, discover_project};
use crate::error::{ViewerError, ViewerResult};
use crate::metrics::load_scorecard_rows;
use crate::navigation::CategoryNavigator;
use crate::paths::check_path_segment;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Query parameter naming the project.
pub const PROJECT_PARAM: &str = "project";
/// Optional `get_navigation` parameter narrowing the answer to one category.
pub const CATEGORY_PARAM: &str = "category";

/// Supported API actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetProjects,
    GetScorecardData,
    GetNavigation,
}

impl Action {
    /// Parse an action name; a missing action means `get_projects`.
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") | Some("get_projects") => Ok(Action::GetProjects),
            Some("get_scorecard_data") => Ok(Action::GetScorecardData),
            Some("get_navigation") => Ok(Action::GetNavigation),
            Some(other) => Err(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetProjects => "get_projects",
            Action::GetScorecardData => "get_scorecard_data",
            Action::GetNavigation => "get_navigation",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status code plus JSON body for one API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body },
            Err(err) => Self {
                status: 500,
                body: serde_json::json!({ "error": format!("serialize response: {err}") }),
            },
        }
    }

    fn error(err: &ViewerError) -> Self {
        Self {
            status: err.status_code(),
            body: err.to_json(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Pretty-printed body, as sent over HTTP and printed by the CLI.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Dispatch an action by name.
pub fn handle(
    config: &ViewerConfig,
    action: Option<&str>,
    params: &BTreeMap<String, String>,
) -> ApiResponse {
    let action = match Action::parse(action) {
        Ok(action) => action,
        Err(unknown) => {
            return ApiResponse {
                status: 400,
                body: serde_json::json!({ "error": format!("Unknown action: {unknown}") }),
            };
        }
    };
    let project = params.get(PROJECT_PARAM).map(String::as_str);
    let result = match action {
        Action::GetProjects => discover_all(config).map(|projects| ApiResponse::json(&projects)),
        Action::GetScorecardData => scorecard_data(config, project),
        Action::GetNavigation => navigation(
            config,
            project,
            params.get(CATEGORY_PARAM).map(String::as_str),
        ),
    };
    result.unwrap_or_else(|err| {
        tracing::warn!(action = %action, kind = err.kind(), error = %err, "api request failed");
        ApiResponse::error(&err)
    })
}

fn scorecard_data(config: &ViewerConfig, project: Option<&str>) -> ViewerResult<ApiResponse> {
    let root = config.data_root()?;
    let rows = load_scorecard_rows(&root, project)?;
    Ok(ApiResponse::json(&rows))
}

fn navigation(
    config: &ViewerConfig,
    project: Option<&str>,
    category: Option<&str>,
) -> ViewerResult<ApiResponse> {
    let project = project
        .map(str::trim)
        .filter(|project| !project.is_empty())
        .ok_or_else(|| ViewerError::MissingParameter("Project name not provided".to_string()))?;
    check_path_segment(project)?;
    let root = config.data_root()?;
    let labels = config.load_labels();
    let taxonomy = discover_project(config, &root, &labels, project).ok_or_else(|| {
        ViewerError::NotFound(format!("No plots found for project: {project}"))
    })?;
    let navigator = CategoryNavigator::for_project(&taxonomy, &config.profiles, project);
    match category.filter(|category| !category.is_empty()) {
        Some(category) => {
            let summary = navigator.category_summary(category).ok_or_else(|| {
                ViewerError::NotFound(format!("Unknown category: {category}"))
            })?;
            Ok(ApiResponse::json(&summary))
        }
        None => Ok(ApiResponse::json(&navigator.summary(project))),
    }
}
