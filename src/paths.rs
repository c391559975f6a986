//! Typed paths into the verification data tree.
//!
//! Centralizing path construction keeps discovery, metrics, and file serving
//! pointed at the same layout, and keeps the absolute data root out of every
//! reference handed back to clients.
use crate::error::{ViewerError, ViewerResult};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Per-project directory holding generated plots.
pub const PLOTS_DIR: &str = "plots";
/// Per-project metrics database, stored alongside the plots.
pub const METRICS_DB_FILE: &str = "metrics.sqlite";

const INVALID_PATH_MESSAGE: &str = "Invalid path.";
const FILE_NOT_FOUND_MESSAGE: &str = "Image not found.";

/// A file read from under the data root, ready to be served.
#[derive(Debug, Clone)]
pub struct ServedFile {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Canonical data root plus helpers for locating project artifacts.
#[derive(Debug, Clone)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    /// Resolve the configured root against `base` when it is relative.
    ///
    /// Fails with a config error when the result does not exist or is not a
    /// directory; nothing under the root is listed.
    pub fn resolve(configured: &Path, base: &Path) -> ViewerResult<Self> {
        let candidate = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            base.join(configured)
        };
        let missing = || {
            ViewerError::Config(format!(
                "Data directory not found: {}",
                configured.display()
            ))
        };
        let root = candidate.canonicalize().map_err(|_| missing())?;
        if !root.is_dir() {
            return Err(missing());
        }
        Ok(Self { root })
    }

    /// Return the canonical root used for path derivation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `<root>/<project>` directory path.
    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    /// Return the `<root>/<project>/plots` directory path.
    pub fn plots_dir(&self, project: &str) -> PathBuf {
        self.project_dir(project).join(PLOTS_DIR)
    }

    /// Return the `<root>/<project>/plots/metrics.sqlite` path.
    pub fn metrics_db_path(&self, project: &str) -> PathBuf {
        self.plots_dir(project).join(METRICS_DB_FILE)
    }

    /// List project directory names under the root, sorted.
    pub fn list_projects(&self) -> ViewerResult<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|err| {
            ViewerError::Config(format!(
                "Data directory not readable: {} ({err})",
                self.root.display()
            ))
        })?;
        let mut projects: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        projects.sort();
        Ok(projects)
    }

    /// Turn a path under the root into the `/`-separated reference clients
    /// send back to the file endpoint.
    pub fn relative_reference(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Map a client-supplied relative path to a regular file under the root.
    pub fn resolve_file(&self, requested: &str) -> ViewerResult<PathBuf> {
        check_requested_path(requested)?;
        if requested.trim().is_empty() {
            return Err(ViewerError::NotFound(FILE_NOT_FOUND_MESSAGE.to_string()));
        }
        let joined = self.root.join(requested);
        if !joined.is_file() {
            return Err(ViewerError::NotFound(FILE_NOT_FOUND_MESSAGE.to_string()));
        }
        let canonical = joined
            .canonicalize()
            .map_err(|_| ViewerError::NotFound(FILE_NOT_FOUND_MESSAGE.to_string()))?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(requested, "resolved file escapes data root");
            return Err(ViewerError::InvalidPath(INVALID_PATH_MESSAGE.to_string()));
        }
        Ok(canonical)
    }

    /// Read a validated file together with its content type.
    pub fn read_file(&self, requested: &str) -> ViewerResult<ServedFile> {
        let path = self.resolve_file(requested)?;
        let bytes = fs::read(&path)
            .map_err(|_| ViewerError::NotFound(FILE_NOT_FOUND_MESSAGE.to_string()))?;
        Ok(ServedFile {
            content_type: content_type(&path),
            bytes,
        })
    }
}

/// Lexical checks on a requested path, done before touching the filesystem.
pub fn check_requested_path(requested: &str) -> ViewerResult<()> {
    if requested.contains("..") || Path::new(requested).is_absolute() {
        return Err(ViewerError::InvalidPath(INVALID_PATH_MESSAGE.to_string()));
    }
    Ok(())
}

/// Validate a name used as a single path segment under the root (a project).
pub fn check_path_segment(name: &str) -> ViewerResult<()> {
    check_requested_path(name)?;
    if name.contains('/') || name.contains('\\') {
        return Err(ViewerError::InvalidPath(INVALID_PATH_MESSAGE.to_string()));
    }
    Ok(())
}

/// Guess a content type from the file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("sqlite") => "application/vnd.sqlite3",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(path, contents).expect("write file");
    }

    #[test]
    fn relative_root_resolves_against_base() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("out/data")).expect("mkdir");
        let root = DataRoot::resolve(Path::new("out/data"), temp.path()).expect("resolve");
        assert!(root.root().ends_with("out/data"));
        assert!(root.root().is_absolute());
    }

    #[test]
    fn missing_root_is_a_config_error() {
        let temp = TempDir::new().expect("tempdir");
        let err = DataRoot::resolve(Path::new("nope"), temp.path()).unwrap_err();
        assert!(matches!(err, ViewerError::Config(_)));
        assert_eq!(err.to_string(), "Data directory not found: nope");
    }

    #[test]
    fn file_as_root_is_a_config_error() {
        let temp = TempDir::new().expect("tempdir");
        write_file(&temp.path().join("root.txt"), b"x");
        let err = DataRoot::resolve(&temp.path().join("root.txt"), temp.path()).unwrap_err();
        assert!(matches!(err, ViewerError::Config(_)));
    }

    #[test]
    fn traversal_is_rejected_before_filesystem_access() {
        let temp = TempDir::new().expect("tempdir");
        let root = DataRoot::resolve(temp.path(), temp.path()).expect("resolve");
        drop(temp);
        // The root no longer exists; a filesystem lookup would report not found.
        let err = root.resolve_file("../secrets.txt").unwrap_err();
        assert_eq!(err, ViewerError::InvalidPath("Invalid path.".to_string()));
        assert!(check_requested_path("proj/plots/..hidden.png").is_err());
    }

    #[test]
    fn absolute_requests_are_rejected() {
        assert!(check_requested_path("/etc/passwd").is_err());
        assert!(check_requested_path("proj/plots/a.png").is_ok());
    }

    #[test]
    fn existing_file_is_served_with_content_type() {
        let temp = TempDir::new().expect("tempdir");
        write_file(&temp.path().join("proj/plots/TT/TT_profile.png"), b"png");
        let root = DataRoot::resolve(temp.path(), temp.path()).expect("resolve");
        let served = root.read_file("proj/plots/TT/TT_profile.png").expect("read");
        assert_eq!(served.content_type, "image/png");
        assert_eq!(served.bytes, b"png");
    }

    #[test]
    fn missing_file_and_directories_are_not_found() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("proj/plots")).expect("mkdir");
        let root = DataRoot::resolve(temp.path(), temp.path()).expect("resolve");
        assert!(matches!(
            root.resolve_file("proj/plots/missing.png"),
            Err(ViewerError::NotFound(_))
        ));
        assert!(matches!(
            root.resolve_file("proj/plots"),
            Err(ViewerError::NotFound(_))
        ));
        assert!(matches!(root.resolve_file(""), Err(ViewerError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escaping_root_is_rejected() {
        let outside = TempDir::new().expect("outside");
        write_file(&outside.path().join("secret.txt"), b"secret");
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("proj")).expect("mkdir");
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            temp.path().join("proj/link.txt"),
        )
        .expect("symlink");
        let root = DataRoot::resolve(temp.path(), temp.path()).expect("resolve");
        assert!(matches!(
            root.resolve_file("proj/link.txt"),
            Err(ViewerError::InvalidPath(_))
        ));
    }

    #[test]
    fn relative_reference_strips_root() {
        let temp = TempDir::new().expect("tempdir");
        let root = DataRoot::resolve(temp.path(), temp.path()).expect("resolve");
        let abs = root.plots_dir("monitor").join("TT").join("TT_profile.png");
        assert_eq!(
            root.relative_reference(&abs),
            "monitor/plots/TT/TT_profile.png"
        );
    }

    #[test]
    fn projects_are_sorted_directories_only() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("obsver")).expect("mkdir");
        fs::create_dir_all(temp.path().join("monitor")).expect("mkdir");
        write_file(&temp.path().join("README.txt"), b"x");
        let root = DataRoot::resolve(temp.path(), temp.path()).expect("resolve");
        assert_eq!(
            root.list_projects().expect("list"),
            vec!["monitor".to_string(), "obsver".to_string()]
        );
    }

    #[test]
    fn project_segments_cannot_contain_separators() {
        assert!(check_path_segment("monitor").is_ok());
        assert!(check_path_segment("a/b").is_err());
        assert!(check_path_segment("..").is_err());
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(content_type(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(content_type(Path::new("noext")), "application/octet-stream");
    }
}
