//! Path helpers shared by the tab collection and the reconciler.

use std::path::{Component, Path, PathBuf};

/// Display name of a file (last path component).
pub fn filename_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory containing `path`, used as the base for relative image paths.
pub fn dirname_of(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Lexically normalize a path: drop `.` components and fold `..` where possible.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(any(windows, target_os = "macos"))]
fn paths_equal(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(not(any(windows, target_os = "macos")))]
fn paths_equal(a: &Path, b: &Path) -> bool {
    a == b
}

/// Whether two paths refer to the same file.
///
/// Compares lexically first and falls back to resolving both paths on disk,
/// so symlinked or differently spelled paths still match.
pub fn is_same_path(a: &Path, b: &Path) -> bool {
    if a.as_os_str().is_empty() || b.as_os_str().is_empty() {
        return false;
    }
    if paths_equal(&normalize(a), &normalize(b)) {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => paths_equal(&a, &b),
        _ => false,
    }
}

/// Index of the first candidate that refers to the same file as `path`.
///
/// Every candidate is compared lexically before anything is resolved on
/// disk, and `path` itself is resolved at most once.
pub fn position_of_same_path<'a, I>(mut candidates: I, path: &Path) -> Option<usize>
where
    I: Iterator<Item = Option<&'a Path>> + Clone,
{
    if path.as_os_str().is_empty() {
        return None;
    }

    let wanted = normalize(path);
    let lexical = candidates.clone().position(|candidate| {
        candidate.is_some_and(|c| !c.as_os_str().is_empty() && paths_equal(&normalize(c), &wanted))
    });
    if lexical.is_some() {
        return lexical;
    }

    let resolved = path.canonicalize().ok()?;
    candidates.position(|candidate| {
        candidate
            .and_then(|c| c.canonicalize().ok())
            .is_some_and(|c| paths_equal(&c, &resolved))
    })
}

/// Serde adapter for optional paths that travel as strings, where the empty
/// string means "no path" (untitled document).
pub mod optional_path {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(path) => serializer.serialize_str(&path.to_string_lossy()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()).map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn test_filename_of() {
        assert_eq!(filename_of(Path::new("/docs/readme.md")), "readme.md");
        assert_eq!(filename_of(Path::new("/")), "");
    }

    #[test]
    fn test_dirname_of() {
        assert_eq!(
            dirname_of(Path::new("/docs/readme.md")),
            Some(PathBuf::from("/docs"))
        );
        assert_eq!(dirname_of(Path::new("readme.md")), None);
    }

    #[test]
    fn test_is_same_path_lexical() {
        assert!(is_same_path(
            Path::new("/docs/./notes/../readme.md"),
            Path::new("/docs/readme.md")
        ));
        assert!(!is_same_path(Path::new("/docs/a.md"), Path::new("/docs/b.md")));
        assert!(!is_same_path(Path::new(""), Path::new("")));
    }

    #[test]
    fn test_is_same_path_resolves_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.md");
        std::fs::write(&file, "# a").unwrap();
        let nested = dir.path().join("sub");
        std::fs::create_dir(&nested).unwrap();
        let via_parent = nested.join("..").join("a.md");
        assert!(is_same_path(&file, &via_parent));
    }

    #[test]
    fn test_position_of_same_path() {
        let stored = [None, Some(Path::new("/docs/a.md")), Some(Path::new("/docs/b.md"))];
        assert_eq!(
            position_of_same_path(stored.iter().copied(), Path::new("/docs/./b.md")),
            Some(2)
        );
        // Nonexistent paths without a lexical match are not found
        assert_eq!(
            position_of_same_path(stored.iter().copied(), Path::new("/docs/c.md")),
            None
        );
        assert_eq!(position_of_same_path(stored.iter().copied(), Path::new("")), None);
    }

    #[test]
    fn test_position_of_same_path_resolves_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("a.md");
        std::fs::write(&file, "# a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let link = dir.path().join("sub").join("..").join("a.md");

        let stored = [Some(Path::new("/elsewhere/x.md")), Some(file.as_path())];
        assert_eq!(position_of_same_path(stored.iter().copied(), &link), Some(1));
    }

    #[derive(Serialize, Deserialize)]
    struct WithPath {
        #[serde(with = "optional_path", default)]
        pathname: Option<PathBuf>,
    }

    #[test]
    fn test_optional_path_empty_string_is_none() {
        let parsed: WithPath = serde_json::from_str(r#"{"pathname": ""}"#).unwrap();
        assert!(parsed.pathname.is_none());
        let parsed: WithPath = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.pathname.is_none());
        let parsed: WithPath = serde_json::from_str(r#"{"pathname": "/a.md"}"#).unwrap();
        assert_eq!(parsed.pathname, Some(PathBuf::from("/a.md")));

        let json = serde_json::to_string(&WithPath { pathname: None }).unwrap();
        assert_eq!(json, r#"{"pathname":""}"#);
    }
}
