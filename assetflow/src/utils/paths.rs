//! Lexical path handling and input pattern expansion.
//!
//! Stage inputs and outputs are written relative to the project root with `/`
//! separators and may climb out of it (`../webapp/css`). Everything here works
//! on the lexical form so that validation never touches the filesystem.

use crate::errors::{codes, AssetflowError, PipelineValidationError};
use glob::{MatchOptions, Pattern};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// `*` never crosses a `/`; `**` is needed for recursion.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Removes `.` components and folds `..` into the preceding component.
///
/// Leading `..` components of a relative path are kept. An empty result
/// becomes `.`.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut parts: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => prefix.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else if prefix.as_os_str().is_empty() {
                    parts.push(OsString::from(".."));
                }
            }
            Component::Normal(part) => parts.push(part.to_os_string()),
        }
    }

    let mut out = prefix;
    for part in parts {
        out.push(part);
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Renders a relative path with `/` separators.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    if path.has_root() {
        return path.to_string_lossy().into_owned();
    }
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns true if the string contains glob metacharacters.
#[must_use]
pub fn has_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// The leading components of a pattern that contain no glob metacharacters.
#[must_use]
pub fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in Path::new(pattern).components() {
        if has_glob(&component.as_os_str().to_string_lossy()) {
            break;
        }
        prefix.push(component.as_os_str());
    }
    normalize(&prefix)
}

/// Returns true if `path` is `dir` or lies beneath it, lexically.
#[must_use]
pub fn is_within(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}

/// Matches a normalized relative pattern against a normalized relative path.
#[must_use]
pub fn pattern_matches(pattern: &str, path: &Path) -> bool {
    if !has_glob(pattern) {
        return Path::new(pattern) == path;
    }
    Pattern::new(pattern)
        .map(|compiled| compiled.matches_path_with(path, MATCH_OPTIONS))
        .unwrap_or(false)
}

/// Checks that a pattern compiles.
pub fn check_pattern(pattern: &str) -> Result<(), glob::PatternError> {
    Pattern::new(pattern).map(|_| ())
}

/// Expands a root-relative pattern to the regular files it matches, sorted.
///
/// Directories matched by the pattern are ignored.
pub fn expand(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, AssetflowError> {
    let base = normalize(&root.join(literal_prefix(pattern)));
    let rest: Vec<String> = Path::new(pattern)
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .skip_while(|part| !has_glob(part))
        .collect();

    if rest.is_empty() {
        return Ok(if base.is_file() { vec![base] } else { Vec::new() });
    }

    let full = format!(
        "{}/{}",
        Pattern::escape(&base.to_string_lossy()),
        rest.join("/")
    );
    let entries = glob::glob_with(&full, MATCH_OPTIONS).map_err(|err| {
        PipelineValidationError::coded(codes::STAGE, format!("Invalid pattern '{pattern}': {err}"))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            AssetflowError::fs(path, err.into_error())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Expresses `path` relative to `base`, climbing with `..` where needed.
///
/// Both paths are normalized first; the result is lexical.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);
    if base == Path::new(".") {
        return path;
    }

    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    normalize(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_folds_parent_components() {
        assert_eq!(normalize(Path::new("./build/../build/app.css")), PathBuf::from("build/app.css"));
        assert_eq!(normalize(Path::new("../webapp/./css")), PathBuf::from("../webapp/css"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
        assert_eq!(normalize(Path::new("/srv/gui/../webapp")), PathBuf::from("/srv/webapp"));
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("../webapp/css")), "../webapp/css");
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("vendors/font-awesome/fonts/*"), PathBuf::from("vendors/font-awesome/fonts"));
        assert_eq!(literal_prefix("../webapp/**/*.css"), PathBuf::from("../webapp"));
        assert_eq!(literal_prefix("build/app.css"), PathBuf::from("build/app.css"));
        assert_eq!(literal_prefix("*.css"), PathBuf::from("."));
    }

    #[test]
    fn test_pattern_matches() {
        assert!(pattern_matches("build/*.css", Path::new("build/vendors.css")));
        assert!(!pattern_matches("build/*.css", Path::new("build/sub/vendors.css")));
        assert!(pattern_matches("build/**/*.css", Path::new("build/sub/vendors.css")));
        assert!(pattern_matches("build/app.css", Path::new("build/app.css")));
        assert!(!pattern_matches("build/app.css", Path::new("build/app.js")));
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("../webapp/css/a.css"), Path::new("../webapp")));
        assert!(!is_within(Path::new("../webapp-old/a.css"), Path::new("../webapp")));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/srv/webapp/css/a.css"), Path::new("/srv/gui")),
            PathBuf::from("../webapp/css/a.css")
        );
        assert_eq!(
            relative_to(Path::new("/srv/gui/build/a.css"), Path::new("/srv/gui")),
            PathBuf::from("build/a.css")
        );
    }

    #[test]
    fn test_expand_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        let fonts = dir.path().join("fonts");
        fs::create_dir_all(fonts.join("nested")).unwrap();
        fs::write(fonts.join("b.woff"), "b").unwrap();
        fs::write(fonts.join("a.woff"), "a").unwrap();

        let files = expand(dir.path(), "fonts/*").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.woff", "b.woff"]);
    }

    #[test]
    fn test_expand_literal_and_missing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.sass"), "body").unwrap();

        assert_eq!(expand(dir.path(), "app.sass").unwrap().len(), 1);
        assert!(expand(dir.path(), "missing.sass").unwrap().is_empty());
        assert!(expand(dir.path(), "nothing/*.css").unwrap().is_empty());
    }

    #[test]
    fn test_expand_climbs_out_of_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("gui");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(dir.path().join("webapp/css")).unwrap();
        fs::write(dir.path().join("webapp/css/app.css"), "a{}").unwrap();

        let files = expand(&root, "../webapp/css/*.css").unwrap();
        assert_eq!(files, vec![normalize(&dir.path().join("webapp/css/app.css"))]);
    }
}
