//! Working-directory confinement for path arguments.
//!
//! The working directory of an execution is a security boundary. Any path
//! argument containing a parent-directory segment is rejected outright,
//! independent of what the OS would permit, and absolute paths must already
//! lie inside the working directory.

use super::value_objects::ToolError;
use std::path::{Component, Path, PathBuf};

/// Whether `path` contains a `..` segment under either separator convention.
pub fn has_parent_traversal(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}

/// Resolve a path argument against `working_dir`.
///
/// Rejects traversal segments and absolute paths outside `working_dir`.
/// No filesystem access happens here; symlink resolution is the caller's
/// concern.
pub fn resolve_within(working_dir: &Path, path: &str) -> Result<PathBuf, ToolError> {
    if path.is_empty() {
        return Err(ToolError::invalid_argument("Path must not be empty"));
    }
    if path.contains('\0') {
        return Err(ToolError::invalid_argument("Path must not contain NUL bytes"));
    }
    if has_parent_traversal(path) {
        return Err(ToolError::path_traversal(path));
    }

    let candidate = Path::new(path);
    if candidate.is_absolute() {
        if candidate.starts_with(working_dir) {
            return Ok(candidate.to_path_buf());
        }
        return Err(ToolError::path_traversal(path));
    }

    let mut resolved = working_dir.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            // Prefix/root only occur in absolute paths, ParentDir was rejected above
            _ => return Err(ToolError::path_traversal(path)),
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ToolErrorCode;

    #[test]
    fn detects_traversal_segments() {
        assert!(has_parent_traversal("../etc/passwd"));
        assert!(has_parent_traversal("notes/../../secret"));
        assert!(has_parent_traversal("..\\windows\\system32"));
        assert!(has_parent_traversal(".."));
        assert!(!has_parent_traversal("notes..txt"));
        assert!(!has_parent_traversal("a/.hidden/b"));
    }

    #[test]
    fn resolves_relative_path_inside_working_dir() {
        let resolved = resolve_within(Path::new("/work"), "./docs/notes.txt").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/docs/notes.txt"));
    }

    #[test]
    fn rejects_traversal() {
        let err = resolve_within(Path::new("/work"), "docs/../../etc/passwd").unwrap_err();
        assert_eq!(err.code, ToolErrorCode::PathTraversal);
    }

    #[test]
    fn absolute_path_must_be_inside_working_dir() {
        assert!(resolve_within(Path::new("/work"), "/work/a.txt").is_ok());
        let err = resolve_within(Path::new("/work"), "/etc/passwd").unwrap_err();
        assert_eq!(err.code, ToolErrorCode::PathTraversal);
    }

    #[test]
    fn rejects_empty_path() {
        let err = resolve_within(Path::new("/work"), "").unwrap_err();
        assert_eq!(err.code, ToolErrorCode::InvalidArgument);
    }
}
