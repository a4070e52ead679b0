//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Failure to expand a `~` path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("cannot determine the home directory of the current user")]
    NoHome,

    #[error("cannot expand user-specific home directory in `{0}`")]
    OtherUser(String),
}

/// Expand a leading `~` to the current user's home directory.
///
/// Paths without a leading `~` are returned unchanged. `~user/...` is not
/// supported and is reported as an error.
pub fn expand_home(path: &str) -> Result<PathBuf, ExpandError> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };

    if !rest.is_empty() && !rest.starts_with('/') && !rest.starts_with('\\') {
        return Err(ExpandError::OtherUser(path.to_string()));
    }

    let home = directories::BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .ok_or(ExpandError::NoHome)?;

    let rest = rest.trim_start_matches(|c| c == '/' || c == '\\');
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_plain_path_is_unchanged() {
        assert_eq!(
            expand_home("/var/lib/assets").unwrap(),
            PathBuf::from("/var/lib/assets")
        );
        assert_eq!(expand_home("assets").unwrap(), PathBuf::from("assets"));
    }

    #[test]
    fn test_expand_home_prefix() {
        let Some(home) = directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf()) else {
            return;
        };

        assert_eq!(expand_home("~").unwrap(), home);
        assert_eq!(
            expand_home("~/clusters/demo").unwrap(),
            home.join("clusters/demo")
        );
    }

    #[test]
    fn test_expand_other_user_fails() {
        assert_eq!(
            expand_home("~bob/assets"),
            Err(ExpandError::OtherUser("~bob/assets".to_string()))
        );
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b/c");

        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();

        assert!(dir.is_dir());
    }
}
