//! Where engine database files live by default.
//!
//! `HAZARD_DATA_DIR` relocates the data directory; otherwise it is `data/`
//! under the workspace root.

use std::path::{Path, PathBuf};

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "HAZARD_DATA_DIR";

/// Workspace root, two levels above this crate's manifest.
///
/// # Panics
///
/// Panics if the crate is not nested two directories deep, which would be
/// a build layout error.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| panic!("{} has no workspace root", env!("CARGO_MANIFEST_DIR")))
}

/// The data directory, honouring [`DATA_DIR_ENV`].
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map_or_else(|| project_root().join("data"), PathBuf::from)
}

/// Default primary engine file.
#[must_use]
pub fn primary_db_path() -> PathBuf {
    data_dir().join("hazard.duckdb")
}

/// Creates `dir` and its parents if missing.
///
/// # Errors
///
/// Returns the I/O error if creation fails.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_db_lives_in_data_dir() {
        assert_eq!(primary_db_path().parent(), Some(data_dir().as_path()));
        assert!(primary_db_path().ends_with("hazard.duckdb"));
    }

    #[test]
    fn ensure_dir_accepts_bare_file_names() {
        // `Path::new("x.duckdb").parent()` is the empty path.
        ensure_dir(Path::new("")).unwrap();
    }
}
