//! Resolution of the external media engine executable

use std::path::{Path, PathBuf};

/// Resolves an engine program name to an executable path.
///
/// The supervisor depends only on this trait, so tests can swap in a
/// fake engine without touching the search path.
pub trait EngineLocator: Send + Sync {
    fn locate(&self, program: &str) -> Result<PathBuf, EngineNotFound>;
}

/// Looks the program up on the executable search path.
///
/// A program that already contains a path separator is checked as-is.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    /// Overrides the process search path when set
    search_path: Option<Vec<PathBuf>>,
}

impl SearchPathLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search only the given directories
    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            search_path: Some(dirs),
        }
    }

    fn dirs(&self) -> Vec<PathBuf> {
        match &self.search_path {
            Some(dirs) => dirs.clone(),
            None => std::env::var_os("PATH")
                .map(|path| std::env::split_paths(&path).collect())
                .unwrap_or_default(),
        }
    }
}

impl EngineLocator for SearchPathLocator {
    fn locate(&self, program: &str) -> Result<PathBuf, EngineNotFound> {
        if program.is_empty() {
            return Err(EngineNotFound(program.to_string()));
        }

        let direct = Path::new(program);
        if direct.components().count() > 1 {
            return if is_executable(direct) {
                Ok(direct.to_path_buf())
            } else {
                Err(EngineNotFound(program.to_string()))
            };
        }

        for dir in self.dirs() {
            let candidate = dir.join(program);
            if is_executable(&candidate) {
                log::debug!("Resolved engine '{}' to {}", program, candidate.display());
                return Ok(candidate);
            }
        }

        Err(EngineNotFound(program.to_string()))
    }
}

/// Always resolves to one pinned executable, whatever program is asked for
#[derive(Debug, Clone)]
pub struct FixedLocator {
    path: PathBuf,
}

impl FixedLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EngineLocator for FixedLocator {
    fn locate(&self, program: &str) -> Result<PathBuf, EngineNotFound> {
        if is_executable(&self.path) {
            Ok(self.path.clone())
        } else {
            Err(EngineNotFound(program.to_string()))
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// The engine executable could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Media engine '{0}' not found on the search path")]
pub struct EngineNotFound(pub String);
