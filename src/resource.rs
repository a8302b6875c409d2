//! Image paths in markup resolve against a base directory.

use sheaf_traits::{ResourceError, ResourceProvider, SharedResourceData};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Loads resources from files below a base directory.
///
/// Absolute paths and paths that climb out of the base directory are refused
/// with [`ResourceError::AccessDenied`].
#[derive(Debug, Clone)]
pub struct FilesystemResourceProvider {
    base: PathBuf,
    /// Canonical form of `base`, when it exists.
    canonical_base: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref().to_path_buf();
        let canonical_base = base.canonicalize().ok();
        Self {
            base,
            canonical_base,
        }
    }

    /// Resolves against the current working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ResourceError> {
        if let Some(scheme) = url_scheme(path) {
            return Err(ResourceError::LoadFailed {
                path: path.to_string(),
                message: format!("'{}' URLs need a ResourceProvider that can fetch them", scheme),
            });
        }
        let relative = Path::new(path);
        if relative.is_absolute() {
            return Err(ResourceError::AccessDenied(path.to_string()));
        }
        let joined = self.base.join(relative);
        if let (Ok(canonical), Some(base)) = (joined.canonicalize(), &self.canonical_base) {
            return if canonical.starts_with(base) {
                Ok(canonical)
            } else {
                Err(ResourceError::AccessDenied(path.to_string()))
            };
        }
        // Nothing on disk to canonicalize; refuse any upward step outright.
        if relative.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ResourceError::AccessDenied(path.to_string()));
        }
        Ok(joined)
    }
}

/// The scheme of a `scheme://rest` source, if `path` has one.
fn url_scheme(path: &str) -> Option<&str> {
    let (scheme, _) = path.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let full = self.resolve(path)?;
        log::debug!("Loading resource '{}' from {}", path, full.display());
        std::fs::read(&full).map(Arc::new).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResourceError::NotFound(path.to_string()),
            _ => ResourceError::LoadFailed {
                path: path.to_string(),
                message: e.to_string(),
            },
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}
