//! Source file access for the serving root.
//!
//! Resolves request paths against a fixed root directory and reads file
//! content plus modification time. This layer never caches: every call
//! re-reads, so the freshness check above it always sees current state.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use path_clean::PathClean;

use crate::error::{Result, ServeError};

/// A source file read from disk, ephemeral per request.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path the request resolved to
    pub filepath: PathBuf,
    /// Raw file content
    pub source: String,
    /// Last-modified time in milliseconds since the Unix epoch
    pub update_time: u64,
}

/// Resolves request paths to files under a fixed root directory.
#[derive(Debug, Clone)]
pub struct SourceReader {
    root: PathBuf,
}

impl SourceReader {
    /// Create a reader rooted at `root`. The root is absolutized and
    /// lexically cleaned so the traversal guard in [`resolve`] can use
    /// a plain prefix check.
    ///
    /// [`resolve`]: SourceReader::resolve
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())?.clean();
        Ok(Self { root })
    }

    /// The serving root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path to an absolute path under the root.
    ///
    /// Strips the leading separator, joins against the root, and
    /// lexically normalizes the result. Paths that escape the root
    /// (`/../etc/passwd` and friends) are rejected.
    pub fn resolve(&self, request_path: &str) -> Result<PathBuf> {
        let relative = request_path.trim_start_matches('/');
        let resolved = self.root.join(relative).clean();

        if !resolved.starts_with(&self.root) {
            return Err(ServeError::OutsideRoot(request_path.to_string()));
        }

        Ok(resolved)
    }

    /// Read a source file: content plus modification time.
    pub async fn read(&self, request_path: &str) -> Result<SourceFile> {
        let filepath = self.resolve(request_path)?;

        let source = tokio::fs::read_to_string(&filepath)
            .await
            .map_err(|source| ServeError::Read {
                path: filepath.clone(),
                source,
            })?;
        let update_time = self.stat_mtime(&filepath).await?;

        Ok(SourceFile {
            filepath,
            source,
            update_time,
        })
    }

    /// Stat the file a request path resolves to and return its
    /// modification time in milliseconds.
    pub async fn mtime(&self, request_path: &str) -> Result<u64> {
        let filepath = self.resolve(request_path)?;
        self.stat_mtime(&filepath).await
    }

    async fn stat_mtime(&self, filepath: &Path) -> Result<u64> {
        let metadata = tokio::fs::metadata(filepath)
            .await
            .map_err(|source| ServeError::Read {
                path: filepath.to_path_buf(),
                source,
            })?;

        let modified = metadata.modified().map_err(|source| ServeError::Read {
            path: filepath.to_path_buf(),
            source,
        })?;

        // Pre-epoch mtimes collapse to 0 rather than failing the request.
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(millis)
    }
}
