//! Package loading for the virtual `/__modules/` route.
//!
//! Resolves a bare package name against the project's installed
//! dependencies and returns its entry bundle. Loaded packages are
//! treated as immutable for the process lifetime: the dispatcher caches
//! them without a freshness record, so they are never re-checked
//! against the filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, ServeError};

/// Resolves a package name to its entry bundle content.
#[async_trait]
pub trait PackageLoader: Send + Sync {
    async fn load(&self, name: &str) -> Result<String>;
}

/// Loads packages from `<root>/node_modules`, honoring the
/// `module` → `browser` → `main` entry fields of `package.json` with an
/// `index.js` fallback.
#[derive(Debug, Clone)]
pub struct NodeModulesLoader {
    root: PathBuf,
}

impl NodeModulesLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn package_dir(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join("node_modules").join(name))
    }
}

/// Package names come straight from request paths, so traversal and
/// absolute segments are rejected before touching the filesystem.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('/')
        && !name.contains('\\')
        && !name.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if valid {
        Ok(())
    } else {
        Err(ServeError::InvalidPackageName(name.to_string()))
    }
}

/// Pick the entry file advertised by a parsed `package.json`.
fn entry_field(manifest: &Value) -> &str {
    for field in ["module", "browser", "main"] {
        if let Some(entry) = manifest.get(field).and_then(Value::as_str) {
            return entry;
        }
    }
    "index.js"
}

#[async_trait]
impl PackageLoader for NodeModulesLoader {
    async fn load(&self, name: &str) -> Result<String> {
        let dir = self.package_dir(name)?;

        let manifest_raw = tokio::fs::read_to_string(dir.join("package.json"))
            .await
            .map_err(|_| ServeError::PackageNotFound(name.to_string()))?;
        let manifest: Value = serde_json::from_str(&manifest_raw)
            .map_err(|_| ServeError::PackageNotFound(name.to_string()))?;

        let entry = dir.join(entry_field(&manifest));
        tracing::debug!(package = name, entry = %entry.display(), "loading package entry");

        tokio::fs::read_to_string(&entry)
            .await
            .map_err(|_| ServeError::PackageNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn install_package(temp: &TempDir, name: &str, manifest: &str, entry: (&str, &str)) {
        let dir = temp.path().join("node_modules").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
        fs::write(dir.join(entry.0), entry.1).unwrap();
    }

    #[tokio::test]
    async fn test_load_prefers_module_field() {
        let temp = TempDir::new().unwrap();
        install_package(
            &temp,
            "vue",
            r#"{"main": "index.js", "module": "dist/vue.esm.js"}"#,
            ("index.js", "cjs"),
        );
        let dist = temp.path().join("node_modules/vue/dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("vue.esm.js"), "esm build").unwrap();

        let loader = NodeModulesLoader::new(temp.path());
        assert_eq!(loader.load("vue").await.unwrap(), "esm build");
    }

    #[tokio::test]
    async fn test_load_falls_back_to_main() {
        let temp = TempDir::new().unwrap();
        install_package(
            &temp,
            "lodash",
            r#"{"main": "lodash.js"}"#,
            ("lodash.js", "module.exports = {}"),
        );

        let loader = NodeModulesLoader::new(temp.path());
        assert_eq!(loader.load("lodash").await.unwrap(), "module.exports = {}");
    }

    #[tokio::test]
    async fn test_load_defaults_to_index_js() {
        let temp = TempDir::new().unwrap();
        install_package(&temp, "tiny", "{}", ("index.js", "export default 1"));

        let loader = NodeModulesLoader::new(temp.path());
        assert_eq!(loader.load("tiny").await.unwrap(), "export default 1");
    }

    #[tokio::test]
    async fn test_unknown_package_fails() {
        let temp = TempDir::new().unwrap();
        let loader = NodeModulesLoader::new(temp.path());

        let err = loader.load("nope").await.unwrap_err();
        assert!(matches!(err, ServeError::PackageNotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_in_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let loader = NodeModulesLoader::new(temp.path());

        for name in ["../escape", "a/../../b", "/abs", ""] {
            let err = loader.load(name).await.unwrap_err();
            assert!(matches!(err, ServeError::InvalidPackageName(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_scoped_package_name_is_valid() {
        let temp = TempDir::new().unwrap();
        install_package(&temp, "@scope/pkg", "{}", ("index.js", "scoped"));

        let loader = NodeModulesLoader::new(temp.path());
        assert_eq!(loader.load("@scope/pkg").await.unwrap(), "scoped");
    }
}
