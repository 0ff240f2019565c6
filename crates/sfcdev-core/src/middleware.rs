//! Request dispatcher: classifies a request path, consults the cache,
//! fills misses through the right adapter, and produces the response
//! body.
//!
//! Branches are checked in precedence order and are mutually exclusive
//! by construction: component extension, then `.js`, then the
//! `/__modules/` prefix. Anything else is a pass-through for the
//! surrounding server to handle.

use std::path::Path;
use std::sync::Arc;

use crate::cache::CacheService;
use crate::compiler::{inject_source_map, BlockLang, SfcCompiler, SfcDescriptor};
use crate::error::Result;
use crate::loader::PackageLoader;
use crate::rewrite::rewrite_imports;
use crate::source::SourceReader;

/// Everything this middleware serves is JavaScript.
pub const JAVASCRIPT_MIME: &str = "application/javascript";

/// Virtual route prefix standing in for resolved packages.
pub const MODULE_PREFIX: &str = "/__modules/";

/// Middleware configuration.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Enable the cache + freshness pipeline. When false every request
    /// recomputes from scratch and the cache is never consulted.
    pub cache: bool,
    /// Weight budget for the shared cache store.
    pub max_cache_weight: usize,
    /// Request suffix treated as a single-file component.
    pub component_ext: String,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            cache: true,
            max_cache_weight: crate::cache::DEFAULT_MAX_WEIGHT,
            component_ext: ".vue".to_string(),
        }
    }
}

/// A response produced by the dispatcher. `None` from
/// [`DevMiddleware::handle`] means the path matched no branch and the
/// caller should fall through to its next handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareResponse {
    pub body: String,
    pub content_type: &'static str,
}

impl MiddlewareResponse {
    fn javascript(body: String) -> Self {
        Self {
            body,
            content_type: JAVASCRIPT_MIME,
        }
    }
}

/// A compiled component ready to serve.
#[derive(Debug, Clone)]
pub struct BundledComponent {
    /// Final assembled module code
    pub code: String,
    /// Source file mtime, propagated unchanged from the read
    pub update_time: u64,
}

/// The compile-and-cache pipeline root.
pub struct DevMiddleware {
    reader: SourceReader,
    cache: Option<Arc<CacheService>>,
    compiler: Arc<dyn SfcCompiler>,
    loader: Arc<dyn PackageLoader>,
    options: ServeOptions,
}

impl DevMiddleware {
    pub fn new(
        root: impl AsRef<Path>,
        compiler: Arc<dyn SfcCompiler>,
        loader: Arc<dyn PackageLoader>,
        options: ServeOptions,
    ) -> Result<Self> {
        let reader = SourceReader::new(root)?;
        let cache = options
            .cache
            .then(|| Arc::new(CacheService::new(options.max_cache_weight)));

        Ok(Self {
            reader,
            cache,
            compiler,
            loader,
            options,
        })
    }

    /// The serving root.
    pub fn root(&self) -> &Path {
        self.reader.root()
    }

    /// The cache handle, absent when caching is disabled.
    pub fn cache(&self) -> Option<&Arc<CacheService>> {
        self.cache.as_ref()
    }

    /// Dispatch a request path.
    ///
    /// Returns `Ok(Some(response))` for the three recognized path
    /// shapes, `Ok(None)` for everything else, and an error when the
    /// matched branch fails (missing source, compile error, unknown
    /// package). Errors leave the cache untouched.
    pub async fn handle(&self, path: &str) -> Result<Option<MiddlewareResponse>> {
        if path.ends_with(&self.options.component_ext) {
            let body = self.serve_component(path).await?;
            return Ok(Some(MiddlewareResponse::javascript(body)));
        }

        if path.ends_with(".js") {
            let body = self.serve_script(path).await?;
            return Ok(Some(MiddlewareResponse::javascript(body)));
        }

        if let Some(package) = path.strip_prefix(MODULE_PREFIX) {
            let body = self.serve_module(path, package).await?;
            return Ok(Some(MiddlewareResponse::javascript(body)));
        }

        Ok(None)
    }

    async fn serve_component(&self, key: &str) -> Result<String> {
        if let Some(cached) = self.try_cache(key, true).await? {
            tracing::debug!(key, "component served from cache");
            return Ok(cached);
        }

        let bundled = self.bundle_component(key).await?;
        self.cache_data(key, &bundled.code, Some(bundled.update_time));
        Ok(bundled.code)
    }

    async fn serve_script(&self, key: &str) -> Result<String> {
        if let Some(cached) = self.try_cache(key, true).await? {
            tracing::debug!(key, "script served from cache");
            return Ok(cached);
        }

        let file = self.reader.read(key).await?;
        let rewritten = rewrite_imports(&file.source);
        self.cache_data(key, &rewritten, Some(file.update_time));
        Ok(rewritten)
    }

    async fn serve_module(&self, key: &str, package: &str) -> Result<String> {
        // Module entries are immutable for the process lifetime, so the
        // freshness check is skipped and no timestamp is recorded.
        if let Some(cached) = self.try_cache(key, false).await? {
            tracing::debug!(key, "module served from cache");
            return Ok(cached);
        }

        let loaded = self.loader.load(package).await?;
        self.cache_data(key, &loaded, None);
        Ok(loaded)
    }

    /// Read, compile, and assemble a component, injecting inline source
    /// maps into the script and every style block in between.
    pub async fn bundle_component(&self, path: &str) -> Result<BundledComponent> {
        let file = self.reader.read(path).await?;
        let descriptor = self
            .compiler
            .compile_to_descriptor(&file.filepath, &file.source)?;

        let descriptor = SfcDescriptor {
            script: inject_source_map(&descriptor.script, BlockLang::Js),
            styles: descriptor
                .styles
                .iter()
                .map(|style| inject_source_map(style, BlockLang::Css))
                .collect(),
            template: descriptor.template,
        };

        let code = self.compiler.assemble(&file.filepath, &descriptor)?;
        Ok(BundledComponent {
            code,
            update_time: file.update_time,
        })
    }

    /// Fetch a fresh cached payload for `key`.
    ///
    /// A cache miss returns `None` without touching the filesystem.
    /// With `check_update_time`, the source file is stat'ed and compared
    /// against the recorded mtime: a missing record, or a record older
    /// than the file, means stale. Stale entries are not evicted, just
    /// not used; the next successful write overwrites them.
    pub async fn try_cache(&self, key: &str, check_update_time: bool) -> Result<Option<String>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let Some(data) = cache.get(key) else {
            return Ok(None);
        };

        if check_update_time {
            let file_mtime = self.reader.mtime(key).await?;
            match cache.recorded_mtime(key) {
                // No freshness record means we cannot vouch for the
                // entry; treat it as stale rather than serving blind.
                None => return Ok(None),
                Some(recorded) if recorded < file_mtime => return Ok(None),
                Some(_) => {}
            }
        }

        Ok(Some(data))
    }

    /// Write a computed payload through to the cache, when enabled.
    /// Returns whether anything was actually written.
    pub fn cache_data(&self, key: &str, value: &str, update_time: Option<u64>) -> bool {
        match &self.cache {
            Some(cache) => cache.cache_data(key, value, update_time),
            None => false,
        }
    }
}
