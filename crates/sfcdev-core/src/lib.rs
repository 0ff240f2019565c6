//! Development-time middleware that serves single-file components to a
//! browser as plain JavaScript, recompiling on demand and caching the
//! results.
//!
//! The pipeline decides whether a cached artifact is stale by comparing
//! the source file's modification time against a per-key freshness
//! index, regenerates it on a miss, and guarantees a single consistent
//! mapping from request path to served content.
//!
//! # Architecture
//!
//! ```text
//! request path
//!     │
//!     ▼
//! DevMiddleware ── classify by path shape
//!     │
//!     ├─ *.vue          → CacheService ──miss──▶ SfcCompiler
//!     ├─ *.js           → CacheService ──miss──▶ SourceReader + rewrite_imports
//!     ├─ /__modules/*   → CacheService ──miss──▶ PackageLoader
//!     └─ anything else  → pass-through (None)
//! ```
//!
//! The compiler and package loader are injected trait objects so the
//! cache and freshness logic can be tested against stubs.

pub mod cache;
pub mod compiler;
pub mod error;
pub mod loader;
pub mod middleware;
pub mod rewrite;
pub mod sfc;
pub mod source;

pub use cache::{CacheService, WeightedLru, DEFAULT_MAX_WEIGHT};
pub use compiler::{CodeBlock, SfcCompiler, SfcDescriptor};
pub use error::{Result, ServeError};
pub use loader::{NodeModulesLoader, PackageLoader};
pub use middleware::{
    BundledComponent, DevMiddleware, MiddlewareResponse, ServeOptions, JAVASCRIPT_MIME,
    MODULE_PREFIX,
};
pub use rewrite::rewrite_imports;
pub use sfc::DefaultCompiler;
pub use source::{SourceFile, SourceReader};
