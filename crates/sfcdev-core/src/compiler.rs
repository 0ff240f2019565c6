//! Compiler seam and inline source-map injection.
//!
//! The component compiler is an injected interface: the pipeline only
//! needs "source text in, code blocks out" plus an assembly step, so
//! cache and freshness behavior can be tested against stub compilers.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::Result;

/// A compiled code block with an optional source map.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Generated code
    pub code: String,
    /// Source map as raw JSON, when the compiler produced one
    pub map: Option<serde_json::Value>,
}

impl CodeBlock {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    pub fn with_map(code: impl Into<String>, map: serde_json::Value) -> Self {
        Self {
            code: code.into(),
            map: Some(map),
        }
    }
}

/// Intermediate result of compiling a single-file component.
#[derive(Debug, Clone)]
pub struct SfcDescriptor {
    /// The component's script block
    pub script: CodeBlock,
    /// Zero or more style blocks
    pub styles: Vec<CodeBlock>,
    /// Raw template markup, when present
    pub template: Option<String>,
}

/// A single-file component compiler.
///
/// `compile_to_descriptor` splits and compiles the source into blocks;
/// `assemble` turns a (possibly post-processed) descriptor into the
/// final servable module. Both are synchronous: compilation is pure
/// CPU work with no I/O.
pub trait SfcCompiler: Send + Sync {
    fn compile_to_descriptor(&self, filepath: &Path, source: &str) -> Result<SfcDescriptor>;

    fn assemble(&self, filepath: &Path, descriptor: &SfcDescriptor) -> Result<String>;
}

/// Languages a block's source-map comment can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLang {
    Js,
    Css,
}

/// Prepend an inline base64 source-map comment to a block.
///
/// Script blocks get `//# sourceMappingURL=...`, style blocks the
/// `/*# ... */` form. Blocks without a map pass through untouched.
pub fn inject_source_map(block: &CodeBlock, lang: BlockLang) -> CodeBlock {
    let Some(map) = &block.map else {
        return block.clone();
    };

    let encoded = STANDARD.encode(map.to_string());
    let comment = match lang {
        BlockLang::Js => format!(
            "//# sourceMappingURL=data:application/json;base64,{encoded}\n"
        ),
        BlockLang::Css => format!(
            "/*# sourceMappingURL=data:application/json;base64,{encoded}*/\n"
        ),
    };

    CodeBlock {
        code: format!("{comment}{}", block.code),
        map: block.map.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inject_js_map_uses_line_comment() {
        let map = json!({"version": 3, "mappings": ""});
        let block = CodeBlock::with_map("export default {}", map.clone());

        let injected = inject_source_map(&block, BlockLang::Js);

        let expected_prefix = format!(
            "//# sourceMappingURL=data:application/json;base64,{}\n",
            STANDARD.encode(map.to_string())
        );
        assert!(injected.code.starts_with(&expected_prefix));
        assert!(injected.code.ends_with("export default {}"));
    }

    #[test]
    fn test_inject_css_map_uses_block_comment() {
        let map = json!({"version": 3});
        let block = CodeBlock::with_map(".red { color: red }", map);

        let injected = inject_source_map(&block, BlockLang::Css);

        assert!(injected.code.starts_with("/*# sourceMappingURL=data:application/json;base64,"));
        assert!(injected.code.contains("*/\n.red { color: red }"));
    }

    #[test]
    fn test_inject_without_map_is_identity() {
        let block = CodeBlock::new("console.log(1)");
        let injected = inject_source_map(&block, BlockLang::Js);

        assert_eq!(injected.code, "console.log(1)");
        assert!(injected.map.is_none());
    }

    #[test]
    fn test_injected_map_round_trips_through_base64() {
        let map = json!({"version": 3, "sources": ["/App.vue"]});
        let block = CodeBlock::with_map("code", map.clone());

        let injected = inject_source_map(&block, BlockLang::Js);
        let encoded = injected
            .code
            .lines()
            .next()
            .unwrap()
            .rsplit("base64,")
            .next()
            .unwrap()
            .to_string();

        let decoded = STANDARD.decode(encoded).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(parsed, map);
    }
}
