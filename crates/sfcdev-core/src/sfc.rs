//! Built-in single-file component compiler.
//!
//! Splits a component into its top-level `<template>`, `<script>` and
//! `<style>` blocks with byte-level scanning, then assembles an ES
//! module that rebinds the script's default export, attaches the
//! template as a string property, and appends styles to the document
//! head at module evaluation.
//!
//! This is the default [`SfcCompiler`]; anything smarter (template
//! compilation, scoped styles, preprocessors) plugs in through the same
//! trait.

use std::path::Path;

use memchr::memmem;
use serde_json::json;

use crate::compiler::{CodeBlock, SfcCompiler, SfcDescriptor};
use crate::error::{Result, ServeError};

/// Refuse absurd inputs before scanning them.
const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Block-splitting compiler used when no custom compiler is injected.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCompiler;

impl DefaultCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SfcCompiler for DefaultCompiler {
    fn compile_to_descriptor(&self, filepath: &Path, source: &str) -> Result<SfcDescriptor> {
        if source.len() > MAX_FILE_SIZE {
            return Err(compile_error(filepath, "component exceeds 10MB"));
        }

        let template = extract_block(source, "template")
            .map_err(|message| compile_error(filepath, &message))?
            .map(|content| content.trim_matches('\n').to_string());

        let script_source = extract_block(source, "script")
            .map_err(|message| compile_error(filepath, &message))?
            .map(|content| content.trim().to_string())
            .unwrap_or_else(|| "export default {}".to_string());
        let script = CodeBlock::with_map(&script_source, block_map(filepath, &script_source));

        let mut styles = Vec::new();
        let mut cursor = 0;
        while let Some((content, next)) = extract_block_from(source, "style", cursor)
            .map_err(|message| compile_error(filepath, &message))?
        {
            let css = content.trim().to_string();
            let map = block_map(filepath, &css);
            styles.push(CodeBlock::with_map(css, map));
            cursor = next;
        }

        Ok(SfcDescriptor {
            script,
            styles,
            template,
        })
    }

    fn assemble(&self, filepath: &Path, descriptor: &SfcDescriptor) -> Result<String> {
        let mut out = String::with_capacity(descriptor.script.code.len() + 256);

        // Rebind the script's default export so the template and styles
        // can be attached before re-exporting.
        match descriptor.script.code.find("export default") {
            Some(pos) => {
                out.push_str(&descriptor.script.code[..pos]);
                out.push_str("const __component =");
                out.push_str(&descriptor.script.code[pos + "export default".len()..]);
            }
            None => {
                return Err(compile_error(
                    filepath,
                    "script block has no default export",
                ));
            }
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }

        if let Some(template) = &descriptor.template {
            out.push_str("__component.template = ");
            out.push_str(&js_string(template));
            out.push_str(";\n");
        }

        if !descriptor.styles.is_empty() {
            out.push_str("const __styles = [\n");
            for style in &descriptor.styles {
                out.push_str("  ");
                out.push_str(&js_string(&style.code));
                out.push_str(",\n");
            }
            out.push_str("];\n");
            out.push_str(
                "for (const __css of __styles) {\n  \
                 const __el = document.createElement(\"style\");\n  \
                 __el.textContent = __css;\n  \
                 document.head.appendChild(__el);\n}\n",
            );
        }

        out.push_str("export default __component;\n");
        Ok(out)
    }
}

fn compile_error(filepath: &Path, message: &str) -> ServeError {
    ServeError::Compile {
        file: filepath.to_path_buf(),
        message: message.to_string(),
    }
}

/// Minimal source map: no mappings, but carries the original block so
/// devtools can at least display it.
fn block_map(filepath: &Path, content: &str) -> serde_json::Value {
    json!({
        "version": 3,
        "sources": [filepath.to_string_lossy()],
        "sourcesContent": [content],
        "names": [],
        "mappings": "",
    })
}

/// JSON escaping doubles as JS string escaping here.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Extract the first top-level block with the given tag.
fn extract_block(source: &str, tag: &str) -> std::result::Result<Option<String>, String> {
    Ok(extract_block_from(source, tag, 0)?.map(|(content, _)| content))
}

/// Extract the next block with the given tag at or after `from`,
/// returning its content and the offset just past its closing tag.
///
/// Same-tag nesting is tracked by depth so `<template>` blocks inside a
/// template do not truncate the outer block.
fn extract_block_from(
    source: &str,
    tag: &str,
    from: usize,
) -> std::result::Result<Option<(String, usize)>, String> {
    let bytes = source.as_bytes();
    let open_marker = format!("<{tag}");
    let close_marker = format!("</{tag}>");

    let mut search = from;
    let open_start = loop {
        let Some(found) = memmem::find(&bytes[search..], open_marker.as_bytes()) else {
            return Ok(None);
        };
        let pos = search + found;
        // Reject partial matches like "<templates".
        match bytes.get(pos + open_marker.len()) {
            Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/') => break pos,
            Some(_) => search = pos + open_marker.len(),
            None => return Err(format!("unclosed <{tag}> tag")),
        }
    };

    let Some(angle) = memchr::memchr(b'>', &bytes[open_start..]) else {
        return Err(format!("unclosed <{tag}> tag"));
    };
    let tag_end = open_start + angle;

    // Self-closing block has no content.
    if bytes[tag_end - 1] == b'/' {
        return Ok(Some((String::new(), tag_end + 1)));
    }

    let content_start = tag_end + 1;
    let mut depth = 1usize;
    let mut cursor = content_start;

    while depth > 0 {
        let Some(close) = memmem::find(&bytes[cursor..], close_marker.as_bytes()) else {
            return Err(format!("unclosed <{tag}> tag"));
        };
        let close_pos = cursor + close;

        // Count same-tag openings between here and that closing tag.
        let mut inner = cursor;
        while let Some(found) = memmem::find(&bytes[inner..close_pos], open_marker.as_bytes()) {
            let pos = inner + found;
            if matches!(
                bytes.get(pos + open_marker.len()),
                Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')
            ) {
                depth += 1;
            }
            inner = pos + open_marker.len();
        }

        depth -= 1;
        cursor = close_pos + close_marker.len();
        if depth == 0 {
            let content = source[content_start..close_pos].to_string();
            return Ok(Some((content, cursor)));
        }
    }

    Err(format!("unclosed <{tag}> tag"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const COMPONENT: &str = r#"<template>
  <div class="hello">{{ message }}</div>
</template>

<script>
export default {
  data() {
    return { message: "hi" };
  },
};
</script>

<style>
.hello { color: teal; }
</style>
"#;

    fn path() -> PathBuf {
        PathBuf::from("/src/App.vue")
    }

    #[test]
    fn test_extracts_all_blocks() {
        let compiler = DefaultCompiler::new();
        let descriptor = compiler.compile_to_descriptor(&path(), COMPONENT).unwrap();

        assert!(descriptor
            .template
            .as_deref()
            .unwrap()
            .contains("{{ message }}"));
        assert!(descriptor.script.code.contains("export default"));
        assert_eq!(descriptor.styles.len(), 1);
        assert!(descriptor.styles[0].code.contains("color: teal"));
    }

    #[test]
    fn test_missing_script_defaults_to_empty_component() {
        let compiler = DefaultCompiler::new();
        let descriptor = compiler
            .compile_to_descriptor(&path(), "<template><p>hi</p></template>")
            .unwrap();

        assert_eq!(descriptor.script.code, "export default {}");
    }

    #[test]
    fn test_multiple_style_blocks() {
        let source = "<style>.a{}</style><style>.b{}</style>";
        let compiler = DefaultCompiler::new();
        let descriptor = compiler.compile_to_descriptor(&path(), source).unwrap();

        assert_eq!(descriptor.styles.len(), 2);
        assert_eq!(descriptor.styles[0].code, ".a{}");
        assert_eq!(descriptor.styles[1].code, ".b{}");
    }

    #[test]
    fn test_nested_template_does_not_truncate() {
        let source = "<template><div><template v-if=\"x\"><span/></template></div></template>";
        let compiler = DefaultCompiler::new();
        let descriptor = compiler.compile_to_descriptor(&path(), source).unwrap();

        assert_eq!(
            descriptor.template.as_deref(),
            Some("<div><template v-if=\"x\"><span/></template></div>")
        );
    }

    #[test]
    fn test_unclosed_script_is_a_compile_error() {
        let compiler = DefaultCompiler::new();
        let err = compiler
            .compile_to_descriptor(&path(), "<script>export default {}")
            .unwrap_err();

        assert!(matches!(err, ServeError::Compile { .. }));
        assert!(err.to_string().contains("unclosed <script>"));
    }

    #[test]
    fn test_assemble_attaches_template_and_styles() {
        let compiler = DefaultCompiler::new();
        let descriptor = compiler.compile_to_descriptor(&path(), COMPONENT).unwrap();
        let code = compiler.assemble(&path(), &descriptor).unwrap();

        assert!(code.contains("const __component ="));
        assert!(code.contains("__component.template = "));
        assert!(code.contains("document.createElement(\"style\")"));
        assert!(code.trim_end().ends_with("export default __component;"));
        assert!(!code.contains("export default {\n"));
    }

    #[test]
    fn test_assemble_without_default_export_fails() {
        let compiler = DefaultCompiler::new();
        let descriptor = SfcDescriptor {
            script: CodeBlock::new("const a = 1;"),
            styles: vec![],
            template: None,
        };

        let err = compiler.assemble(&path(), &descriptor).unwrap_err();
        assert!(matches!(err, ServeError::Compile { .. }));
    }

    #[test]
    fn test_script_attributes_are_tolerated() {
        let source = "<script lang=\"js\">\nexport default { name: \"A\" }\n</script>";
        let compiler = DefaultCompiler::new();
        let descriptor = compiler.compile_to_descriptor(&path(), source).unwrap();

        assert_eq!(descriptor.script.code, "export default { name: \"A\" }");
    }
}
