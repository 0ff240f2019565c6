//! Bare-import rewriting for plain `.js` requests.
//!
//! Browsers cannot resolve bare module specifiers, so
//! `import Vue from "vue"` becomes `import Vue from "/__modules/vue"`
//! and the dev server resolves that prefix against installed packages.
//! Pure string transform, no AST.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `import ... from "x"` / `export ... from "x"`.
static FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)(\b(?:import|export)\b[^'";]*?\bfrom\s*)(['"])([^'"]+)(['"])"#).unwrap()
});

/// Side-effect imports: `import "x"`.
static SIDE_EFFECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\bimport\s*)(['"])([^'"]+)(['"])"#).unwrap());

/// Call forms: `import("x")` and `require("x")`.
static CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\b(?:import|require)\s*\(\s*)(['"])([^'"]+)(['"])"#).unwrap()
});

/// True for specifiers the browser cannot resolve on its own: neither
/// relative, nor absolute, nor a full URL.
fn is_bare_specifier(specifier: &str) -> bool {
    !(specifier.starts_with('.') || specifier.starts_with('/') || specifier.contains("://"))
}

fn prefix_bare(caps: &Captures<'_>) -> String {
    let specifier = &caps[3];
    if is_bare_specifier(specifier) {
        format!("{}{}/__modules/{}{}", &caps[1], &caps[2], specifier, &caps[4])
    } else {
        caps[0].to_string()
    }
}

/// Rewrite bare module specifiers in import/require statements to the
/// virtual `/__modules/` route.
pub fn rewrite_imports(source: &str) -> String {
    let pass = FROM_RE.replace_all(source, |caps: &Captures<'_>| prefix_bare(caps));
    let pass = CALL_RE.replace_all(&pass, |caps: &Captures<'_>| prefix_bare(caps));
    SIDE_EFFECT_RE
        .replace_all(&pass, |caps: &Captures<'_>| prefix_bare(caps))
        .into_owned()
}
