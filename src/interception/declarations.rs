// src/interception/declarations.rs
//! Dependency-declaration scanner
//!
//! Recognizes static `import` statements of the forms
//!
//! ```text
//! import X from "p";
//! import * as ns from "p";
//! import { a, b as c } from "p";
//! import X, * as ns from "p";
//! import X, { a } from "p";
//! import "p";
//! ```
//!
//! and nothing else, each optionally followed by an attributes clause
//! (`with { type: "json" }` or the older `assert { ... }`). Dynamic `import()` calls, re-exports and syntax outside
//! this grammar are not reported. Text inside comments, string literals and
//! template literals is skipped, so commented-out imports stay untouched.
//! Regex literals are not tracked; a quote inside one can hide the imports
//! that follow it on the same logical string.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

const IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r#"\bimport\s*(?:(?P<clause>{id}(?:\s*,\s*(?:\*\s*as\s+{id}|\{{[^{{}}]*\}}))?|\*\s*as\s+{id}|\{{[^{{}}]*\}})\s*from\s*)?(?:"(?P<dq>[^"\r\n]*)"|'(?P<sq>[^'\r\n]*)')(?:\s*(?P<attrs>(?:with|assert)\s*\{{[^{{}}]*\}}))?[ \t]*;?"#,
        id = IDENT
    );
    Regex::new(&pattern).expect("import grammar is a valid regex")
});

static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\*\s*as\s+({})$", IDENT)).expect("namespace grammar is a valid regex")
});

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", IDENT)).expect("identifier grammar is a valid regex"));

/// One `imported as local` entry of a named-binding list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBinding {
    pub imported: String,
    pub local: String,
}

impl NamedBinding {
    pub fn new(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            imported: imported.into(),
            local: local.into(),
        }
    }

    pub fn is_renamed(&self) -> bool {
        self.imported != self.local
    }
}

/// Binding shape of an import clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    /// `import X from ...`
    Default(String),
    /// `import * as ns from ...`
    Namespace(String),
    /// `import { a, b as c } from ...`
    Named(Vec<NamedBinding>),
}

/// A recognized declaration and where it sits in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    /// Byte range of the whole statement, trailing semicolon included
    pub span: Range<usize>,

    /// Bindings in source order; empty for side-effect imports
    pub bindings: Vec<ImportBinding>,

    /// Declared path exactly as written
    pub path: String,

    /// Attributes clause as written, keyword included
    pub attributes: Option<String>,
}

impl ImportDeclaration {
    pub fn is_side_effect(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Find every recognized declaration in `source`, in order
pub fn scan(source: &str) -> Vec<ImportDeclaration> {
    let masked = masked_regions(source);
    let mut found = Vec::new();
    let mut at = 0;

    while let Some(caps) = IMPORT_RE.captures_at(source, at) {
        let Some(whole) = caps.get(0) else { break };

        // A match starting in a comment or literal may have swallowed real
        // code after it, so resume right after that region
        if let Some(region) = region_at(&masked, whole.start()) {
            at = region.end;
            continue;
        }
        at = whole.end();

        if let Some(declaration) = declaration_from(&caps) {
            found.push(declaration);
        }
    }

    found
}

fn declaration_from(caps: &Captures<'_>) -> Option<ImportDeclaration> {
    let whole = caps.get(0)?;
    let path = caps.name("dq").or_else(|| caps.name("sq"))?.as_str();
    let bindings = match caps.name("clause") {
        Some(clause) => parse_clause(clause.as_str())?,
        None => Vec::new(),
    };

    Some(ImportDeclaration {
        span: whole.range(),
        bindings,
        path: path.to_string(),
        attributes: caps.name("attrs").map(|m| m.as_str().to_string()),
    })
}

fn parse_clause(clause: &str) -> Option<Vec<ImportBinding>> {
    let clause = clause.trim();

    if clause.starts_with('{') {
        return Some(vec![parse_named(clause)?]);
    }

    if clause.starts_with('*') {
        return Some(vec![parse_namespace(clause)?]);
    }

    let (default, rest) = match clause.split_once(',') {
        Some((default, rest)) => (default.trim(), Some(rest.trim())),
        None => (clause, None),
    };

    if !IDENT_RE.is_match(default) {
        return None;
    }

    let mut bindings = vec![ImportBinding::Default(default.to_string())];
    if let Some(rest) = rest {
        let extra = if rest.starts_with('{') {
            parse_named(rest)?
        } else {
            parse_namespace(rest)?
        };
        bindings.push(extra);
    }

    Some(bindings)
}

fn parse_namespace(text: &str) -> Option<ImportBinding> {
    let caps = NAMESPACE_RE.captures(text.trim())?;
    Some(ImportBinding::Namespace(caps[1].to_string()))
}

fn parse_named(text: &str) -> Option<ImportBinding> {
    let inner = text.trim().strip_prefix('{')?.strip_suffix('}')?;

    let mut names = Vec::new();
    for entry in inner.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let parts: Vec<&str> = entry.split_whitespace().collect();
        let binding = match parts.as_slice() {
            [name] => NamedBinding::new(*name, *name),
            [imported, "as", local] => NamedBinding::new(*imported, *local),
            _ => return None,
        };

        // `default` is only legal on the imported side
        if !IDENT_RE.is_match(&binding.imported)
            || !IDENT_RE.is_match(&binding.local)
            || binding.local == "default"
        {
            return None;
        }
        names.push(binding);
    }

    Some(ImportBinding::Named(names))
}

fn region_at(regions: &[Range<usize>], offset: usize) -> Option<&Range<usize>> {
    regions.iter().find(|r| r.contains(&offset))
}

/// Byte ranges covered by comments and string/template literals
fn masked_regions(source: &str) -> Vec<Range<usize>> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut regions = Vec::new();
    let mut i = 0;

    while i < len {
        let start = i;
        match bytes[i] {
            b'/' if i + 1 < len && bytes[i + 1] == b'/' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                regions.push(start..i);
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i = match source[i + 2..].find("*/") {
                    Some(end) => i + 2 + end + 2,
                    None => len,
                };
                regions.push(start..i);
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < len {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b'\n' if quote != b'`' => break,
                        c if c == quote => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                i = i.min(len);
                regions.push(start..i);
            }
            _ => i += 1,
        }
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> ImportDeclaration {
        let found = scan(source);
        assert_eq!(found.len(), 1, "expected one declaration in {:?}", source);
        found.into_iter().next().unwrap()
    }

    #[test]
    fn test_default_binding() {
        let decl = single(r#"import X from "./dep.js";"#);
        assert_eq!(decl.bindings, vec![ImportBinding::Default("X".into())]);
        assert_eq!(decl.path, "./dep.js");
        assert_eq!(decl.span, 0..25);
    }

    #[test]
    fn test_namespace_binding() {
        let decl = single("import * as ns from './dep.js'");
        assert_eq!(decl.bindings, vec![ImportBinding::Namespace("ns".into())]);
    }

    #[test]
    fn test_named_bindings_with_rename() {
        let decl = single("import {\n  a,\n  b as c,\n  default as d,\n} from \"./dep.js\";");
        assert_eq!(
            decl.bindings,
            vec![ImportBinding::Named(vec![
                NamedBinding::new("a", "a"),
                NamedBinding::new("b", "c"),
                NamedBinding::new("default", "d"),
            ])]
        );
    }

    #[test]
    fn test_default_with_namespace() {
        let decl = single(r#"import X, * as ns from "./dep.js";"#);
        assert_eq!(
            decl.bindings,
            vec![
                ImportBinding::Default("X".into()),
                ImportBinding::Namespace("ns".into())
            ]
        );
    }

    #[test]
    fn test_default_with_named() {
        let decl = single(r#"import $X, { y } from "./dep.js";"#);
        assert_eq!(
            decl.bindings,
            vec![
                ImportBinding::Default("$X".into()),
                ImportBinding::Named(vec![NamedBinding::new("y", "y")])
            ]
        );
    }

    #[test]
    fn test_side_effect_import() {
        let decl = single(r#"import "./setup.js";"#);
        assert!(decl.is_side_effect());
        assert_eq!(decl.path, "./setup.js");
    }

    #[test]
    fn test_multiple_in_order() {
        let source = "import a from './a.js';\nimport { b } from './b.js';\nconsole.log(a, b);\n";
        let paths: Vec<String> = scan(source).into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["./a.js", "./b.js"]);
    }

    #[test]
    fn test_dynamic_import_ignored() {
        assert!(scan(r#"const m = await import("./dep.js");"#).is_empty());
    }

    #[test]
    fn test_reexport_ignored() {
        assert!(scan(r#"export { a } from "./dep.js";"#).is_empty());
        assert!(scan(r#"export * from "./dep.js";"#).is_empty());
    }

    #[test]
    fn test_comments_and_strings_ignored() {
        let source = concat!(
            "// import a from './a.js';\n",
            "/* import b from './b.js'; */\n",
            "const s = \"import c from './c.js'\";\n",
            "const t = `\nimport d from './d.js';\n`;\n",
            "import e from './e.js';\n",
        );
        let found = scan(source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "./e.js");
    }

    #[test]
    fn test_unsupported_named_syntax_left_alone() {
        assert!(scan(r#"import { "a-b" as ab } from "./dep.js";"#).is_empty());
        assert!(scan(r#"import { type T } from "./dep.js";"#).is_empty());
    }

    #[test]
    fn test_masked_regions_handles_escapes() {
        let source = r#"const s = "a\"b"; import x from "./x.js";"#;
        let found = scan(source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "./x.js");
    }

    #[test]
    fn test_string_before_import_does_not_hide_it() {
        let source = r#"const s = "import "; import X from "./dep.js";"#;
        let decl = single(source);
        assert_eq!(decl.path, "./dep.js");
        assert_eq!(decl.bindings, vec![ImportBinding::Default("X".into())]);
        assert_eq!(&source[decl.span.clone()], r#"import X from "./dep.js";"#);
    }

    #[test]
    fn test_attributes_clause_is_part_of_declaration() {
        let source = "import data from \"./data.json\" with { type: \"json\" };\nrun(data);\n";
        let decl = single(source);
        assert_eq!(decl.path, "./data.json");
        assert_eq!(decl.attributes.as_deref(), Some("with { type: \"json\" }"));
        assert!(source[decl.span.clone()].ends_with("};"));

        let legacy = single("import cfg from './cfg.json' assert { type: 'json' }");
        assert_eq!(legacy.attributes.as_deref(), Some("assert { type: 'json' }"));
    }
}
