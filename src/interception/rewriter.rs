// src/interception/rewriter.rs
//! Source rewriter
//!
//! Replaces the dependency declarations of a module so that mocked
//! dependencies are read from the registry and every other declaration points
//! at its absolute location (the module itself now lives under a synthetic
//! specifier, so relative paths would no longer resolve).
//!
//! Line numbers of the original source are preserved: the preamble shares the
//! first line and multi-line declarations are padded with newlines.

use crate::interception::declarations::{self, ImportBinding, ImportDeclaration, NamedBinding};
use crate::interception::metadata::MockingInfos;
use crate::interception::resolver::SpecifierResolver;
use crate::observability::REWRITES_TOTAL;
use crate::utils::config::LoaderConfig;
use crate::utils::errors::Result;
use tracing::debug;

/// Rewrites declarations against one session's `MockingInfos`
#[derive(Debug, Clone)]
pub struct SourceRewriter {
    resolver: SpecifierResolver,
    registry_specifier: String,
    registry_binding: String,
}

impl SourceRewriter {
    pub fn new(registry_specifier: impl Into<String>, registry_binding: impl Into<String>) -> Self {
        Self {
            resolver: SpecifierResolver::new(),
            registry_specifier: registry_specifier.into(),
            registry_binding: registry_binding.into(),
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(
            config.registry_specifier.clone(),
            config.registry_binding.clone(),
        )
    }

    /// Local name of the registry inside rewritten modules
    pub fn registry_binding(&self) -> &str {
        &self.registry_binding
    }

    /// Rewrite `source` for the session described by `infos`
    pub fn rewrite(&self, source: &str, infos: &MockingInfos) -> Result<String> {
        let declarations = declarations::scan(source);

        let mut body = String::with_capacity(source.len() + 256);
        let mut cursor = 0;
        let mut mocked = 0usize;

        for declaration in &declarations {
            let resolved = self
                .resolver
                .resolve(&declaration.path, &infos.module_identifier)?;

            body.push_str(&source[cursor..declaration.span.start]);

            let rendered = if infos.is_mocked(&resolved) {
                mocked += 1;
                self.render_lookup(declaration, &infos.key_for(&resolved))
            } else {
                render_import(declaration, &resolved)
            };
            body.push_str(&rendered);

            let original = &source[declaration.span.clone()];
            let padding = original
                .matches('\n')
                .count()
                .saturating_sub(rendered.matches('\n').count());
            for _ in 0..padding {
                body.push('\n');
            }

            cursor = declaration.span.end;
        }
        body.push_str(&source[cursor..]);

        debug!(
            "Rewrote {} ({} declarations, {} mocked)",
            infos.module_identifier,
            declarations.len(),
            mocked
        );
        metrics::counter!(REWRITES_TOTAL).increment(1);

        Ok(self.assemble(&body, infos))
    }

    /// Preamble + body + cleanup trailer
    fn assemble(&self, body: &str, infos: &MockingInfos) -> String {
        let preamble = format!(
            "import {{ registry as {} }} from {};",
            self.registry_binding,
            js_string(&self.registry_specifier)
        );

        let mut output = String::with_capacity(body.len() + preamble.len() + 128);

        // A hashbang has to stay the very first line
        let body = match body.strip_prefix("#!") {
            Some(_) => {
                let line_end = body.find('\n').map(|i| i + 1).unwrap_or(body.len());
                output.push_str(&body[..line_end]);
                if line_end == body.len() && !body.ends_with('\n') {
                    output.push('\n');
                }
                &body[line_end..]
            }
            None => body,
        };

        output.push_str(&preamble);
        output.push(' ');
        output.push_str(body);

        if !output.ends_with('\n') {
            output.push('\n');
        }
        for key in infos.registry_keys() {
            output.push_str(&format!(
                "{}.remove({});\n",
                self.registry_binding,
                js_string(&key)
            ));
        }

        output
    }

    fn render_lookup(&self, declaration: &ImportDeclaration, key: &str) -> String {
        let lookup = format!("{}.get({})", self.registry_binding, js_string(key));

        if declaration.is_side_effect() {
            return format!("{};", lookup);
        }

        declaration
            .bindings
            .iter()
            .map(|binding| match binding {
                ImportBinding::Namespace(local) => format!("const {} = {};", local, lookup),
                ImportBinding::Default(local) => {
                    format!("const {{ default: {} }} = {};", local, lookup)
                }
                ImportBinding::Named(names) => {
                    format!("const {} = {};", render_pattern(names), lookup)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for SourceRewriter {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}

/// Equivalent declaration pointing at `path`, attributes carried over
fn render_import(declaration: &ImportDeclaration, path: &str) -> String {
    let target = match &declaration.attributes {
        Some(attributes) => format!("{} {}", js_string(path), attributes),
        None => js_string(path),
    };

    let bindings = &declaration.bindings;
    if bindings.is_empty() {
        return format!("import {};", target);
    }

    let clause = bindings
        .iter()
        .map(|binding| match binding {
            ImportBinding::Default(local) => local.clone(),
            ImportBinding::Namespace(local) => format!("* as {}", local),
            ImportBinding::Named(names) => {
                let entries: Vec<String> = names
                    .iter()
                    .map(|n| {
                        if n.is_renamed() {
                            format!("{} as {}", n.imported, n.local)
                        } else {
                            n.local.clone()
                        }
                    })
                    .collect();
                format!("{{ {} }}", entries.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("import {} from {};", clause, target)
}

/// Destructuring pattern equivalent to a named-binding list
fn render_pattern(names: &[NamedBinding]) -> String {
    if names.is_empty() {
        return "{}".to_string();
    }

    let entries: Vec<String> = names
        .iter()
        .map(|n| {
            if n.is_renamed() {
                format!("{}: {}", n.imported, n.local)
            } else {
                n.local.clone()
            }
        })
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

/// Double-quoted string literal; JSON escaping is valid JS escaping
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
