// src/runtime/evaluator.rs
//! Reference evaluator for rewritten modules
//!
//! Runs the statements the rewriter emits, in the execution realm:
//!
//! - `const <pattern> = <registry>.get("<key>");` binds local names
//! - `<registry>.get("<key>");` asserts an entry exists
//! - `<registry>.remove("<key>");` cleans up after the top level
//! - `import ... from "<absolute>";` is recorded as an external link
//!
//! The rest of the module body is opaque. Removals always run, including
//! when a lookup fails part-way through the top level.

use crate::interception::declarations::{self, ImportBinding};
use crate::runtime::registry::MockRegistry;
use crate::utils::errors::{EngineError, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const KEY_LITERAL: &str = r#""(?:[^"\\]|\\.)*""#;

/// Names bound by the top level of a rewritten module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleBindings {
    values: HashMap<String, Value>,

    /// Absolute identifiers of untouched imports, in source order
    pub external_imports: Vec<String>,

    /// Registry keys removed after the top level ran
    pub cleaned_keys: Vec<String>,
}

impl ModuleBindings {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Removes the trailer's keys however the top level ends
struct CleanupGuard<'a> {
    registry: &'a MockRegistry,
    keys: Vec<String>,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        for key in &self.keys {
            self.registry.remove(key);
        }
    }
}

/// Execute the engine-emitted statements of `source` against `registry`
///
/// `registry_binding` is the local name the preamble gives the registry.
pub fn evaluate(source: &str, registry: &MockRegistry, registry_binding: &str) -> Result<ModuleBindings> {
    let binding = regex::escape(registry_binding);

    let preamble = compile(&format!(
        r"import\s*\{{\s*registry\s+as\s+{}\s*\}}\s*from\s*",
        binding
    ))?;
    if !preamble.is_match(source) {
        return Err(evaluation(
            format!("registry preamble binding '{}' not found", registry_binding),
            None,
        ));
    }

    let lookup = compile(&format!(
        r"(?:const\s+(?P<pattern>\{{[^{{}}]*\}}|[A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*)?{}\.get\((?P<key>{})\);",
        binding, KEY_LITERAL
    ))?;
    let removal = compile(&format!(r"{}\.remove\((?P<key>{})\);", binding, KEY_LITERAL))?;

    let mut cleaned_keys = Vec::new();
    for caps in removal.captures_iter(source) {
        cleaned_keys.push(parse_key(&caps["key"])?);
    }

    let guard = CleanupGuard {
        registry,
        keys: cleaned_keys.clone(),
    };

    let mut values = HashMap::new();
    for caps in lookup.captures_iter(source) {
        let key = parse_key(&caps["key"])?;
        let value = registry
            .get(&key)
            .map_err(|e| evaluation(format!("top-level lookup of '{}' failed", key), Some(e)))?;

        if let Some(pattern) = caps.name("pattern") {
            bind(pattern.as_str(), value, &mut values)?;
        }
    }

    let external_imports = declarations::scan(source)
        .into_iter()
        .filter(|decl| !is_registry_import(&decl.bindings, registry_binding))
        .map(|decl| decl.path)
        .collect();

    drop(guard);
    debug!(
        "Evaluated rewritten module: {} bindings, {} registry entries cleaned",
        values.len(),
        cleaned_keys.len()
    );

    Ok(ModuleBindings {
        values,
        external_imports,
        cleaned_keys,
    })
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| evaluation(format!("invalid statement pattern: {}", e), None))
}

fn evaluation(reason: String, source: Option<EngineError>) -> EngineError {
    EngineError::Evaluation {
        reason,
        source: source.map(Box::new),
    }
}

fn parse_key(literal: &str) -> Result<String> {
    serde_json::from_str(literal)
        .map_err(|e| evaluation(format!("bad registry key literal {}: {}", literal, e), None))
}

fn is_registry_import(bindings: &[ImportBinding], registry_binding: &str) -> bool {
    matches!(
        bindings,
        [ImportBinding::Named(names)]
            if names.len() == 1 && names[0].imported == "registry" && names[0].local == registry_binding
    )
}

/// Bind `value` to an identifier or a `{ a, b: c }` destructuring pattern
fn bind(pattern: &str, value: Value, values: &mut HashMap<String, Value>) -> Result<()> {
    let Some(inner) = pattern.strip_prefix('{').and_then(|p| p.strip_suffix('}')) else {
        values.insert(pattern.to_string(), value);
        return Ok(());
    };

    if value.is_null() {
        return Err(evaluation(
            format!("cannot destructure {} from null", pattern),
            None,
        ));
    }

    for entry in inner.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (property, local) = match entry.split_once(':') {
            Some((property, local)) => (property.trim(), local.trim()),
            None => (entry, entry),
        };

        let bound = value.get(property).cloned().unwrap_or(Value::Null);
        values.insert(local.to_string(), bound);
    }

    Ok(())
}
