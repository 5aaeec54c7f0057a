// src/interception/resolver.rs
//! Specifier resolution
//!
//! Turns a possibly-relative dependency identifier into the canonical
//! absolute form used for registry keys. The codec (at encode time) and the
//! rewriter (at transform time) must agree byte-for-byte, so both go through
//! this one function.

use crate::utils::errors::{EngineError, Result};
use std::path::Path;
use url::Url;

/// Canonical identifier resolution against a base location
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecifierResolver;

impl SpecifierResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `identifier` relative to `base_location`
    ///
    /// Relative (`./`, `../`) and root-relative (`/`) identifiers are joined
    /// onto the base. `file:` URLs are normalized. Any other absolute URL
    /// (`node:fs`, `data:...`) and bare package names come back unchanged.
    pub fn resolve(&self, identifier: &str, base_location: &str) -> Result<String> {
        if is_relative(identifier) {
            let base = parse_base(base_location)?;
            let joined = base.join(identifier).map_err(|e| EngineError::InvalidBase {
                base: base_location.to_string(),
                reason: format!("cannot join '{}': {}", identifier, e),
            })?;
            return Ok(joined.to_string());
        }

        match Url::parse(identifier) {
            Ok(url) if url.scheme() == "file" => Ok(url.to_string()),
            _ => Ok(identifier.to_string()),
        }
    }
}

fn is_relative(identifier: &str) -> bool {
    identifier.starts_with("./")
        || identifier.starts_with("../")
        || identifier.starts_with('/')
        || identifier == "."
        || identifier == ".."
}

fn parse_base(base_location: &str) -> Result<Url> {
    let invalid = |reason: &str| EngineError::InvalidBase {
        base: base_location.to_string(),
        reason: reason.to_string(),
    };

    if let Ok(url) = Url::parse(base_location) {
        if url.scheme() == "file" {
            return Ok(url);
        }
        return Err(invalid("only file: URLs can anchor relative identifiers"));
    }

    let path = Path::new(base_location);
    if !path.is_absolute() {
        return Err(invalid("expected a file: URL or an absolute path"));
    }

    let url = if base_location.ends_with(std::path::MAIN_SEPARATOR) {
        Url::from_directory_path(path)
    } else {
        Url::from_file_path(path)
    };
    url.map_err(|_| invalid("path cannot be expressed as a file: URL"))
}
