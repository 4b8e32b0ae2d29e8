//! Compiled-in cache generation and asset manifest
//!
//! The cache version and the list of assets to pre-cache are fixed at build
//! time. Bumping `CACHE_VERSION` starts a new generation; the next activation
//! prunes every store left over from older ones.

use crate::error::{PrecacheError, PrecacheResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Name of the current cache generation
pub const CACHE_VERSION: &str = "fusikab-dj-cache-v1";

/// Paths pre-cached by every install
pub const ASSET_PATHS: &[&str] = &[
    "/",
    "/static/css/style.css",
    "/static/js/gallery.js",
    "/static/manifest.json",
    "/templates/index.html",
    "/templates/about.html",
    "/templates/services.html",
    "/templates/gallery.html",
    "/templates/contact.html",
    "/templates/mentions.html",
];

/// Opaque token naming one cache generation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheVersion(String);

impl CacheVersion {
    /// Create a version identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The compiled-in current version
    pub fn current() -> Self {
        Self::new(CACHE_VERSION)
    }

    /// Store name used for this generation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Ordered list of resource paths that must be cached after install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    paths: Vec<String>,
}

impl AssetManifest {
    /// Build a manifest, rejecting empty lists, relative paths and duplicates
    pub fn new<I, S>(paths: I) -> PrecacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();

        if paths.is_empty() {
            return Err(PrecacheError::ManifestInvalid(
                "manifest has no entries".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for path in &paths {
            if !path.starts_with('/') {
                return Err(PrecacheError::ManifestInvalid(format!(
                    "path must be absolute: {}",
                    path
                )));
            }
            if !seen.insert(path.as_str()) {
                return Err(PrecacheError::ManifestInvalid(format!(
                    "duplicate path: {}",
                    path
                )));
            }
        }

        Ok(Self { paths })
    }

    /// The compiled-in manifest
    pub fn builtin() -> Self {
        Self {
            paths: ASSET_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Paths in manifest order
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_manifest_is_valid() {
        let builtin = AssetManifest::builtin();
        let rebuilt = AssetManifest::new(ASSET_PATHS.iter().copied()).unwrap();
        assert_eq!(builtin, rebuilt);
        assert_eq!(builtin.len(), 10);
        assert!(builtin.contains("/"));
        assert!(builtin.contains("/templates/mentions.html"));
    }

    #[test]
    fn manifest_keeps_order() {
        let manifest = AssetManifest::new(["/b.css", "/", "/a.js"]).unwrap();
        assert_eq!(manifest.paths(), &["/b.css", "/", "/a.js"]);
    }

    #[test]
    fn manifest_rejects_duplicates() {
        let err = AssetManifest::new(["/", "/a.css", "/"]).unwrap_err();
        assert!(err.to_string().contains("duplicate path: /"));
    }

    #[test]
    fn manifest_rejects_relative_and_empty() {
        assert!(AssetManifest::new(["static/app.js"]).is_err());
        assert!(AssetManifest::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn version_serializes_as_plain_string() {
        let json = serde_json::to_string(&CacheVersion::current()).unwrap();
        assert_eq!(json, "\"fusikab-dj-cache-v1\"");
    }
}
