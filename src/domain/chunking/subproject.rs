//! Sub-project boundary detection.
//!
//! A project root can contain nested packages that should be indexed (and
//! reported in search results) as distinct projects rather than one
//! undifferentiated blob — most commonly a Swift package embedded inside a
//! larger repository, or several sibling packages in a monorepo. Detection
//! runs in three steps, checked in order against the root directory:
//!
//! 1. If the root contains `Package.swift`, shell out to
//!    `swift package dump-package` and read its `products` array. More than
//!    one product means the root is a multi-product Swift package: return
//!    one sub-project per product, all rooted at the same path. Exactly one
//!    product, or any failure to run or parse the manifest, means the root
//!    is a single ordinary project — return no sub-projects at all.
//! 2. Otherwise, if the root itself carries any other recognized manifest,
//!    it is already a single project — return no sub-projects.
//! 3. Otherwise, scan the root's immediate subdirectories (skipping
//!    dot-prefixed names and [`DEFAULT_EXCLUSIONS`]) and return one
//!    sub-project for each that carries a recognized manifest.
//!
//! Detection never descends more than one level and never treats a missing
//! or unparseable Swift manifest as an error: a project that merely looks
//! like a Swift package but isn't one is still indexable as a single
//! project.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::domain::error::Result;

/// Directory names skipped when scanning for sub-project markers: build
/// output, dependency checkouts, caches, and VCS metadata.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "node_modules",
    ".git",
    ".build",
    "build",
    "dist",
    "target",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    "coverage",
    ".DS_Store",
];

/// Manifest file names (other than `Package.swift`, which is handled
/// separately) that mark a directory as a project boundary.
const NON_SWIFT_MARKERS: &[&str] = &[
    ".git",
    "package.json",
    "pom.xml",
    "build.gradle",
    "Cargo.toml",
    "pyproject.toml",
    "setup.py",
    "go.mod",
    "Gemfile",
    "composer.json",
];

/// A detected sub-project.
#[derive(Debug, Clone, PartialEq)]
pub struct Subproject {
    /// Directory containing the sub-project's sources. For a multi-product
    /// Swift package every product shares this path with the package root.
    pub path: PathBuf,
    /// Package/project name: a Swift product name, or the directory name
    /// for a generically-marked sub-project.
    pub name: String,
}

/// The subset of `swift package dump-package`'s JSON output this crate
/// cares about.
#[derive(Debug, Clone, Deserialize)]
struct SwiftPackageManifest {
    products: Vec<SwiftProduct>,
}

#[derive(Debug, Clone, Deserialize)]
struct SwiftProduct {
    name: String,
}

/// Detects sub-project boundaries beneath a single root directory.
pub struct SubprojectDetector {
    exclusions: Vec<String>,
}

impl Default for SubprojectDetector {
    fn default() -> Self {
        Self {
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SubprojectDetector {
    /// Build a detector with a custom exclusion list, replacing the
    /// defaults.
    pub fn with_exclusions(exclusions: Vec<String>) -> Self {
        Self { exclusions }
    }

    fn is_excluded(&self, dir_name: &str) -> bool {
        dir_name.starts_with('.') || self.exclusions.iter().any(|e| e == dir_name)
    }

    /// Detect sub-projects directly beneath `root`. An empty result means
    /// `root` should be indexed as a single project, not that nothing was
    /// found there.
    pub fn detect(&self, root: &Path) -> Result<Vec<Subproject>> {
        if root.join("Package.swift").is_file() {
            let products = dump_swift_package_products(root);
            if products.len() > 1 {
                return Ok(products
                    .into_iter()
                    .map(|name| Subproject {
                        path: root.to_path_buf(),
                        name,
                    })
                    .collect());
            }
            return Ok(Vec::new());
        }

        if has_non_swift_marker(root) {
            return Ok(Vec::new());
        }

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };
            if !file_type.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_excluded(&name) {
                continue;
            }
            let path = entry.path();
            if has_non_swift_marker(&path) {
                found.push(Subproject { path, name });
            }
        }

        Ok(found)
    }
}

fn has_non_swift_marker(dir: &Path) -> bool {
    NON_SWIFT_MARKERS.iter().any(|marker| dir.join(marker).exists())
}

/// Invoke `swift package dump-package` in `dir` and return its product
/// names. A missing `swift` binary, a non-zero exit, or unparseable JSON
/// all degrade to an empty list rather than an error: the caller treats
/// that identically to a single-product package.
fn dump_swift_package_products(dir: &Path) -> Vec<String> {
    let output = match Command::new("swift")
        .args(["package", "dump-package"])
        .current_dir(dir)
        .output()
    {
        Ok(output) => output,
        Err(source) => {
            tracing::debug!(error = %source, dir = %dir.display(), "swift toolchain unavailable, treating as single project");
            return Vec::new();
        }
    };

    if !output.status.success() {
        tracing::debug!(
            dir = %dir.display(),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "swift package dump-package failed, treating as single project"
        );
        return Vec::new();
    }

    match serde_json::from_slice::<SwiftPackageManifest>(&output.stdout) {
        Ok(manifest) => manifest.products.into_iter().map(|p| p.name).collect(),
        Err(source) => {
            tracing::debug!(error = %source, dir = %dir.display(), "could not parse swift package manifest, treating as single project");
            Vec::new()
        }
    }
}
