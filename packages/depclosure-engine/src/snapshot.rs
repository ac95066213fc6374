//! Repository snapshot and the in-memory query over it.
//!
//! A snapshot is the merged content of a binary repository and its source
//! repository, serialised as JSON:
//!
//! ```json
//! { "packages": [
//!     { "name": "bar", "version": "1.0", "release": "1.fc40", "arch": "x86_64",
//!       "requires": ["libfoo.so.1()(64bit)"], "source_rpm": "bar-1.0-1.fc40.src.rpm" },
//!     { "name": "bar", "version": "1.0", "release": "1.fc40", "arch": "src" }
//! ] }
//! ```

use crate::error::{ClosureError, Result};
use crate::package::{bare_symbol, file_provide, BinaryPackage, PackageRef, SOURCE_ARCH};
use crate::query::{PackageQuery, SymbolPattern};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Immutable package list of one repository state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub packages: Vec<BinaryPackage>,
}

impl RepoSnapshot {
    pub fn new(packages: Vec<BinaryPackage>) -> Self {
        Self { packages }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(ClosureError::snapshot)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json_str(&content)?;
        info!(
            "Loaded {} packages from snapshot {}",
            snapshot.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Combine a binary repository with its source repository.
    pub fn merge(mut self, other: RepoSnapshot) -> Self {
        self.packages.extend(other.packages);
        self
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

type SourceKey = (String, String, String);

/// [`PackageQuery`] over a [`RepoSnapshot`].
///
/// Exact symbols are answered from hash indices; glob symbols scan the index
/// keys. Results keep snapshot order.
pub struct SnapshotQuery {
    packages: Vec<PackageRef>,
    provides: FxHashMap<String, Vec<usize>>,
    files: FxHashMap<String, Vec<usize>>,
    requires: FxHashMap<String, Vec<usize>>,
    sources: FxHashMap<SourceKey, usize>,
}

impl SnapshotQuery {
    pub fn new(snapshot: RepoSnapshot) -> Self {
        let packages: Vec<PackageRef> = snapshot.packages.into_iter().map(Arc::new).collect();

        let mut provides: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut files: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut requires: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut sources = FxHashMap::default();

        for (idx, pkg) in packages.iter().enumerate() {
            for capability in &pkg.provides {
                push_unique(&mut provides, bare_symbol(capability), idx);
            }
            for path in &pkg.files {
                push_unique(&mut files, &file_provide(path), idx);
            }
            for capability in &pkg.requires {
                push_unique(&mut requires, bare_symbol(capability), idx);
            }
            if pkg.arch == SOURCE_ARCH {
                sources
                    .entry((pkg.name.clone(), pkg.version.clone(), pkg.release.clone()))
                    .or_insert(idx);
            }
        }

        Self {
            packages,
            provides,
            files,
            requires,
            sources,
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn lookup(&self, indices: &[&FxHashMap<String, Vec<usize>>], symbol: &str) -> Vec<PackageRef> {
        let pattern = SymbolPattern::new(symbol);
        let mut hits = BTreeSet::new();

        for index in indices {
            if pattern.is_glob() {
                for (key, idxs) in index.iter() {
                    if pattern.matches(key) {
                        hits.extend(idxs.iter().copied());
                    }
                }
            } else if let Some(idxs) = index.get(symbol) {
                hits.extend(idxs.iter().copied());
            }
        }

        hits.into_iter()
            .map(|idx| Arc::clone(&self.packages[idx]))
            .collect()
    }
}

fn push_unique(index: &mut FxHashMap<String, Vec<usize>>, key: &str, idx: usize) {
    if key.is_empty() {
        return;
    }
    let slot = index.entry(key.to_string()).or_default();
    if slot.last() != Some(&idx) {
        slot.push(idx);
    }
}

impl PackageQuery for SnapshotQuery {
    fn packages(&self) -> Vec<PackageRef> {
        self.packages.clone()
    }

    fn what_provides(&self, symbol: &str) -> Vec<PackageRef> {
        if symbol.starts_with('/') {
            self.lookup(&[&self.provides, &self.files], symbol)
        } else {
            self.lookup(&[&self.provides], symbol)
        }
    }

    fn what_requires(&self, symbol: &str) -> Vec<PackageRef> {
        self.lookup(&[&self.requires], symbol)
    }

    fn source_package(&self, name: &str, version: &str, release: &str) -> Option<PackageRef> {
        let key = (name.to_string(), version.to_string(), release.to_string());
        self.sources
            .get(&key)
            .map(|idx| Arc::clone(&self.packages[*idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(name: &str, provides: &[&str], requires: &[&str], files: &[&str]) -> BinaryPackage {
        let mut pkg = BinaryPackage::new(name, "1.0", "1", "x86_64");
        pkg.provides = provides.iter().map(|s| s.to_string()).collect();
        pkg.requires = requires.iter().map(|s| s.to_string()).collect();
        pkg.files = files.iter().map(|s| s.to_string()).collect();
        pkg.source_rpm = Some(format!("{name}-1.0-1.src.rpm"));
        pkg
    }

    fn query() -> SnapshotQuery {
        SnapshotQuery::new(RepoSnapshot::new(vec![
            binary("foo", &["foo = 1.0-1", "libfoo.so.1()(64bit)"], &[], &["//usr/bin/foo", "/usr/bin/["]),
            binary("bar", &[], &["libfoo.so.1()(64bit)", "/usr/bin/foo"], &[]),
            binary("baz", &[], &["foo >= 1.0"], &[]),
            BinaryPackage::new("foo", "1.0", "1", "src"),
        ]))
    }

    fn names(pkgs: Vec<PackageRef>) -> Vec<String> {
        pkgs.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_what_provides_ignores_version() {
        let q = query();
        assert_eq!(names(q.what_provides("foo")), vec!["foo"]);
        assert!(q.what_provides("bar").is_empty());
    }

    #[test]
    fn test_file_provides_are_normalized() {
        let q = query();
        assert_eq!(names(q.what_provides("/usr/bin/foo")), vec!["foo"]);
    }

    #[test]
    fn test_glob_provide_matches_bracket_path() {
        let q = query();
        assert_eq!(names(q.what_provides("/usr/bin/?")), vec!["foo"]);
    }

    #[test]
    fn test_what_requires() {
        let q = query();
        assert_eq!(names(q.what_requires("libfoo.so.1()(64bit)")), vec!["bar"]);
        assert_eq!(names(q.what_requires("foo")), vec!["baz"]);
        assert_eq!(names(q.what_requires("/usr/bin/foo")), vec!["bar"]);
    }

    #[test]
    fn test_source_package_exact_match() {
        let q = query();
        let src = q.source_package("foo", "1.0", "1").unwrap();
        assert!(src.is_source());
        assert!(q.source_package("foo", "1.0", "2").is_none());
    }

    #[test]
    fn test_snapshot_json_loading() {
        let json = r#"{"packages": [
            {"name": "bar", "version": "1.0", "release": "1", "arch": "x86_64",
             "requires": ["libfoo.so.1()(64bit)"], "source_rpm": "bar-1.0-1.src.rpm"},
            {"name": "bar", "version": "1.0", "release": "1", "arch": "src"}
        ]}"#;
        let snapshot = RepoSnapshot::from_json_str(json).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.packages[0].provides.is_empty());

        assert!(matches!(
            RepoSnapshot::from_json_str("{\"packages\": 3}"),
            Err(ClosureError::Snapshot(_))
        ));
    }

    #[test]
    fn test_merge_keeps_both_repositories() {
        let binaries = RepoSnapshot::new(vec![binary("foo", &[], &[], &[])]);
        let sources = RepoSnapshot::new(vec![BinaryPackage::new("foo", "1.0", "1", "src")]);
        let merged = binaries.merge(sources);
        assert_eq!(merged.len(), 2);
    }
}
