//! Test data builders

use depclosure_engine::{BinaryPackage, RepoSnapshot, SnapshotQuery};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const VERSION: &str = "1.0";
pub const RELEASE: &str = "1.fc40";

/// Builder for a repository snapshot.
///
/// Every source name used by a binary gets a matching `src` package, so the
/// built snapshot always resolves.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    binaries: Vec<BinaryPackage>,
    sources: BTreeMap<String, BinaryPackage>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binary package built from `source`
    pub fn binary(mut self, name: &str, source: &str, provides: &[&str], requires: &[&str]) -> Self {
        let mut pkg = BinaryPackage::new(name, VERSION, RELEASE, "x86_64");
        pkg.provides = strings(provides);
        pkg.requires = strings(requires);
        pkg.source_rpm = Some(format!("{source}-{VERSION}-{RELEASE}.src.rpm"));
        self.binaries.push(pkg);
        self.ensure_source(source);
        self
    }

    /// Attach files to the most recently added binary called `name`
    pub fn files(mut self, name: &str, files: &[&str]) -> Self {
        if let Some(pkg) = self.binaries.iter_mut().rev().find(|p| p.name == name) {
            pkg.files.extend(strings(files));
        }
        self
    }

    /// Build requirements of a source package
    pub fn build_requires(mut self, source: &str, requires: &[&str]) -> Self {
        self.ensure_source(source);
        if let Some(src) = self.sources.get_mut(source) {
            src.requires.extend(strings(requires));
        }
        self
    }

    /// A binary whose source package is missing from the snapshot
    pub fn dangling(mut self, name: &str, source: &str) -> Self {
        let mut pkg = BinaryPackage::new(name, VERSION, RELEASE, "x86_64");
        pkg.source_rpm = Some(format!("{source}-{VERSION}-{RELEASE}.src.rpm"));
        self.binaries.push(pkg);
        self
    }

    pub fn build(self) -> RepoSnapshot {
        let mut packages = self.binaries;
        packages.extend(self.sources.into_values());
        RepoSnapshot::new(packages)
    }

    pub fn query(self) -> Arc<SnapshotQuery> {
        Arc::new(SnapshotQuery::new(self.build()))
    }

    fn ensure_source(&mut self, source: &str) {
        self.sources
            .entry(source.to_string())
            .or_insert_with(|| BinaryPackage::new(source, VERSION, RELEASE, "src"));
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
