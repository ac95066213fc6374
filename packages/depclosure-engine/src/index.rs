/// Source/binary package index
///
/// Provides the two lookups the closure walk is built on:
/// - `by_source`: source package name → binary packages built from it
/// - `by_binary`: binary package → owning source package name
///
/// Both maps are built lazily on first access with a single O(N) scan and are
/// never mutated afterwards. Source resolution (NVR → `src` package) is
/// memoized per index instance, so several indices (one per release) do not
/// share state.
use crate::error::{ClosureError, Result};
use crate::package::{PackageRef, SourceRpm};
use crate::query::PackageQuery;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Default, PartialEq, Eq)]
struct IndexMaps {
    by_source: HashMap<String, Vec<PackageRef>>,
    by_binary: HashMap<PackageRef, String>,
}

pub struct PackageIndex {
    query: Arc<dyn PackageQuery>,
    maps: OnceCell<IndexMaps>,
    /// (name, version, release) → `src` package
    source_cache: DashMap<SourceRpm, PackageRef>,
}

impl PackageIndex {
    pub fn new(query: Arc<dyn PackageQuery>) -> Self {
        Self {
            query,
            maps: OnceCell::new(),
            source_cache: DashMap::new(),
        }
    }

    pub fn query(&self) -> &Arc<dyn PackageQuery> {
        &self.query
    }

    /// Whether the mappings have been built yet
    pub fn is_built(&self) -> bool {
        self.maps.get().is_some()
    }

    /// Resolve the `src` package a binary package was built from.
    ///
    /// A missing source package means the snapshot is incomplete and is
    /// reported as [`ClosureError::SourceNotFound`].
    pub fn resolve_source(&self, package: &PackageRef) -> Result<PackageRef> {
        let srpm = package.source_ref()?;

        if let Some(hit) = self.source_cache.get(&srpm) {
            return Ok(Arc::clone(hit.value()));
        }

        let source = self
            .query
            .source_package(&srpm.name, &srpm.version, &srpm.release)
            .ok_or_else(|| {
                error!("Cannot find a source rpm for {}", srpm);
                ClosureError::source_not_found(&srpm.name, &srpm.version, &srpm.release)
            })?;

        self.source_cache.insert(srpm, Arc::clone(&source));
        Ok(source)
    }

    /// Binary packages built from `name`; empty for unknown names.
    pub fn by_source(&self, name: &str) -> Result<&[PackageRef]> {
        Ok(self
            .maps()?
            .by_source
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    pub fn contains_source(&self, name: &str) -> Result<bool> {
        Ok(self.maps()?.by_source.contains_key(name))
    }

    /// Owning source name of a binary package (`None` for `src` packages).
    pub fn by_binary(&self, package: &PackageRef) -> Result<Option<&str>> {
        Ok(self.maps()?.by_binary.get(package).map(String::as_str))
    }

    /// Source name a package belongs to; a `src` package belongs to itself.
    pub fn owner_name(&self, package: &PackageRef) -> Result<String> {
        if package.is_source() {
            return Ok(package.name.clone());
        }
        match self.by_binary(package)? {
            Some(name) => Ok(name.to_string()),
            None => Ok(self.resolve_source(package)?.name.clone()),
        }
    }

    /// Number of distinct source names with at least one binary
    pub fn source_count(&self) -> Result<usize> {
        Ok(self.maps()?.by_source.len())
    }

    fn maps(&self) -> Result<&IndexMaps> {
        self.maps.get_or_try_init(|| self.build())
    }

    fn build(&self) -> Result<IndexMaps> {
        let mut maps = IndexMaps::default();
        let packages = self.query.packages();
        debug!("Indexing {} packages", packages.len());

        for package in packages {
            if package.is_source() {
                continue;
            }
            let source = self.resolve_source(&package)?;
            maps.by_source
                .entry(source.name.clone())
                .or_default()
                .push(Arc::clone(&package));
            maps.by_binary.insert(package, source.name.clone());
        }

        info!(
            "Indexed {} binary packages from {} source packages",
            maps.by_binary.len(),
            maps.by_source.len()
        );
        Ok(maps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::BinaryPackage;
    use crate::snapshot::{RepoSnapshot, SnapshotQuery};

    fn binary(name: &str, source: &str) -> BinaryPackage {
        let mut pkg = BinaryPackage::new(name, "1.0", "1", "x86_64");
        pkg.source_rpm = Some(format!("{source}-2.0-3.fc40.src.rpm"));
        pkg
    }

    fn source(name: &str) -> BinaryPackage {
        BinaryPackage::new(name, "2.0", "3.fc40", "src")
    }

    fn index(packages: Vec<BinaryPackage>) -> PackageIndex {
        PackageIndex::new(Arc::new(SnapshotQuery::new(RepoSnapshot::new(packages))))
    }

    #[test]
    fn test_lazy_construction() {
        let idx = index(vec![binary("foo-libs", "foo"), source("foo")]);
        assert!(!idx.is_built());

        let bins = idx.by_source("foo").unwrap();
        assert!(idx.is_built());
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].name, "foo-libs");
    }

    #[test]
    fn test_by_source_groups_binaries() {
        let idx = index(vec![
            binary("foo", "foo"),
            binary("foo-devel", "foo"),
            binary("bar", "bar"),
            source("foo"),
            source("bar"),
        ]);

        let names: Vec<&str> = idx
            .by_source("foo")
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["foo", "foo-devel"]);
        assert_eq!(idx.source_count().unwrap(), 2);
    }

    #[test]
    fn test_unknown_source_is_empty() {
        let idx = index(vec![binary("foo", "foo"), source("foo")]);
        assert!(idx.by_source("ghost").unwrap().is_empty());
        assert!(!idx.contains_source("ghost").unwrap());
    }

    #[test]
    fn test_by_binary_and_owner() {
        let idx = index(vec![binary("foo-libs", "foo"), source("foo")]);
        let libs = Arc::clone(&idx.by_source("foo").unwrap()[0]);
        assert_eq!(idx.by_binary(&libs).unwrap(), Some("foo"));
        assert_eq!(idx.owner_name(&libs).unwrap(), "foo");

        let src = Arc::new(source("foo"));
        assert_eq!(idx.by_binary(&src).unwrap(), None);
        assert_eq!(idx.owner_name(&src).unwrap(), "foo");
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let idx = index(vec![binary("orphaned", "gone")]);
        let err = idx.by_source("gone").unwrap_err();
        assert!(matches!(err, ClosureError::SourceNotFound { ref name, .. } if name == "gone"));
    }

    #[test]
    fn test_source_resolution_is_memoized() {
        let idx = index(vec![binary("foo", "foo"), binary("foo-devel", "foo"), source("foo")]);
        idx.by_source("foo").unwrap();
        assert_eq!(idx.source_cache.len(), 1);
    }

    #[test]
    fn test_indexing_is_idempotent() {
        let packages = vec![
            binary("foo", "foo"),
            binary("bar", "bar"),
            source("foo"),
            source("bar"),
        ];
        let first = index(packages.clone());
        let second = index(packages);
        assert_eq!(first.maps().unwrap(), second.maps().unwrap());
    }
}
