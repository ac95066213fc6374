//! Result of one closure run and the views the report layer derives from it.

use crate::enrichment::MetadataCache;
use crate::metadata::PackageMetadata;
use crate::walker::{DepChain, DependencyMap, WalkOutcome};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Roots split by whether anything depends on them and by how long their
/// status has been unchanged. Lists keep root order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootClassification {
    pub depended_on: Vec<String>,
    pub not_depended_on: Vec<String>,
    pub stale_depended_on: Vec<String>,
    pub stale_not_depended_on: Vec<String>,
    /// Dependents of the stale depended-on roots
    pub stale_breaking: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct ClosureReport {
    pub run_id: Uuid,
    pub dep_map: DependencyMap,
    pub dep_chain: DepChain,
    pub not_in_repo: BTreeSet<String>,
    pub incomplete: BTreeSet<String>,
    pub metadata: MetadataCache,
}

impl ClosureReport {
    pub fn new(run_id: Uuid, outcome: WalkOutcome, metadata: MetadataCache) -> Self {
        Self {
            run_id,
            dep_map: outcome.dep_map,
            dep_chain: outcome.dep_chain,
            not_in_repo: outcome.not_in_repo,
            incomplete: outcome.incomplete,
            metadata,
        }
    }

    /// Roots in walk order
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.dep_map.keys().map(String::as_str)
    }

    /// Whether anything breaks when `root` is removed
    pub fn is_depended_on(&self, root: &str) -> bool {
        self.dep_map.get(root).is_some_and(|deps| !deps.is_empty())
    }

    pub fn is_incomplete(&self, root: &str) -> bool {
        self.incomplete.contains(root)
    }

    /// Every dependent source package across all roots
    pub fn breaking_packages(&self) -> BTreeSet<String> {
        self.dep_map
            .values()
            .flat_map(|deps| deps.keys().cloned())
            .collect()
    }

    pub fn metadata_for(&self, name: &str) -> Option<&PackageMetadata> {
        self.metadata.get(name).and_then(Option::as_ref)
    }

    /// Sorted people of `name`; empty when metadata is unavailable.
    pub fn people_for(&self, name: &str) -> Vec<String> {
        self.metadata_for(name)
            .map(|meta| meta.people.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// person → roots they are affected by, either as (co)maintainer of the
    /// root or of a package depending on it. The orphan account is skipped.
    pub fn affected_people(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut affected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (root, deps) in &self.dep_map {
            let packages = std::iter::once(root).chain(deps.keys());
            for package in packages {
                let Some(meta) = self.metadata_for(package) else {
                    continue;
                };
                for person in meta.maintainers() {
                    affected
                        .entry(person.to_string())
                        .or_default()
                        .insert(root.clone());
                }
            }
        }
        affected
    }

    /// Whether `name` has gone at least `week_limit` whole weeks without a
    /// status change. Unknown metadata is never stale.
    pub fn is_stale(&self, name: &str, week_limit: u32, now: DateTime<Utc>) -> bool {
        self.metadata_for(name)
            .is_some_and(|meta| meta.weeks_since_change(now) >= i64::from(week_limit))
    }

    pub fn stale_roots(&self, week_limit: u32, now: DateTime<Utc>) -> Vec<String> {
        self.roots()
            .filter(|root| self.is_stale(root, week_limit, now))
            .map(str::to_string)
            .collect()
    }

    /// Dependents of every stale root that something depends on
    pub fn stale_breaking(&self, week_limit: u32, now: DateTime<Utc>) -> BTreeSet<String> {
        self.dep_map
            .iter()
            .filter(|(root, _)| self.is_stale(root, week_limit, now))
            .flat_map(|(_, deps)| deps.keys().cloned())
            .collect()
    }

    pub fn classify(&self, week_limit: u32, now: DateTime<Utc>) -> RootClassification {
        let mut classes = RootClassification::default();
        for root in self.roots() {
            let stale = self.is_stale(root, week_limit, now);
            if self.is_depended_on(root) {
                classes.depended_on.push(root.to_string());
                if stale {
                    classes.stale_depended_on.push(root.to_string());
                }
            } else {
                classes.not_depended_on.push(root.to_string());
                if stale {
                    classes.stale_not_depended_on.push(root.to_string());
                }
            }
        }
        classes.stale_breaking = self.stale_breaking(week_limit, now);
        classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ORPHAN_UID;
    use crate::package::BinaryPackage;
    use chrono::Duration;
    use std::sync::Arc;

    fn meta(people: &[&str]) -> Option<PackageMetadata> {
        let at = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        Some(PackageMetadata::new(people.iter().copied(), at))
    }

    fn report() -> ClosureReport {
        let bar = Arc::new(BinaryPackage::new("bar", "1.0", "1", "x86_64"));
        let mut outcome = WalkOutcome::default();
        outcome.dep_map.insert(
            "libfoo".to_string(),
            BTreeMap::from([(
                "bar-src".to_string(),
                BTreeMap::from([(bar, BTreeSet::from(["libfoo.so()(64bit)".to_string()]))]),
            )]),
        );
        outcome.dep_map.insert("leaf".to_string(), BTreeMap::new());

        let metadata = MetadataCache::from([
            ("libfoo".to_string(), meta(&[ORPHAN_UID])),
            ("bar-src".to_string(), meta(&["bob", "alice"])),
            ("leaf".to_string(), meta(&["carol"])),
            ("gone".to_string(), None),
        ]);
        ClosureReport::new(Uuid::new_v4(), outcome, metadata)
    }

    #[test]
    fn test_breaking_packages() {
        let r = report();
        assert_eq!(r.breaking_packages(), BTreeSet::from(["bar-src".to_string()]));
        assert!(r.is_depended_on("libfoo"));
        assert!(!r.is_depended_on("leaf"));
        assert!(!r.is_depended_on("unknown"));
    }

    #[test]
    fn test_people_for_missing_metadata() {
        let r = report();
        assert_eq!(r.people_for("bar-src"), vec!["alice", "bob"]);
        assert!(r.people_for("gone").is_empty());
        assert!(r.people_for("never-fetched").is_empty());
    }

    #[test]
    fn test_affected_people_excludes_orphan() {
        let affected = report().affected_people();

        assert!(!affected.contains_key(ORPHAN_UID));
        assert_eq!(affected["alice"], BTreeSet::from(["libfoo".to_string()]));
        assert_eq!(affected["carol"], BTreeSet::from(["leaf".to_string()]));
    }

    #[test]
    fn test_stale_views() {
        let r = report();
        let changed = DateTime::from_timestamp(1_600_000_000, 0).unwrap();

        let early = changed + Duration::weeks(5) + Duration::days(6);
        assert!(r.stale_roots(6, early).is_empty());
        assert!(r.stale_breaking(6, early).is_empty());

        let late = changed + Duration::weeks(6);
        assert_eq!(r.stale_roots(6, late), vec!["leaf", "libfoo"]);
        assert_eq!(r.stale_breaking(6, late), BTreeSet::from(["bar-src".to_string()]));
        assert!(!r.is_stale("gone", 0, late));
    }

    #[test]
    fn test_classify_roots() {
        let r = report();
        let late = DateTime::from_timestamp(1_600_000_000, 0).unwrap() + Duration::weeks(10);

        let classes = r.classify(6, late);
        assert_eq!(classes.depended_on, vec!["libfoo"]);
        assert_eq!(classes.not_depended_on, vec!["leaf"]);
        assert_eq!(classes.stale_depended_on, vec!["libfoo"]);
        assert_eq!(classes.stale_not_depended_on, vec!["leaf"]);
        assert_eq!(classes.stale_breaking, BTreeSet::from(["bar-src".to_string()]));

        let fresh = r.classify(52, late);
        assert!(fresh.stale_depended_on.is_empty());
        assert!(fresh.stale_breaking.is_empty());
        assert_eq!(fresh.depended_on, vec!["libfoo"]);
    }
}
