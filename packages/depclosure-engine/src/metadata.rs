//! Per-package ownership metadata and the capability that fetches it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration as StdDuration;

/// Placeholder account that owns orphaned packages
pub const ORPHAN_UID: &str = "orphan";

const ACCESS_KINDS: [&str; 2] = ["access_users", "access_groups"];

/// Who maintains a package and when its status last changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Users and groups with any access level, sorted
    pub people: BTreeSet<String>,
    pub status_change: DateTime<Utc>,
}

impl PackageMetadata {
    pub fn new<I, S>(people: I, status_change: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            people: people.into_iter().map(Into::into).collect(),
            status_change,
        }
    }

    /// Build from a registry project document.
    ///
    /// `None` when the document reports an error or carries no usable date.
    /// `date_modified` wins over `date_created`; both are epoch seconds, as a
    /// string or a number.
    pub fn from_project_document(doc: &Value) -> Option<Self> {
        let fields = doc.as_object()?;
        if fields.contains_key("error") {
            return None;
        }

        let mut people = BTreeSet::new();
        for kind in ACCESS_KINDS {
            let Some(levels) = fields.get(kind).and_then(Value::as_object) else {
                continue;
            };
            for persons in levels.values().filter_map(Value::as_array) {
                people.extend(persons.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }

        let raw = fields
            .get("date_modified")
            .or_else(|| fields.get("date_created"))?;
        let epoch = match raw {
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Number(n) => n.as_f64()?,
            _ => return None,
        };

        Some(Self {
            people,
            status_change: from_epoch_seconds(epoch)?,
        })
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.status_change
    }

    pub fn weeks_since_change(&self, now: DateTime<Utc>) -> i64 {
        self.age(now).num_days() / 7
    }

    /// People other than the orphan placeholder
    pub fn maintainers(&self) -> impl Iterator<Item = &str> {
        self.people
            .iter()
            .map(String::as_str)
            .filter(|p| *p != ORPHAN_UID)
    }

    pub fn is_orphaned(&self) -> bool {
        self.people.contains(ORPHAN_UID)
    }
}

fn from_epoch_seconds(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let secs = epoch.floor();
    let nanos = ((epoch - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// Source of package metadata.
///
/// A fetch that fails for any reason yields `None`; the pipeline records that
/// as "metadata unavailable" and never retries it.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, package: &str) -> Option<PackageMetadata>;
}

/// In-memory metadata source with per-package fetch accounting.
#[derive(Debug, Default)]
pub struct StaticMetadataSource {
    entries: HashMap<String, PackageMetadata>,
    fetches: DashMap<String, usize>,
    delay: Option<StdDuration>,
}

impl StaticMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, package: impl Into<String>, metadata: PackageMetadata) -> Self {
        self.entries.insert(package.into(), metadata);
        self
    }

    /// Sleep before answering, to exercise concurrent enqueues
    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self, package: &str) -> usize {
        self.fetches.get(package).map(|n| *n).unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.iter().map(|entry| *entry.value()).sum()
    }
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    async fn fetch(&self, package: &str) -> Option<PackageMetadata> {
        *self.fetches.entry(package.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.entries.get(package).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_people_are_union_of_users_and_groups() {
        let doc = json!({
            "access_users": {"owner": ["alice"], "commit": ["bob", "alice"], "admin": []},
            "access_groups": {"commit": ["python-sig"]},
            "date_created": "1600000000",
        });

        let meta = PackageMetadata::from_project_document(&doc).unwrap();
        let people: Vec<&str> = meta.people.iter().map(String::as_str).collect();
        assert_eq!(people, vec!["alice", "bob", "python-sig"]);
    }

    #[test]
    fn test_date_modified_preferred() {
        let doc = json!({
            "access_users": {},
            "access_groups": {},
            "date_created": "1500000000",
            "date_modified": 1600000000.5,
        });

        let meta = PackageMetadata::from_project_document(&doc).unwrap();
        assert_eq!(meta.status_change.timestamp(), 1_600_000_000);
        assert_eq!(meta.status_change.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_error_document_is_not_found() {
        let doc = json!({"error": "Project not found", "error_code": "ENOPROJECT"});
        assert!(PackageMetadata::from_project_document(&doc).is_none());
    }

    #[test]
    fn test_missing_date_is_unusable() {
        let doc = json!({"access_users": {"owner": ["alice"]}});
        assert!(PackageMetadata::from_project_document(&doc).is_none());
    }

    #[test]
    fn test_age_in_weeks() {
        let meta = PackageMetadata::new(["alice"], at(0));
        let now = at(3 * 7 * 86_400 + 86_400);
        assert_eq!(meta.weeks_since_change(now), 3);
        assert_eq!(meta.age(now).num_days(), 22);
    }

    #[test]
    fn test_orphan_filtered_from_maintainers() {
        let meta = PackageMetadata::new([ORPHAN_UID, "bob"], at(0));
        assert!(meta.is_orphaned());
        assert_eq!(meta.maintainers().collect::<Vec<_>>(), vec!["bob"]);
    }

    #[tokio::test]
    async fn test_static_source_counts_fetches() {
        let source = StaticMetadataSource::new().with("foo", PackageMetadata::new(["alice"], at(0)));

        assert!(source.fetch("foo").await.is_some());
        assert!(source.fetch("bar").await.is_none());
        assert!(source.fetch("foo").await.is_some());

        assert_eq!(source.fetch_count("foo"), 2);
        assert_eq!(source.fetch_count("bar"), 1);
        assert_eq!(source.total_fetches(), 3);
    }
}
