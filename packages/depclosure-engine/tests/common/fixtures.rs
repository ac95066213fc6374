//! Canned snapshots and metadata

use super::builders::SnapshotBuilder;
use chrono::{DateTime, Utc};
use depclosure_engine::{PackageMetadata, StaticMetadataSource};

/// Fixed status-change date: 2020-09-13T12:26:40Z
pub const STATUS_CHANGE_EPOCH: i64 = 1_600_000_000;

pub fn roots(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn status_change() -> DateTime<Utc> {
    DateTime::from_timestamp(STATUS_CHANGE_EPOCH, 0).unwrap_or_default()
}

pub fn metadata(people: &[&str]) -> PackageMetadata {
    PackageMetadata::new(people.iter().copied(), status_change())
}

/// `libfoo` exclusively provides `libfoo.so()(64bit)`, required by `bar`
/// (built from `bar-src`).
pub fn libfoo_snapshot() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .binary("libfoo", "libfoo", &["libfoo.so()(64bit)", "libfoo = 1.0-1.fc40"], &[])
        .binary("bar", "bar-src", &[], &["libfoo.so()(64bit)"])
}

/// `core` provides `libcore.so`, required by `n` binaries each built from its
/// own source package `dep-NN`.
pub fn fan_out_snapshot(n: usize) -> SnapshotBuilder {
    let mut builder = SnapshotBuilder::new().binary("core", "core", &["libcore.so"], &[]);
    for i in 0..n {
        let name = format!("dep-{i:02}");
        builder = builder.binary(&name, &name, &[], &["libcore.so"]);
    }
    builder
}

/// libfoo ← bar (bar-src) ← baz (baz-src) ← qux (qux-src)
pub fn chain_snapshot() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .binary("libfoo", "libfoo", &["libfoo.so()(64bit)"], &[])
        .binary("bar", "bar-src", &["libbar.so"], &["libfoo.so()(64bit)"])
        .binary("baz", "baz-src", &["baz"], &["libbar.so"])
        .binary("qux", "qux-src", &[], &["baz >= 1.0"])
}

pub fn metadata_source() -> StaticMetadataSource {
    StaticMetadataSource::new()
        .with("libfoo", metadata(&["orphan"]))
        .with("bar-src", metadata(&["alice", "bob"]))
        .with("baz-src", metadata(&["carol"]))
}
