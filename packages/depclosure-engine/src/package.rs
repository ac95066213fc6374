//! Package types and symbol helpers.

use crate::error::{ClosureError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Architecture marker of source packages
pub const SOURCE_ARCH: &str = "src";

const SOURCE_RPM_SUFFIX: &str = ".src.rpm";

/// Shared handle to a package of the snapshot.
pub type PackageRef = Arc<BinaryPackage>;

/// One package of a repository snapshot (binary or `src`).
///
/// Identity is name, version, release and architecture. Capability lists and
/// the source reference do not take part in equality, hashing or ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryPackage {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    /// Provided symbols, optionally with a comparator suffix ("foo = 1.0-1")
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    /// Source rpm file name, e.g. "foo-1.0-1.fc40.src.rpm" (absent for `src`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_rpm: Option<String>,
}

impl BinaryPackage {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
            provides: Vec::new(),
            requires: Vec::new(),
            files: Vec::new(),
            source_rpm: None,
        }
    }

    pub fn is_source(&self) -> bool {
        self.arch == SOURCE_ARCH
    }

    /// Parse the declared source reference.
    pub fn source_ref(&self) -> Result<SourceRpm> {
        let raw = self.source_rpm.as_deref().ok_or_else(|| {
            ClosureError::InvalidSourceRpm(format!("{} declares no source rpm", self))
        })?;
        SourceRpm::parse(raw)
    }

    fn identity(&self) -> (&str, &str, &str, &str) {
        (&self.name, &self.version, &self.release, &self.arch)
    }
}

impl PartialEq for BinaryPackage {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for BinaryPackage {}

impl Hash for BinaryPackage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for BinaryPackage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BinaryPackage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for BinaryPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}.{}",
            self.name, self.version, self.release, self.arch
        )
    }
}

/// Name/version/release triple of a source package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRpm {
    pub name: String,
    pub version: String,
    pub release: String,
}

impl SourceRpm {
    /// Parse "name-version-release.src.rpm". The name itself may contain '-'.
    pub fn parse(raw: &str) -> Result<Self> {
        let stem = raw.split(SOURCE_RPM_SUFFIX).next().unwrap_or(raw);

        let mut parts = stem.rsplitn(3, '-');
        let release = parts.next().filter(|s| !s.is_empty());
        let version = parts.next().filter(|s| !s.is_empty());
        let name = parts.next().filter(|s| !s.is_empty());

        match (name, version, release) {
            (Some(name), Some(version), Some(release)) => Ok(Self {
                name: name.to_string(),
                version: version.to_string(),
                release: release.to_string(),
            }),
            _ => Err(ClosureError::InvalidSourceRpm(raw.to_string())),
        }
    }
}

impl fmt::Display for SourceRpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.version, self.release)
    }
}

/// Strip the comparator and version from a capability: "foo >= 1.0" -> "foo".
pub fn bare_symbol(capability: &str) -> &str {
    capability.split_whitespace().next().unwrap_or("")
}

/// Provide synthesized from a file path: a single leading separator,
/// no empty or "." components, ".." resolved.
pub fn file_provide(path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    format!("/{}", components.join("/"))
}

/// Provide queries treat '[' and ']' in paths as glob classes; replace them
/// with single-character wildcards so the literal path still matches.
pub fn glob_safe_symbol(symbol: &str) -> Cow<'_, str> {
    if symbol.starts_with('/') && symbol.contains(['[', ']']) {
        Cow::Owned(symbol.replace(['[', ']'], "?"))
    } else {
        Cow::Borrowed(symbol)
    }
}
