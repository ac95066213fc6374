//! Package query capability.
//!
//! The engine never resolves dependencies itself; it asks a [`PackageQuery`]
//! which packages provide or require a symbol. [`crate::snapshot::SnapshotQuery`]
//! is the in-memory implementation over a repository snapshot.

use crate::package::PackageRef;
use globset::{GlobBuilder, GlobMatcher};

/// Read-only queries over one repository snapshot (binary and source packages).
///
/// Implementations must be safe for concurrent read-only use.
pub trait PackageQuery: Send + Sync {
    /// Every package of the snapshot, `src` packages included.
    fn packages(&self) -> Vec<PackageRef>;

    /// Packages providing `symbol`, either as a declared provide or, for
    /// paths, as a file. Glob metacharacters in `symbol` are honoured.
    fn what_provides(&self, symbol: &str) -> Vec<PackageRef>;

    /// Packages declaring a requirement on `symbol` (comparators ignored).
    fn what_requires(&self, symbol: &str) -> Vec<PackageRef>;

    /// Exact name/version/release lookup restricted to arch `src`.
    fn source_package(&self, name: &str, version: &str, release: &str) -> Option<PackageRef>;
}

/// A symbol as used in a provide/require query: exact, or a glob when it
/// contains `*` or `?`.
#[derive(Debug, Clone)]
pub enum SymbolPattern {
    Exact(String),
    Glob(GlobMatcher),
}

impl SymbolPattern {
    pub fn new(symbol: &str) -> Self {
        if !symbol.contains(['*', '?']) {
            return Self::Exact(symbol.to_string());
        }

        // '*' crosses '/' like fnmatch without FNM_PATHNAME
        match GlobBuilder::new(symbol).literal_separator(false).build() {
            Ok(glob) => Self::Glob(glob.compile_matcher()),
            Err(_) => Self::Exact(symbol.to_string()),
        }
    }

    pub fn is_glob(&self) -> bool {
        matches!(self, Self::Glob(_))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(symbol) => symbol == candidate,
            Self::Glob(matcher) => matcher.is_match(candidate),
        }
    }
}
