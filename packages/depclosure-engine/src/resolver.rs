//! Dependent resolver: which packages break when a source package goes away.
//!
//! A provided symbol only counts when it is *exclusive* to the source package:
//! if any other surviving package provides it too, the requirers are still
//! satisfied and the symbol is elided. Providers whose name is in the
//! [`IgnoreSet`] are treated as going away as well.

use crate::error::Result;
use crate::index::PackageIndex;
use crate::package::{bare_symbol, file_provide, glob_safe_symbol, PackageRef};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Names of packages that are assumed to be removed along with the roots.
///
/// Seeded with the binary names of every requested root. Only the closure
/// walker extends it, once per newly discovered dependent source name; the
/// resolver only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    names: BTreeSet<String>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub(crate) fn extend<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.names.extend(names);
    }
}

/// Result of one resolver call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents {
    /// False when the source package has no binaries in the snapshot
    pub in_repo: bool,
    /// Dependent package → capabilities it needs exclusively from the source
    pub requirers: BTreeMap<PackageRef, BTreeSet<String>>,
}

impl Dependents {
    pub fn is_empty(&self) -> bool {
        self.requirers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirers.len()
    }
}

/// Finds the packages depending exclusively on one source package.
#[derive(Clone)]
pub struct DependentResolver {
    index: Arc<PackageIndex>,
}

impl DependentResolver {
    pub fn new(index: Arc<PackageIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<PackageIndex> {
        &self.index
    }

    /// Packages that lose a provider when `source_name` is removed.
    ///
    /// Requirers built from `source_name` itself (including its own `src`
    /// package) are never reported.
    pub fn find_dependents(&self, source_name: &str, ignore: &IgnoreSet) -> Result<Dependents> {
        let in_repo = self.index.contains_source(source_name)?;
        if !in_repo {
            warn!("Package {} not found in repo", source_name);
        }

        let binaries = self.index.by_source(source_name)?;
        let own: HashSet<&PackageRef> = binaries.iter().collect();

        let mut provides = BTreeSet::new();
        for pkg in binaries {
            provides.extend(pkg.provides.iter().cloned());
            provides.extend(pkg.files.iter().map(|path| file_provide(path)));
        }

        let query = self.index.query();
        let mut exclusive: HashMap<String, bool> = HashMap::new();
        let mut requirers: BTreeMap<PackageRef, BTreeSet<String>> = BTreeMap::new();

        for capability in &provides {
            let bare = bare_symbol(capability);
            if bare.is_empty() {
                continue;
            }
            let symbol = glob_safe_symbol(bare);

            let is_exclusive = match exclusive.get(&*symbol) {
                Some(cached) => *cached,
                None => {
                    let verdict = !self.has_surviving_provider(&symbol, &own, ignore);
                    exclusive.insert(symbol.to_string(), verdict);
                    verdict
                }
            };
            if !is_exclusive {
                continue;
            }

            for requirer in query.what_requires(&symbol) {
                if own.contains(&requirer) || (requirer.is_source() && requirer.name == source_name)
                {
                    continue;
                }
                requirers
                    .entry(requirer)
                    .or_default()
                    .insert(capability.clone());
            }
        }

        Ok(Dependents { in_repo, requirers })
    }

    /// True as soon as one provider is neither ignored nor built from the
    /// source being checked. Repository presence counts as installable.
    fn has_surviving_provider(
        &self,
        symbol: &str,
        own: &HashSet<&PackageRef>,
        ignore: &IgnoreSet,
    ) -> bool {
        for provider in self.index.query().what_provides(symbol) {
            if ignore.contains(&provider.name) {
                debug!("Ignoring provider package {}", provider.name);
                continue;
            }
            if !own.contains(&provider) {
                return true;
            }
        }
        false
    }
}
