/// Bounded breadth-first closure walk
///
/// For every root source package, repeatedly asks the resolver who breaks when
/// the package under check goes away, and keeps walking into the owners of
/// those dependents until the work list is empty or the root's budget of
/// distinct dependent source packages is exhausted.
///
/// Each expansion is staged:
/// 1. Group: resolver output grouped by owning source name
/// 2. Admit: [`admit_owners`] decides which owners fit the budget
/// 3. Commit: admitted edges go to `dep_map` and new names to the work list,
///    which is truncated by [`remaining_capacity`] once the root is marked
///    incomplete. Every owner, rejected or not, gets its `dep_chain` link and
///    is reported to the [`DiscoverySink`]
///
/// Example:
/// ```text
/// libfoo ← bar (bar-src) ← baz (baz-src)
///
/// walk(["libfoo"]):
/// - dep_map["libfoo"] = { bar-src: {bar: ..}, baz-src: {baz: ..} }
/// - dep_chain = { libfoo: {}, bar-src: {libfoo}, baz-src: {bar-src} }
/// ```
use crate::error::Result;
use crate::index::PackageIndex;
use crate::package::PackageRef;
use crate::resolver::{DependentResolver, IgnoreSet};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dependent package → capabilities it needs
pub type Edges = BTreeMap<PackageRef, BTreeSet<String>>;

/// root → dependent source name → dependent package → capabilities
pub type DependencyMap = BTreeMap<String, BTreeMap<String, Edges>>;

/// dependent source name → source names whose removal pulled it in
pub type DepChain = BTreeMap<String, BTreeSet<String>>;

/// Everything one walk produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    pub dep_map: DependencyMap,
    pub dep_chain: DepChain,
    pub not_in_repo: BTreeSet<String>,
    pub incomplete: BTreeSet<String>,
}

/// Receives every source name the walk touches (roots first).
///
/// Called synchronously from the walk; implementations must not block.
pub trait DiscoverySink: Send + Sync {
    fn discovered(&self, name: &str);
}

/// Sink that drops every name
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiscoverySink for NoopSink {
    fn discovered(&self, _name: &str) {}
}

/// Budget verdict for one expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetDecision {
    /// Owners whose edges are committed, in input order
    pub admitted: Vec<String>,
    /// Owners dropped because the root already tracks `cap` source packages
    pub rejected: Vec<String>,
}

impl BudgetDecision {
    pub fn truncated(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Per-root cap on distinct dependent source packages
pub fn budget_cap(max_deps: i64) -> usize {
    usize::try_from(max_deps.max(0)).unwrap_or(usize::MAX)
}

/// Owners already tracked for the root are always admitted; new owners are
/// admitted while fewer than `cap` are tracked.
pub fn admit_owners<'a, I>(known: &BTreeSet<String>, owners: I, cap: usize) -> BudgetDecision
where
    I: IntoIterator<Item = &'a String>,
{
    let mut decision = BudgetDecision::default();
    let mut tracked = known.len();

    for owner in owners {
        if known.contains(owner) {
            decision.admitted.push(owner.clone());
        } else if tracked < cap {
            tracked += 1;
            decision.admitted.push(owner.clone());
        } else {
            decision.rejected.push(owner.clone());
        }
    }
    decision
}

/// How many queued names may still be expanded once a root is truncated
pub fn remaining_capacity(tracked: usize, cap: usize) -> usize {
    cap.saturating_sub(tracked)
}

/// Per-root walk state
struct RootWalk<'a> {
    root: &'a str,
    to_check: VecDeque<String>,
    seen: HashSet<String>,
    ignore: IgnoreSet,
    allow_more: bool,
}

pub struct ClosureWalker {
    resolver: DependentResolver,
    max_deps: i64,
}

impl ClosureWalker {
    pub fn new(index: Arc<PackageIndex>, max_deps: i64) -> Self {
        Self {
            resolver: DependentResolver::new(index),
            max_deps,
        }
    }

    pub fn max_deps(&self) -> i64 {
        self.max_deps
    }

    /// Walk every root in sorted order.
    ///
    /// Fails only when the snapshot itself is broken (unresolvable source
    /// reference); missing roots and truncation are recorded in the outcome.
    pub fn walk(&self, roots: &[String], sink: &dyn DiscoverySink) -> Result<WalkOutcome> {
        let roots: BTreeSet<&String> = roots.iter().collect();
        let index = self.resolver.index();

        let mut seed = Vec::new();
        for root in &roots {
            sink.discovered(root);
            seed.extend(index.by_source(root)?.iter().map(|pkg| pkg.name.clone()));
        }

        let mut outcome = WalkOutcome::default();
        for root in roots {
            self.walk_root(root, &seed, sink, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn walk_root(
        &self,
        root: &str,
        seed: &[String],
        sink: &dyn DiscoverySink,
        outcome: &mut WalkOutcome,
    ) -> Result<()> {
        info!("Getting packages depending on: {}", root);

        let cap = budget_cap(self.max_deps);
        let mut state = RootWalk {
            root,
            to_check: VecDeque::from([root.to_string()]),
            seen: HashSet::new(),
            ignore: IgnoreSet::seeded(seed.iter().cloned()),
            allow_more: true,
        };
        outcome.dep_map.entry(root.to_string()).or_default();
        outcome.dep_chain.entry(root.to_string()).or_default();

        while let Some(check_next) = state.to_check.pop_front() {
            debug!(
                "to_check ({}): {} {:?}",
                state.to_check.len() + 1,
                check_next,
                state.to_check
            );
            state.seen.insert(check_next.clone());

            let dependents = self.resolver.find_dependents(&check_next, &state.ignore)?;
            if !dependents.in_repo {
                outcome.not_in_repo.insert(check_next.clone());
            }
            if dependents.is_empty() {
                continue;
            }

            let grouped = self.group_by_owner(dependents.requirers)?;
            self.commit(&mut state, &check_next, grouped, cap, sink, outcome);
        }

        if outcome.incomplete.contains(root) {
            warn!(
                "More than {} broken deps for package '{}', dependency check not completed",
                self.max_deps, root
            );
        }
        Ok(())
    }

    fn group_by_owner(&self, requirers: Edges) -> Result<BTreeMap<String, Edges>> {
        let index = self.resolver.index();
        let mut grouped: BTreeMap<String, Edges> = BTreeMap::new();
        for (requirer, capabilities) in requirers {
            let owner = index.owner_name(&requirer)?;
            grouped.entry(owner).or_default().insert(requirer, capabilities);
        }
        Ok(grouped)
    }

    fn commit(
        &self,
        state: &mut RootWalk<'_>,
        check_next: &str,
        mut grouped: BTreeMap<String, Edges>,
        cap: usize,
        sink: &dyn DiscoverySink,
        outcome: &mut WalkOutcome,
    ) {
        let root_map = outcome.dep_map.entry(state.root.to_string()).or_default();
        let known: BTreeSet<String> = root_map.keys().cloned().collect();
        let decision = admit_owners(&known, grouped.keys(), cap);
        let owners: Vec<String> = grouped.keys().cloned().collect();

        let mut new_names: Vec<String> = Vec::new();
        for owner in &decision.admitted {
            let Some(edges) = grouped.remove(owner) else {
                continue;
            };

            if !state.to_check.contains(owner)
                && !new_names.contains(owner)
                && !state.seen.contains(owner)
            {
                new_names.push(owner.clone());
            }

            let tracked = root_map.entry(owner.clone()).or_default();
            for (requirer, capabilities) in edges {
                tracked.entry(requirer).or_default().extend(capabilities);
            }
        }

        // rejected owners still break, only their edges are left out
        for owner in owners {
            outcome
                .dep_chain
                .entry(owner.clone())
                .or_default()
                .insert(check_next.to_string());
            sink.discovered(&owner);
        }

        state.ignore.extend(new_names.iter().cloned());

        if state.allow_more {
            state.to_check.extend(new_names);

            let tracked = root_map.len();
            let distinct: BTreeSet<&String> =
                root_map.keys().chain(state.to_check.iter()).collect();

            if decision.truncated() || distinct.len() > cap {
                debug!(
                    "Dep count is {} (rejected {})",
                    distinct.len() + decision.rejected.len(),
                    decision.rejected.len()
                );
                outcome.incomplete.insert(state.root.to_string());
                state.allow_more = false;
                state.to_check.truncate(remaining_capacity(tracked, cap));
            }
        } else if decision.truncated() {
            outcome.incomplete.insert(state.root.to_string());
        }
    }
}
