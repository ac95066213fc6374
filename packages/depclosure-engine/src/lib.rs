/*
 * Depclosure Engine - Package Removal Impact Analysis
 *
 * Given source packages about to be removed from a distribution, find every
 * package that breaks transitively and who maintains it.
 *
 * Architecture:
 * - Package Index (source ↔ binary, memoized source resolution)
 * - Dependent Resolver (exclusive provide/require elision)
 * - Closure Walker (bounded BFS per root)
 * - Enrichment Pipeline (worker pool, fetch-once metadata cache)
 */

// Public modules
pub mod config;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod index;
pub mod metadata;
pub mod observability;
pub mod package;
pub mod pagure;
pub mod query;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod walker;

// Re-exports
pub use config::{ConfigError, EngineConfig, RegistryConfig, ReleasePreset, SnapshotSources};
pub use engine::ClosureEngine;
pub use enrichment::{EnrichmentPipeline, EnrichmentQueue, MetadataCache};
pub use error::{ClosureError, ErrorCategory, Result};
pub use export::AffectedExport;
pub use index::PackageIndex;
pub use metadata::{MetadataSource, PackageMetadata, StaticMetadataSource, ORPHAN_UID};
pub use observability::init_tracing;
pub use package::{BinaryPackage, PackageRef, SourceRpm};
pub use pagure::PagureClient;
pub use query::{PackageQuery, SymbolPattern};
pub use report::{ClosureReport, RootClassification};
pub use resolver::{DependentResolver, Dependents, IgnoreSet};
pub use snapshot::{RepoSnapshot, SnapshotQuery};
pub use walker::{
    admit_owners, budget_cap, remaining_capacity, BudgetDecision, ClosureWalker, DepChain,
    DependencyMap, DiscoverySink, Edges, NoopSink, WalkOutcome,
};
