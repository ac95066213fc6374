//! Closure engine: one run = walk + concurrent metadata enrichment.

use crate::config::EngineConfig;
use crate::enrichment::EnrichmentPipeline;
use crate::error::{ClosureError, Result};
use crate::index::PackageIndex;
use crate::metadata::MetadataSource;
use crate::pagure::PagureClient;
use crate::query::PackageQuery;
use crate::report::{ClosureReport, RootClassification};
use crate::snapshot::{RepoSnapshot, SnapshotQuery};
use crate::walker::ClosureWalker;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

pub struct ClosureEngine {
    index: Arc<PackageIndex>,
    metadata: Arc<dyn MetadataSource>,
    config: EngineConfig,
}

impl ClosureEngine {
    pub fn new(
        query: Arc<dyn PackageQuery>,
        metadata: Arc<dyn MetadataSource>,
        config: EngineConfig,
    ) -> Self {
        Self {
            index: Arc::new(PackageIndex::new(query)),
            metadata,
            config,
        }
    }

    pub fn from_snapshot(
        snapshot: RepoSnapshot,
        metadata: Arc<dyn MetadataSource>,
        config: EngineConfig,
    ) -> Self {
        Self::new(Arc::new(SnapshotQuery::new(snapshot)), metadata, config)
    }

    /// Engine backed by the registry configured in `config.registry`
    pub fn with_registry(query: Arc<dyn PackageQuery>, config: EngineConfig) -> Result<Self> {
        let client = PagureClient::new(config.registry.clone())?;
        Ok(Self::new(query, Arc::new(client), config))
    }

    pub fn index(&self) -> &Arc<PackageIndex> {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify the roots of `report` against the configured week limit
    pub fn classify(&self, report: &ClosureReport) -> RootClassification {
        report.classify(self.config.week_limit, Utc::now())
    }

    /// Walk the closure of `roots` while fetching metadata for every
    /// discovered package, then wait for the fetches to finish.
    ///
    /// The walk runs on the blocking pool; the pipeline workers keep running
    /// on the async runtime meanwhile.
    pub async fn run(&self, roots: &[String]) -> Result<ClosureReport> {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        info!(
            "Closure run {}: {} roots, max_deps={}, workers={}",
            run_id,
            roots.len(),
            self.config.max_deps,
            self.config.workers
        );

        let pipeline = EnrichmentPipeline::start(
            self.config.workers,
            Arc::clone(&self.metadata),
            self.config.registry.branch.clone(),
        );
        let queue = pipeline.queue();
        let walker = ClosureWalker::new(Arc::clone(&self.index), self.config.max_deps);
        let roots = roots.to_vec();

        let outcome = match tokio::task::spawn_blocking(move || walker.walk(&roots, &queue)).await
        {
            Ok(result) => result?,
            Err(e) => {
                error!("Closure run {} aborted: {}", run_id, e);
                return Err(ClosureError::WalkAborted(e.to_string()));
            }
        };

        info!("Waiting for (co)maintainer information...");
        let metadata = pipeline.finish().await;

        info!(
            "Closure run {} done in {}ms: {} roots, {} incomplete, {} packages enriched",
            run_id,
            start.elapsed().as_millis(),
            outcome.dep_map.len(),
            outcome.incomplete.len(),
            metadata.len()
        );
        Ok(ClosureReport::new(run_id, outcome, metadata))
    }
}
