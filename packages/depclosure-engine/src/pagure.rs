//! Pagure registry client.
//!
//! Fetches `{base_url}/api/0/{namespace}/{package}` and turns the project
//! document into [`PackageMetadata`]. Transient failures (connection errors,
//! 429, 5xx) are retried with capped exponential backoff; everything else
//! gives up immediately. A package the registry does not know is `None`, never
//! an error.

use crate::config::RegistryConfig;
use crate::error::{ClosureError, ErrorCategory, Result};
use crate::metadata::{MetadataSource, PackageMetadata};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct PagureClient {
    client: reqwest::Client,
    config: RegistryConfig,
}

enum Attempt {
    Done(Option<PackageMetadata>),
    Retry(String),
}

impl PagureClient {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClosureError::registry(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn project_url(&self, package: &str) -> String {
        format!(
            "{}/api/0/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.namespace,
            package
        )
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let backoff_ms = self
            .config
            .backoff_ms
            .saturating_mul(2_u64.saturating_pow(exponent))
            .min(self.config.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(err) => return Attempt::Retry(format!("request failed: {err}")),
        };

        let status = response.status();
        if !status.is_success() {
            if ErrorCategory::from_status(status.as_u16()).is_retryable() {
                return Attempt::Retry(format!("status={status}"));
            }
            debug!("Registry answered {} for {}", status, url);
            return Attempt::Done(None);
        }

        match response.json::<Value>().await {
            Ok(doc) => Attempt::Done(PackageMetadata::from_project_document(&doc)),
            Err(err) => {
                warn!("Malformed project document from {}: {}", url, err);
                Attempt::Done(None)
            }
        }
    }
}

#[async_trait]
impl MetadataSource for PagureClient {
    async fn fetch(&self, package: &str) -> Option<PackageMetadata> {
        let url = self.project_url(package);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.attempt(&url).await {
                Attempt::Done(metadata) => return metadata,
                Attempt::Retry(reason) if attempt < self.config.max_attempts => {
                    debug!(
                        "Retrying {} on {} (attempt {}): {}",
                        package, self.config.branch, attempt, reason
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Attempt::Retry(reason) => {
                    warn!(
                        "Error getting pagure info for {}/{} on {}: {}",
                        self.config.namespace, package, self.config.branch, reason
                    );
                    return None;
                }
            }
        }
    }
}
