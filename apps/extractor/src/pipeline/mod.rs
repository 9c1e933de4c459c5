//! Pipeline orchestrator: render, sanitize, extract, persist and cost one URL at a time.
//!
//! A failing URL becomes a `failed` or `no_data` record in the report; it never aborts the
//! rest of the batch. The only batch-level error is an unknown model id, checked before any
//! network traffic.

pub mod handlers;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cost::{CostEstimate, CostEstimator, ModelId};
use crate::extraction::{ExtractionClient, ExtractionError};
use crate::models::JobPostingsContainer;
use crate::renderer::{PageRenderer, RenderError};
use crate::sanitizer::{SanitizeError, Sanitizer};
use crate::storage::{ArtifactStore, StorageError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("render failed: {0}")]
    RenderFailure(#[from] RenderError),

    #[error("sanitize failed: {0}")]
    Sanitize(#[from] SanitizeError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("cost estimation failed: {0}")]
    Cost(ExtractionError),
}

/// What happened to one URL.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Extracted {
        postings: usize,
        usage: CostEstimate,
        raw_path: PathBuf,
        json_path: PathBuf,
        data: JobPostingsContainer,
    },
    NoData {
        raw_path: PathBuf,
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub url: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Extracted {
                postings,
                usage,
                json_path,
                ..
            } => write!(
                f,
                "{}: {postings} posting(s), {} input / {} output tokens, ${} -> {}",
                self.url,
                usage.input_tokens,
                usage.output_tokens,
                usage.cost,
                json_path.display()
            ),
            Outcome::NoData { reason, .. } => write!(f, "{}: no data ({reason})", self.url),
            Outcome::Failed { reason } => write!(f, "{}: failed ({reason})", self.url),
        }
    }
}

/// Results in input order plus usage totals over the extracted URLs.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub model: ModelId,
    pub results: Vec<PipelineResult>,
    pub total_input_tokens: usize,
    pub total_output_tokens: usize,
    pub total_cost: Decimal,
}

impl BatchReport {
    fn new(model: ModelId, results: Vec<PipelineResult>) -> Self {
        let usages = results.iter().filter_map(|r| match &r.outcome {
            Outcome::Extracted { usage, .. } => Some(usage),
            _ => None,
        });
        let (mut input, mut output, mut cost) = (0, 0, Decimal::ZERO);
        for usage in usages {
            input += usage.input_tokens;
            output += usage.output_tokens;
            cost += usage.cost;
        }
        Self {
            model,
            results,
            total_input_tokens: input,
            total_output_tokens: output,
            total_cost: cost,
        }
    }

    pub fn extracted(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Extracted { .. }))
            .count()
    }
}

pub struct Pipeline {
    renderer: Arc<dyn PageRenderer>,
    sanitizer: Sanitizer,
    extractor: ExtractionClient,
    estimator: CostEstimator,
    store: ArtifactStore,
    settle_delay: Duration,
}

impl Pipeline {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        sanitizer: Sanitizer,
        extractor: ExtractionClient,
        estimator: CostEstimator,
        store: ArtifactStore,
        settle_delay: Duration,
    ) -> Self {
        Self {
            renderer,
            sanitizer,
            extractor,
            estimator,
            store,
            settle_delay,
        }
    }

    /// Processes `urls` sequentially in input order.
    pub async fn run_batch(
        &self,
        urls: &[String],
        model: &ModelId,
    ) -> Result<BatchReport, ExtractionError> {
        self.estimator.pricing().get(model)?;

        info!("Processing {} URL(s) with {model}", urls.len());
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.run(url, model).await);
        }

        let report = BatchReport::new(model.clone(), results);
        info!(
            "Batch finished: {}/{} extracted, total cost ${}",
            report.extracted(),
            report.results.len(),
            report.total_cost
        );
        Ok(report)
    }

    pub async fn run(&self, url: &str, model: &ModelId) -> PipelineResult {
        let outcome = match self.process(url, model).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{url}: {e}");
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        PipelineResult {
            url: url.to_string(),
            outcome,
        }
    }

    async fn process(&self, url: &str, model: &ModelId) -> Result<Outcome, PipelineError> {
        // One timestamp per URL so both artifacts share a stem.
        let at = Local::now();
        let html = self.renderer.render(url, self.settle_delay).await?;
        let sanitized = self.sanitizer.sanitize(&html)?;
        let raw_path = self.store.save_raw(&sanitized, at).await?;

        let data = match self.extractor.extract(&sanitized, model).await {
            Ok(data) => data,
            Err(e) => {
                warn!("{url}: no data extracted: {e}");
                return Ok(Outcome::NoData {
                    raw_path,
                    reason: e.to_string(),
                });
            }
        };

        let json_path = self.store.save_structured(&data, at).await?;
        let output = serde_json::to_string(&data).map_err(StorageError::from)?;
        let usage = self
            .estimator
            .estimate(&sanitized, &output, model)
            .map_err(PipelineError::Cost)?;

        Ok(Outcome::Extracted {
            postings: data.job_postings.len(),
            usage,
            raw_path,
            json_path,
            data,
        })
    }
}

/// One URL per line; blank lines and `#` comments are skipped.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
