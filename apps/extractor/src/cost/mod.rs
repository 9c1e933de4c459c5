//! Cost Estimator: token counts and a decimal cost estimate for one extraction.
//!
//! cost = input_tokens * input_price_per_token + output_tokens * output_price_per_token
//!
//! Prices come from a `PricingTable` built once at startup; an unknown model id is a
//! configuration error, never a silent zero.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::extraction::ExtractionError;

/// A model identifier such as `gpt-4o-mini`. Each id maps to one pricing tier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// USD per token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_price_per_token: Decimal,
    pub output_price_per_token: Decimal,
}

impl ModelPricing {
    /// Price pair from dollars per one million tokens, the way providers publish them.
    pub fn per_million_tokens(input_usd: Decimal, output_usd: Decimal) -> Self {
        let million = Decimal::from(1_000_000u64);
        Self {
            input_price_per_token: input_usd / million,
            output_price_per_token: output_usd / million,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    models: BTreeMap<ModelId, ModelPricing>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let models = [
            ("gpt-4o-mini", Decimal::new(15, 2), Decimal::new(60, 2)),
            ("gpt-4o-mini-2024-07-18", Decimal::new(15, 2), Decimal::new(60, 2)),
            ("babbage-002", Decimal::new(40, 2), Decimal::new(40, 2)),
            ("gpt-3.5-turbo-0125", Decimal::new(50, 2), Decimal::new(150, 2)),
            ("gpt-3.5-turbo-1106", Decimal::new(1, 0), Decimal::new(2, 0)),
        ]
        .into_iter()
        .map(|(id, input, output)| {
            (
                ModelId::from(id),
                ModelPricing::per_million_tokens(input, output),
            )
        })
        .collect();

        Self { models }
    }
}

impl PricingTable {
    pub fn new(models: BTreeMap<ModelId, ModelPricing>) -> Self {
        Self { models }
    }

    /// Loads the table from a JSON file when a path is configured, else the built-in table.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pricing file {}", path.display()))?;
        let table: PricingTable = serde_json::from_str(&text)
            .with_context(|| format!("Invalid pricing file {}", path.display()))?;
        anyhow::ensure!(
            !table.models.is_empty(),
            "Pricing file {} defines no models",
            path.display()
        );
        Ok(table)
    }

    pub fn get(&self, model: &ModelId) -> Result<&ModelPricing, ExtractionError> {
        self.models
            .get(model)
            .ok_or_else(|| ExtractionError::UnknownPricingModel(model.to_string()))
    }

    pub fn models(&self) -> impl Iterator<Item = (&ModelId, &ModelPricing)> {
        self.models.iter()
    }
}

/// Token usage and estimated spend for one extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub model: ModelId,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct CostEstimator {
    pricing: Arc<PricingTable>,
}

impl CostEstimator {
    pub fn new(pricing: Arc<PricingTable>) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn estimate(
        &self,
        input_text: &str,
        output_text: &str,
        model: &ModelId,
    ) -> Result<CostEstimate, ExtractionError> {
        let pricing = self.pricing.get(model)?;
        let bpe = tokenizer_for(model);

        let input_tokens = bpe.encode_ordinary(input_text).len();
        let output_tokens = bpe.encode_ordinary(output_text).len();

        let cost = Decimal::from(input_tokens as u64) * pricing.input_price_per_token
            + Decimal::from(output_tokens as u64) * pricing.output_price_per_token;

        Ok(CostEstimate {
            model: model.clone(),
            input_tokens,
            output_tokens,
            cost,
        })
    }
}

/// The tiktoken encoding for the model family, `cl100k_base` when the id is not registered.
fn tokenizer_for(model: &ModelId) -> &'static CoreBPE {
    tiktoken_rs::bpe_for_model(model.as_str()).unwrap_or_else(|_| {
        debug!("No tokenizer registered for {model}; using cl100k_base");
        tiktoken_rs::cl100k_base_singleton()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;

    fn estimator() -> CostEstimator {
        CostEstimator::new(Arc::new(PricingTable::default()))
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_default_table_literal_rates() {
        let table = PricingTable::default();
        let mini = table.get(&ModelId::from("gpt-4o-mini")).unwrap();
        assert_eq!(mini.input_price_per_token, dec("0.00000015"));
        assert_eq!(mini.output_price_per_token, dec("0.0000006"));
        let turbo = table.get(&ModelId::from("gpt-3.5-turbo-1106")).unwrap();
        assert_eq!(turbo.input_price_per_token, dec("0.000001"));
        assert_eq!(turbo.output_price_per_token, dec("0.000002"));
        assert_eq!(table.models().count(), 5);
    }

    #[test]
    fn test_estimate_hello_world() {
        let model = ModelId::from("gpt-4o-mini");
        let estimate = estimator().estimate("hello world", "ok", &model).unwrap();
        assert_eq!(estimate.input_tokens, 2);
        assert_eq!(estimate.output_tokens, 1);
        assert_eq!(estimate.cost, dec("0.0000009"));
    }

    #[test]
    fn test_estimate_matches_formula() {
        let model = ModelId::from("gpt-3.5-turbo-0125");
        let input = "<div class=\"job-description\"><p>Build data pipelines in Rust.</p></div>";
        let output = r#"{"job_postings":[{"job_title":"Data Engineer"}]}"#;
        let estimate = estimator().estimate(input, output, &model).unwrap();
        let pricing = PricingTable::default().get(&model).copied().unwrap();
        let expected = Decimal::from(estimate.input_tokens as u64) * pricing.input_price_per_token
            + Decimal::from(estimate.output_tokens as u64) * pricing.output_price_per_token;
        assert!(estimate.input_tokens > 0);
        assert!(estimate.output_tokens > 0);
        assert_eq!(estimate.cost, expected);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let model = ModelId::from("babbage-002");
        let a = estimator().estimate("same text", "same output", &model).unwrap();
        let b = estimator().estimate("same text", "same output", &model).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_model_is_error() {
        let err = estimator()
            .estimate("a", "b", &ModelId::from("gpt-9"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownPricingModel(ref m) if m == "gpt-9"));
    }

    #[test]
    fn test_empty_text_costs_nothing() {
        let estimate = estimator()
            .estimate("", "", &ModelId::from("gpt-4o-mini"))
            .unwrap();
        assert_eq!(estimate.input_tokens, 0);
        assert_eq!(estimate.cost, Decimal::ZERO);
    }

    #[test]
    fn test_load_pricing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"local-model": {{"input_price_per_token": "0.000001", "output_price_per_token": "0.000003"}}}}"#
        )
        .unwrap();
        let table = PricingTable::load(Some(file.path())).unwrap();
        let pricing = table.get(&ModelId::from("local-model")).unwrap();
        assert_eq!(pricing.output_price_per_token, dec("0.000003"));
        assert!(table.get(&ModelId::from("gpt-4o-mini")).is_err());
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        let table = PricingTable::load(None).unwrap();
        assert_eq!(table, PricingTable::default());
    }

    #[test]
    fn test_tokenizer_lookup_shares_cl100k_instance() {
        let fallback = tokenizer_for(&ModelId::from("local-model"));
        assert!(std::ptr::eq(fallback, tiktoken_rs::cl100k_base_singleton()));
        let mini = tokenizer_for(&ModelId::from("gpt-4o-mini"));
        assert_eq!(mini.encode_ordinary("hello world").len(), 2);
    }

    #[test]
    fn test_unregistered_model_falls_back_to_cl100k() {
        let mut models = BTreeMap::new();
        models.insert(
            ModelId::from("local-model"),
            ModelPricing {
                input_price_per_token: dec("0.000001"),
                output_price_per_token: dec("0.000001"),
            },
        );
        let estimator = CostEstimator::new(Arc::new(PricingTable::new(models)));
        let estimate = estimator
            .estimate("hello world", "", &ModelId::from("local-model"))
            .unwrap();
        assert_eq!(estimate.input_tokens, 2);
    }
}
