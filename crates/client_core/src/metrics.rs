//! Scoring dimensions and their per-metric model selection.

use std::collections::BTreeMap;

use shared::domain::{MetricId, ModelId};
use thiserror::Error;
use tracing::debug;

pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    id: MetricId,
    display_model: ModelId,
    score: u8,
    description: &'static str,
}

impl Metric {
    fn with_defaults(id: MetricId) -> Self {
        let (model, description) = match id {
            MetricId::Reasoning => ("gpt-4o", "Logical coherence and structured thinking"),
            MetricId::Factual => ("gpt-4o-mini", "Accuracy and correctness of information"),
            MetricId::Creativity => ("claude-3", "Originality and innovative thinking"),
            MetricId::Conciseness => ("gpt-4o-mini", "Brevity and clarity of expression"),
            MetricId::Relevance => ("gpt-4o", "Pertinence to the topic or question"),
        };
        Self {
            id,
            display_model: ModelId::new(model),
            score: 0,
            description,
        }
    }

    pub fn id(&self) -> MetricId {
        self.id
    }

    /// Stored ids may predate the current alias table, so they are resolved again on read.
    pub fn display_model(&self) -> ModelId {
        self.display_model.recanonicalized()
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn description(&self) -> &'static str {
        self.description
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("response has no score for metric '{0}'")]
    Missing(MetricId),
    #[error("response score for metric '{metric}' is not a finite number ({value})")]
    NotFinite { metric: MetricId, value: f64 },
}

/// The fixed set of five metrics, one instance per [`MetricId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRegistry {
    metrics: [Metric; 5],
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: MetricId::ALL.map(Metric::with_defaults),
        }
    }

    pub fn get(&self, id: MetricId) -> &Metric {
        &self.metrics[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    /// Stores `canon(raw)` as the metric's model. Never fails.
    pub fn set_model(&mut self, id: MetricId, raw: &str) {
        let model = ModelId::new(raw);
        debug!(metric = %id, raw, model = %model, "metric model selected");
        self.metrics[id.index()].display_model = model;
    }

    pub fn reset_scores(&mut self) {
        for metric in &mut self.metrics {
            metric.score = 0;
        }
    }

    /// Writes every score from a service response keyed by raw metric name.
    /// Rounds and clamps to 0..=100. Nothing is written unless all five are valid.
    pub fn apply_scores(&mut self, percentages: &BTreeMap<String, f64>) -> Result<(), ScoreError> {
        let mut resolved: BTreeMap<MetricId, f64> = BTreeMap::new();
        for (key, value) in percentages {
            if let Some(metric) = MetricId::parse(key) {
                resolved.insert(metric, *value);
            }
        }

        let mut scores = [0u8; 5];
        for id in MetricId::ALL {
            let value = *resolved.get(&id).ok_or(ScoreError::Missing(id))?;
            if !value.is_finite() {
                return Err(ScoreError::NotFinite { metric: id, value });
            }
            scores[id.index()] = value.round().clamp(0.0, f64::from(MAX_SCORE)) as u8;
        }

        for (metric, score) in self.metrics.iter_mut().zip(scores) {
            metric.score = score;
        }
        Ok(())
    }

    /// Applies service-reported models; unknown metric keys are ignored.
    pub fn apply_models(&mut self, models: &BTreeMap<String, String>) {
        for (key, raw) in models {
            match MetricId::parse(key) {
                Some(id) => self.set_model(id, raw),
                None => debug!(key = %key, "ignoring model for unknown metric"),
            }
        }
    }

    /// Canonical model per metric, as sent in outgoing payloads.
    pub fn model_assignments(&self) -> BTreeMap<MetricId, ModelId> {
        self.metrics
            .iter()
            .map(|metric| (metric.id, metric.display_model()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percentages(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn defaults_match_the_documented_assignment() {
        let registry = MetricRegistry::new();
        let models: Vec<String> = registry
            .iter()
            .map(|metric| metric.display_model().to_string())
            .collect();
        assert_eq!(
            models,
            vec!["gpt-4o", "gpt-4o-mini", "claude-3", "gpt-4o-mini", "gpt-4o"]
        );
        assert!(registry.iter().all(|metric| metric.score() == 0));
    }

    #[test]
    fn set_model_stores_the_canonical_id() {
        let mut registry = MetricRegistry::new();
        registry.set_model(MetricId::Factual, "chatgpt");
        registry.set_model(MetricId::Relevance, "in-house-scorer");
        assert_eq!(registry.get(MetricId::Factual).display_model().as_str(), "gpt-4o");
        assert_eq!(
            registry.get(MetricId::Relevance).display_model().as_str(),
            "in-house-scorer"
        );
        assert_eq!(
            registry.model_assignments().get(&MetricId::Factual).map(ModelId::as_str),
            Some("gpt-4o")
        );
    }

    #[test]
    fn apply_scores_rounds_and_clamps() {
        let mut registry = MetricRegistry::new();
        registry
            .apply_scores(&percentages(&[
                ("reasoning", 71.6),
                ("factual", 90.0),
                ("creativity", 140.0),
                ("conciseness", -3.0),
                ("Relevance", 55.4),
            ]))
            .expect("scores");
        let scores: Vec<u8> = registry.iter().map(Metric::score).collect();
        assert_eq!(scores, vec![72, 90, 100, 0, 55]);
    }

    #[test]
    fn apply_scores_is_all_or_nothing() {
        let mut registry = MetricRegistry::new();
        let err = registry
            .apply_scores(&percentages(&[("reasoning", 80.0), ("factual", 90.0)]))
            .expect_err("missing metrics");
        assert_eq!(err, ScoreError::Missing(MetricId::Creativity));
        assert!(registry.iter().all(|metric| metric.score() == 0));

        let err = registry
            .apply_scores(&percentages(&[
                ("reasoning", f64::NAN),
                ("factual", 1.0),
                ("creativity", 1.0),
                ("conciseness", 1.0),
                ("relevance", 1.0),
            ]))
            .expect_err("nan");
        assert!(matches!(err, ScoreError::NotFinite { metric: MetricId::Reasoning, .. }));
    }

    #[test]
    fn reset_scores_keeps_models() {
        let mut registry = MetricRegistry::new();
        registry.set_model(MetricId::Creativity, "llama");
        registry
            .apply_scores(&percentages(&[
                ("reasoning", 1.0),
                ("factual", 2.0),
                ("creativity", 3.0),
                ("conciseness", 4.0),
                ("relevance", 5.0),
            ]))
            .expect("scores");
        registry.reset_scores();
        assert!(registry.iter().all(|metric| metric.score() == 0));
        assert_eq!(registry.get(MetricId::Creativity).display_model().as_str(), "llama-3");
    }

    #[test]
    fn apply_models_canonicalizes_service_names() {
        let mut registry = MetricRegistry::new();
        let models = [("factual", "gemini"), ("tone", "gpt-4o")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        registry.apply_models(&models);
        assert_eq!(registry.get(MetricId::Factual).display_model().as_str(), "gpt-4o-mini");
    }
}
