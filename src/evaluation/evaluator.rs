use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{
    calculate_context_precision, calculate_context_recall, calculate_context_utilization,
    interpret, mean, Interpretation, MetricScores,
};
use super::scorer::{ReferenceEvaluator, ScorePolicy};
use crate::core::config::EvaluationSettings;

/// One evaluated generation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_country: Option<String>,
    pub metrics: MetricScores,
    pub interpretation: Interpretation,
    pub num_sources: usize,
    /// Total context characters for answers; policy characters for drafts.
    pub content_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_utilization: Option<f64>,
    /// Metrics that fell back to the default score.
    #[serde(default)]
    pub degraded: Vec<String>,
}

impl MetricRecord {
    /// Record used when evaluation could not run at all.
    pub fn fallback(
        query: String,
        target_country: Option<String>,
        num_sources: usize,
        content_length: usize,
        default_score: f64,
    ) -> Self {
        let metrics = MetricScores {
            faithfulness: default_score,
            answer_relevancy: default_score,
            context_precision: default_score,
            context_recall: default_score,
            extra: BTreeMap::new(),
            aggregate_score: default_score,
        };
        Self {
            timestamp: Utc::now(),
            query,
            target_country,
            interpretation: interpret(&metrics),
            metrics,
            num_sources,
            content_length,
            context_utilization: None,
            degraded: ALL_METRICS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

const ALL_METRICS: [&str; 4] = [
    "faithfulness",
    "answer_relevancy",
    "context_precision",
    "context_recall",
];

pub fn policy_query(target_country: &str) -> String {
    format!("Generate AI policy for {} educational institution", target_country)
}

/// Scores generated text against the passages it was grounded on.
///
/// Never fails: every model-judged step that errors is replaced by the
/// default score and listed in the record's `degraded` field.
pub struct QualityEvaluator {
    reference: Arc<dyn ReferenceEvaluator>,
    policy: ScorePolicy,
    precision_threshold: f64,
}

impl QualityEvaluator {
    pub fn new(reference: Arc<dyn ReferenceEvaluator>, policy: ScorePolicy, precision_threshold: f64) -> Self {
        Self {
            reference,
            policy,
            precision_threshold,
        }
    }

    pub fn from_settings(reference: Arc<dyn ReferenceEvaluator>, settings: &EvaluationSettings) -> Self {
        Self::new(
            reference,
            ScorePolicy::new(settings.default_score),
            settings.precision_threshold,
        )
    }

    pub fn default_score(&self) -> f64 {
        self.policy.default_score
    }

    pub async fn evaluate_answer(&self, query: &str, answer: &str, contexts: &[String]) -> MetricRecord {
        let (metrics, degraded) = self.score(query, answer, contexts).await;
        MetricRecord {
            timestamp: Utc::now(),
            query: query.to_string(),
            target_country: None,
            interpretation: interpret(&metrics),
            metrics,
            num_sources: contexts.len(),
            content_length: contexts.iter().map(|c| c.chars().count()).sum(),
            context_utilization: None,
            degraded,
        }
    }

    pub async fn evaluate_policy(
        &self,
        generated_policy: &str,
        contexts: &[String],
        target_country: &str,
    ) -> MetricRecord {
        let query = policy_query(target_country);
        let (metrics, degraded) = self.score(&query, generated_policy, contexts).await;
        MetricRecord {
            timestamp: Utc::now(),
            query,
            target_country: Some(target_country.to_string()),
            interpretation: interpret(&metrics),
            metrics,
            num_sources: contexts.len(),
            content_length: generated_policy.chars().count(),
            context_utilization: Some(calculate_context_utilization(generated_policy, contexts)),
            degraded,
        }
    }

    async fn score(&self, query: &str, answer: &str, contexts: &[String]) -> (MetricScores, Vec<String>) {
        let (faithfulness, relevancy, extra) = tokio::join!(
            self.reference.faithfulness(answer, contexts),
            self.reference.answer_relevancy(query, answer),
            self.reference.extra_metrics(query, answer, contexts),
        );

        let mut degraded = Vec::new();
        let faithfulness_ok = faithfulness.is_ok();
        let relevancy_ok = relevancy.is_ok();
        let faithfulness = self.policy.resolve("faithfulness", faithfulness, &mut degraded);
        let answer_relevancy = self.policy.resolve("answer_relevancy", relevancy, &mut degraded);

        let context_precision = calculate_context_precision(query, contexts, self.precision_threshold);
        let context_recall = calculate_context_recall(query, contexts);

        let extra = extra.unwrap_or_else(|err| {
            tracing::warn!("Evaluation degraded: {} extra metrics skipped: {}", self.reference.name(), err);
            degraded.push("extra_metrics".to_string());
            BTreeMap::new()
        });
        let extra: BTreeMap<String, f64> = extra
            .into_iter()
            .filter_map(|(name, value)| {
                if value.is_nan() {
                    tracing::warn!("Evaluation degraded: {} returned NaN for {}", self.reference.name(), name);
                    degraded.push(name);
                    None
                } else {
                    Some((name, value.clamp(0.0, 1.0)))
                }
            })
            .collect();

        let mut successful = vec![context_precision, context_recall];
        if faithfulness_ok {
            successful.push(faithfulness);
        }
        if relevancy_ok {
            successful.push(answer_relevancy);
        }
        successful.extend(extra.values().copied());

        let metrics = MetricScores {
            faithfulness,
            answer_relevancy,
            context_precision,
            context_recall,
            aggregate_score: mean(&successful),
            extra,
        };
        (metrics, degraded)
    }
}
