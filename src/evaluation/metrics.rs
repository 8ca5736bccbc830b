//! Lexical retrieval metrics and score interpretation.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

pub const STRENGTH_THRESHOLD: f64 = 0.8;
pub const WEAKNESS_THRESHOLD: f64 = 0.5;
pub const CONTINUE_RECOMMENDATION: &str = "continue current approach";

/// Lowercased, whitespace-separated query terms.
fn terms(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Fraction of contexts sharing at least `threshold` of the query terms.
pub fn calculate_context_precision<S: AsRef<str>>(query: &str, contexts: &[S], threshold: f64) -> f64 {
    if contexts.is_empty() {
        return 0.0;
    }

    let query_terms = terms(query);
    let required = query_terms.len() as f64 * threshold;
    let relevant = contexts
        .iter()
        .filter(|context| {
            let context_terms = terms(context.as_ref());
            query_terms.intersection(&context_terms).count() as f64 >= required
        })
        .count();

    relevant as f64 / contexts.len() as f64
}

/// Fraction of query terms found anywhere in the contexts.
pub fn calculate_context_recall<S: AsRef<str>>(query: &str, contexts: &[S]) -> f64 {
    if contexts.is_empty() {
        return 0.0;
    }

    let query_terms = terms(query);
    if query_terms.is_empty() {
        return 0.0;
    }
    let context_terms: HashSet<String> = contexts.iter().flat_map(|c| terms(c.as_ref())).collect();
    query_terms.intersection(&context_terms).count() as f64 / query_terms.len() as f64
}

/// Fraction of contexts with at least one three-word phrase, taken from
/// their first 20 words, that reappears in `generated`.
pub fn calculate_context_utilization<S: AsRef<str>>(generated: &str, contexts: &[S]) -> f64 {
    if contexts.is_empty() {
        return 0.0;
    }

    let haystack = generated.to_lowercase();
    let used = contexts
        .iter()
        .filter(|context| {
            let words: Vec<&str> = context.as_ref().split_whitespace().take(20).collect();
            (0..words.len().saturating_sub(2))
                .step_by(2)
                .any(|i| haystack.contains(&words[i..i + 3].join(" ").to_lowercase()))
        })
        .count();

    used as f64 / contexts.len() as f64
}

/// Mean of the given scores; zero when there are none.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    pub faithfulness: f64,
    pub answer_relevancy: f64,
    pub context_precision: f64,
    pub context_recall: f64,
    /// Additional scores reported by the reference evaluator.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
    pub aggregate_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            QualityTier::Excellent
        } else if score >= 0.6 {
            QualityTier::Good
        } else if score >= 0.4 {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub quality_tier: QualityTier,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

struct Axis {
    strength: &'static str,
    weakness: &'static str,
    recommendation: &'static str,
}

const FAITHFULNESS: Axis = Axis {
    strength: "High faithfulness to context",
    weakness: "Low faithfulness to context",
    recommendation: "Improve answer faithfulness to retrieved context",
};
const RELEVANCY: Axis = Axis {
    strength: "High answer relevancy",
    weakness: "Low answer relevancy",
    recommendation: "Improve answer relevancy to the query",
};
const PRECISION: Axis = Axis {
    strength: "High context precision",
    weakness: "Low context precision",
    recommendation: "Improve context retrieval precision",
};
const RECALL: Axis = Axis {
    strength: "High context recall",
    weakness: "Low context recall",
    recommendation: "Improve context retrieval recall",
};

pub fn interpret(scores: &MetricScores) -> Interpretation {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut recommendations = Vec::new();

    for (value, axis) in [
        (scores.faithfulness, &FAITHFULNESS),
        (scores.answer_relevancy, &RELEVANCY),
        (scores.context_precision, &PRECISION),
        (scores.context_recall, &RECALL),
    ] {
        if value >= STRENGTH_THRESHOLD {
            strengths.push(axis.strength.to_string());
        } else if value < WEAKNESS_THRESHOLD {
            weaknesses.push(axis.weakness.to_string());
            recommendations.push(axis.recommendation.to_string());
        }
    }

    if recommendations.is_empty() {
        recommendations.push(CONTINUE_RECOMMENDATION.to_string());
    }

    Interpretation {
        quality_tier: QualityTier::from_score(scores.aggregate_score),
        strengths,
        weaknesses,
        recommendations,
    }
}
