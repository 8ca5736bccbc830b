//! Post-hoc quality evaluation of generated answers and policies.
//!
//! Jobs are queued after a response has already been returned. Workers score
//! each one on faithfulness, relevancy, context precision and context recall,
//! interpret the aggregate, and append the record to the metrics log. No
//! evaluation failure ever reaches a caller.

mod evaluator;
mod log;
pub mod metrics;
mod scorer;
mod worker;


pub use evaluator::{policy_query, MetricRecord, QualityEvaluator};
pub use log::{MetricsFile, MetricsLog, MetricsSummary, Partition, PartitionSummary};
pub use metrics::{
    calculate_context_precision, calculate_context_recall, calculate_context_utilization,
    interpret, Interpretation, MetricScores, QualityTier,
};
pub use scorer::{parse_rating, EvalError, LlmJudge, ReferenceEvaluator, Score, ScorePolicy};
pub use worker::{EvaluationJob, EvaluationQueue};
