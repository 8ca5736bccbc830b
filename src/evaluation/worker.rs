use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::evaluator::{policy_query, MetricRecord, QualityEvaluator};
use super::log::{MetricsLog, Partition};
use crate::core::config::EvaluationSettings;

/// Work handed to the evaluation pool after a response has been returned.
#[derive(Debug, Clone)]
pub enum EvaluationJob {
    Answer {
        query: String,
        answer: String,
        contexts: Vec<String>,
    },
    Policy {
        generated_policy: String,
        contexts: Vec<String>,
        target_country: String,
    },
}

impl EvaluationJob {
    pub fn partition(&self) -> Partition {
        match self {
            EvaluationJob::Answer { .. } => Partition::Rag,
            EvaluationJob::Policy { .. } => Partition::Policy,
        }
    }

    fn fallback_record(&self, default_score: f64) -> MetricRecord {
        match self {
            EvaluationJob::Answer {
                query, contexts, ..
            } => MetricRecord::fallback(
                query.clone(),
                None,
                contexts.len(),
                contexts.iter().map(|c| c.chars().count()).sum(),
                default_score,
            ),
            EvaluationJob::Policy {
                generated_policy,
                contexts,
                target_country,
            } => MetricRecord::fallback(
                policy_query(target_country),
                Some(target_country.clone()),
                contexts.len(),
                generated_policy.chars().count(),
                default_score,
            ),
        }
    }
}

#[derive(Debug, Default)]
struct QueueStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
}

/// Bounded job queue drained by a fixed pool of evaluation workers.
///
/// `submit` never waits: a full queue rejects the job.
pub struct EvaluationQueue {
    sender: Mutex<Option<mpsc::Sender<EvaluationJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    stats: Arc<QueueStats>,
}

impl EvaluationQueue {
    pub fn start(
        evaluator: Arc<QualityEvaluator>,
        log: MetricsLog,
        capacity: usize,
        worker_count: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let stats = Arc::new(QueueStats::default());

        let workers = (0..worker_count.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&rx),
                    Arc::clone(&evaluator),
                    log.clone(),
                    Arc::clone(&stats),
                ))
            })
            .collect();

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            stats,
        }
    }

    pub fn from_settings(evaluator: Arc<QualityEvaluator>, log: MetricsLog, settings: &EvaluationSettings) -> Self {
        Self::start(evaluator, log, settings.queue_capacity, settings.workers)
    }

    /// Enqueues a job; returns `false` when it was rejected.
    pub fn submit(&self, job: EvaluationJob) -> bool {
        let guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(sender) = guard.as_ref() else {
            tracing::warn!("Evaluation queue is shut down; dropping job");
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match sender.try_send(job) {
            Ok(()) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(job)) => {
                let rejected = self.stats.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    "Evaluation queue full; rejected {} job ({} rejected so far)",
                    job.partition().as_str(),
                    rejected
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Evaluation workers stopped; dropping job");
                false
            }
        }
    }

    pub fn accepted(&self) -> u64 {
        self.stats.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.stats.rejected.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Relaxed)
    }

    /// Stops accepting jobs and waits for queued ones to finish.
    pub async fn shutdown(&self) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);

        let workers = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let pending = workers.len();
        for result in join_all(workers).await {
            if let Err(err) = result {
                tracing::warn!("Evaluation worker ended abnormally: {}", err);
            }
        }
        tracing::info!(
            "Evaluation queue drained ({} workers, {} jobs completed)",
            pending,
            self.completed()
        );
    }
}

async fn run_worker(
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<EvaluationJob>>>,
    evaluator: Arc<QualityEvaluator>,
    log: MetricsLog,
    stats: Arc<QueueStats>,
) {
    loop {
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else { break };

        let partition = job.partition();
        let record = evaluate_isolated(Arc::clone(&evaluator), job).await;
        if let Err(err) = log.append(partition, record).await {
            tracing::warn!("Worker {} could not persist {} metrics: {}", id, partition.as_str(), err);
        }
        stats.completed.fetch_add(1, Ordering::Relaxed);
    }
    tracing::debug!("Evaluation worker {} stopped", id);
}

/// Runs one evaluation in its own task so a panic still yields a record.
async fn evaluate_isolated(evaluator: Arc<QualityEvaluator>, job: EvaluationJob) -> MetricRecord {
    let default_score = evaluator.default_score();
    let fallback = job.fallback_record(default_score);

    let task = tokio::spawn(async move {
        match job {
            EvaluationJob::Answer {
                query,
                answer,
                contexts,
            } => evaluator.evaluate_answer(&query, &answer, &contexts).await,
            EvaluationJob::Policy {
                generated_policy,
                contexts,
                target_country,
            } => {
                evaluator
                    .evaluate_policy(&generated_policy, &contexts, &target_country)
                    .await
            }
        }
    });

    match task.await {
        Ok(record) => record,
        Err(err) => {
            tracing::error!("Evaluation failed outright, recording defaults: {}", err);
            fallback
        }
    }
}
