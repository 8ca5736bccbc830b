//! Partitioned metrics log owned by a single writer task.
//!
//! The file is a JSON object mapping a partition (`"rag"`, `"policy"`) to the
//! records appended to it in order. Every request goes through one channel to
//! one task, so read-modify-write cycles never interleave. The file itself is
//! replaced via temp-file-and-rename under an advisory lock, which keeps a
//! second process from tearing it. A file that no longer parses is moved
//! aside to `<name>.corrupt-<timestamp>` and the log starts over empty.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::evaluator::MetricRecord;
use super::metrics::mean;
use crate::core::errors::RagError;

const COMMAND_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Rag,
    Policy,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Rag => "rag",
            Partition::Policy => "policy",
        }
    }
}

pub type MetricsFile = BTreeMap<String, Vec<MetricRecord>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub count: usize,
    pub avg_aggregate_score: f64,
    pub avg_faithfulness: f64,
    pub avg_answer_relevancy: f64,
    pub avg_context_precision: f64,
    pub avg_context_recall: f64,
    pub avg_sources: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricsSummary {
    NoData { message: String },
    Partitions(BTreeMap<String, PartitionSummary>),
}

impl MetricsSummary {
    pub fn no_data() -> Self {
        MetricsSummary::NoData {
            message: "No metrics recorded yet".to_string(),
        }
    }

    pub fn from_log(log: &MetricsFile) -> Self {
        let partitions: BTreeMap<String, PartitionSummary> = log
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, records)| (name.clone(), summarize_partition(records)))
            .collect();

        if partitions.is_empty() {
            Self::no_data()
        } else {
            MetricsSummary::Partitions(partitions)
        }
    }
}

fn summarize_partition(records: &[MetricRecord]) -> PartitionSummary {
    let avg = |f: fn(&MetricRecord) -> f64| mean(&records.iter().map(f).collect::<Vec<_>>());
    PartitionSummary {
        count: records.len(),
        avg_aggregate_score: avg(|r| r.metrics.aggregate_score),
        avg_faithfulness: avg(|r| r.metrics.faithfulness),
        avg_answer_relevancy: avg(|r| r.metrics.answer_relevancy),
        avg_context_precision: avg(|r| r.metrics.context_precision),
        avg_context_recall: avg(|r| r.metrics.context_recall),
        avg_sources: avg(|r| r.num_sources as f64),
    }
}

enum Command {
    Append {
        partition: Partition,
        record: Box<MetricRecord>,
        reply: oneshot::Sender<Result<(), RagError>>,
    },
    Raw {
        reply: oneshot::Sender<Result<MetricsFile, RagError>>,
    },
    Clear {
        reply: oneshot::Sender<Result<(), RagError>>,
    },
}

/// Handle to the metrics log writer. Cheap to clone.
#[derive(Clone)]
pub struct MetricsLog {
    tx: mpsc::Sender<Command>,
    path: PathBuf,
}

impl MetricsLog {
    /// Spawns the writer task on the current runtime.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let file = LogFile::new(path.clone());
        tokio::spawn(run_writer(file, rx));
        Self { tx, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, partition: Partition, record: MetricRecord) -> Result<(), RagError> {
        self.request(|reply| Command::Append {
            partition,
            record: Box::new(record),
            reply,
        })
        .await
    }

    /// The whole log; an empty map when the file does not exist yet.
    pub async fn raw(&self) -> Result<MetricsFile, RagError> {
        self.request(|reply| Command::Raw { reply }).await
    }

    pub async fn summarize(&self) -> Result<MetricsSummary, RagError> {
        let log = self.raw().await?;
        Ok(MetricsSummary::from_log(&log))
    }

    /// Resets the file to `{}`.
    pub async fn clear(&self) -> Result<(), RagError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, RagError>>) -> Command,
    ) -> Result<T, RagError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| RagError::MetricsLog("metrics writer stopped".to_string()))?;
        rx.await
            .map_err(|_| RagError::MetricsLog("metrics writer dropped request".to_string()))?
    }
}

async fn run_writer(file: LogFile, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Append {
                partition,
                record,
                reply,
            } => {
                let file = file.clone();
                let result = blocking(move || file.append(partition, *record)).await;
                if let Err(err) = &result {
                    tracing::error!("Failed to append {} metrics: {}", partition.as_str(), err);
                }
                let _ = reply.send(result);
            }
            Command::Raw { reply } => {
                let file = file.clone();
                let _ = reply.send(blocking(move || file.read()).await);
            }
            Command::Clear { reply } => {
                let file = file.clone();
                let _ = reply.send(blocking(move || file.write(&MetricsFile::new())).await);
            }
        }
    }
    tracing::debug!("Metrics writer for {} stopped", file.path.display());
}

async fn blocking<T, F>(f: F) -> Result<T, RagError>
where
    F: FnOnce() -> Result<T, RagError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RagError::MetricsLog(e.to_string()))?
}

#[derive(Clone)]
struct LogFile {
    path: PathBuf,
    lock_path: PathBuf,
}

impl LogFile {
    fn new(path: PathBuf) -> Self {
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        Self {
            lock_path: path.with_file_name(lock_name),
            path,
        }
    }

    fn lock(&self) -> Result<File, RagError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn read(&self) -> Result<MetricsFile, RagError> {
        let _lock = self.lock()?;
        self.read_unlocked()
    }

    fn read_unlocked(&self) -> Result<MetricsFile, RagError> {
        if !self.path.exists() {
            return Ok(MetricsFile::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(MetricsFile::new());
        }
        match serde_json::from_str(&raw) {
            Ok(log) => Ok(log),
            Err(err) => {
                let aside = self.quarantine()?;
                tracing::warn!(
                    "Metrics log {} is unreadable ({}); moved to {} and starting empty",
                    self.path.display(),
                    err,
                    aside.display()
                );
                Ok(MetricsFile::new())
            }
        }
    }

    fn quarantine(&self) -> Result<PathBuf, RagError> {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
        let aside = self.path.with_file_name(name);
        fs::rename(&self.path, &aside)?;
        Ok(aside)
    }

    fn append(&self, partition: Partition, record: MetricRecord) -> Result<(), RagError> {
        let _lock = self.lock()?;
        let mut log = self.read_unlocked()?;
        log.entry(partition.as_str().to_string())
            .or_default()
            .push(record);
        self.write_unlocked(&log)
    }

    fn write(&self, log: &MetricsFile) -> Result<(), RagError> {
        let _lock = self.lock()?;
        self.write_unlocked(log)
    }

    fn write_unlocked(&self, log: &MetricsFile) -> Result<(), RagError> {
        let json = serde_json::to_string_pretty(log).map_err(|e| RagError::MetricsLog(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
