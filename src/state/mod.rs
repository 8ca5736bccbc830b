use std::sync::Arc;

use crate::assistant::PolicyAssistant;
use crate::core::config::{AppPaths, AppSettings, ConfigService};
use crate::evaluation::{EvaluationQueue, LlmJudge, MetricsLog, QualityEvaluator};
use crate::generation::AnswerGenerator;
use crate::ingest::{CorpusSource, FilesystemCorpus};
use crate::llm::LlmService;
use crate::rag::{IndexStore, QueryRewriter, Retriever};

pub mod error;

use error::InitializationError;

/// Application state shared by every route.
///
/// Holds the loaded settings, the assistant (retriever, rewriter and
/// generator over the loaded index), the metrics log handle and the
/// evaluation queue. Nothing here is a global; tests assemble their own.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AppSettings>,
    pub llm: LlmService,
    pub assistant: PolicyAssistant,
    pub metrics: MetricsLog,
    pub evaluation: Option<Arc<EvaluationQueue>>,
}

impl AppState {
    /// Loads configuration, connects the model provider and loads (or
    /// builds) the index from the configured corpus.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::debug!(
            "Effective configuration: {}",
            config.redact_sensitive_values(&serde_json::to_value(&settings).unwrap_or_default())
        );

        let llm = LlmService::from_settings(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?;
        let corpus = FilesystemCorpus::from_settings(&settings.corpus, |p| paths.resolve(p));

        Self::assemble(&paths, settings, llm, &corpus).await
    }

    /// Wires every component around an already constructed model service
    /// and corpus.
    pub async fn assemble(
        paths: &AppPaths,
        settings: AppSettings,
        llm: LlmService,
        corpus: &dyn CorpusSource,
    ) -> Result<Arc<Self>, InitializationError> {
        let index_dir = paths.resolve(&settings.index.dir);
        let index = IndexStore::from_settings(llm.clone(), &settings.index)
            .load_or_build(&index_dir, corpus, settings.index.force_rebuild)
            .await
            .map_err(|e| InitializationError::Index(e.into()))?;
        tracing::info!("Policy index ready with {} passages", index.len());

        let metrics = MetricsLog::spawn(paths.resolve(&settings.evaluation.metrics_file));
        let evaluation = if settings.evaluation.enabled {
            let judge = Arc::new(LlmJudge::new(llm.clone()));
            let evaluator = Arc::new(QualityEvaluator::from_settings(judge, &settings.evaluation));
            Some(Arc::new(EvaluationQueue::from_settings(
                evaluator,
                metrics.clone(),
                &settings.evaluation,
            )))
        } else {
            tracing::info!("Answer evaluation disabled");
            None
        };

        let assistant = PolicyAssistant::new(
            Retriever::new(index, llm.clone(), settings.retrieval.top_k),
            QueryRewriter::new(settings.generation.history_turns),
            AnswerGenerator::new(llm.clone(), &settings.generation),
            evaluation.clone(),
        );

        Ok(Arc::new(AppState {
            settings: Arc::new(settings),
            llm,
            assistant,
            metrics,
            evaluation,
        }))
    }

    /// Waits for queued evaluations to be written.
    pub async fn shutdown(&self) {
        if let Some(queue) = &self.evaluation {
            queue.shutdown().await;
        }
    }
}
