//! Stage orchestration for the `run` and `extract` commands.

use brandpulse_core::{
    demo_marketing_kpis, normalize, BrandsFile, ConfigError, ErrorKind, KpiRow, NormalizeConfig,
    PipelineConfig, Stage,
};
use brandpulse_db::{DbError, LoadSummary};
use brandpulse_extract::{ExtractError, Extractor, TopicRequest};
use brandpulse_sentiment::{
    Backend, Classifier, ClassifierConfig, ClassifierError, SentimentBackend,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure tagged with the stage that raised it.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed ({kind}): {source}")]
pub(crate) struct StageError {
    pub stage: Stage,
    pub kind: ErrorKind,
    #[source]
    pub source: BoxError,
}

pub(crate) trait KindedError: std::error::Error + Send + Sync + 'static {
    fn error_kind(&self) -> ErrorKind;
}

impl KindedError for ConfigError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

impl KindedError for ExtractError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

impl KindedError for ClassifierError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

impl KindedError for DbError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

impl KindedError for sqlx::migrate::MigrateError {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::PersistenceError
    }
}

pub(crate) trait AtStage<T> {
    fn at_stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E: KindedError> AtStage<T> for Result<T, E> {
    fn at_stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError {
            stage,
            kind: e.error_kind(),
            source: Box::new(e),
        })
    }
}

/// Command-line overrides for one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    /// Explicit topics; empty means every brand in the brands file.
    pub topics: Vec<String>,
    pub limit: Option<u32>,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ExtractSummary {
    pub requests: usize,
    pub failed_requests: usize,
    pub fetched: usize,
    /// Records new to the raw store.
    pub inserted: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunSummary {
    pub run_id: Uuid,
    pub extract: ExtractSummary,
    pub scored: usize,
    pub load: LoadSummary,
}

/// One request per `(topic, platform)` the brands file enables.
pub(crate) fn topic_requests(brands: &BrandsFile, topics: &[String]) -> Vec<TopicRequest> {
    let topics = if topics.is_empty() {
        brands.topics()
    } else {
        topics.to_vec()
    };

    topics
        .into_iter()
        .flat_map(|topic| {
            brands
                .platforms_for(&topic)
                .into_iter()
                .map(move |platform| TopicRequest {
                    topic: topic.clone(),
                    platform,
                })
        })
        .collect()
}

/// Connect to the warehouse and apply pending migrations.
pub(crate) async fn open_store(database_url: &str) -> Result<SqlitePool, StageError> {
    let pool = brandpulse_db::connect_pool(database_url, brandpulse_db::PoolConfig::default())
        .await
        .at_stage(Stage::Config)?;
    let applied = brandpulse_db::run_migrations(&pool)
        .await
        .at_stage(Stage::Config)?;
    if applied > 0 {
        tracing::info!(applied, "applied warehouse migrations");
    }
    Ok(pool)
}

/// Fetch every request and append the results to the raw store.
///
/// A failing request is logged and contributes zero records; only a failing
/// store write stops the stage.
pub(crate) async fn extract_into_store(
    pool: &SqlitePool,
    extractor: &Extractor,
    requests: Vec<TopicRequest>,
    limit: u32,
    since: Option<DateTime<Utc>>,
) -> Result<ExtractSummary, StageError> {
    let mut summary = ExtractSummary {
        requests: requests.len(),
        ..ExtractSummary::default()
    };

    let mut records = Vec::new();
    for fetch in extractor.extract_topics(requests, limit, since).await {
        match fetch.result {
            Ok(batch) => {
                summary.fetched += batch.len();
                records.extend(batch);
            }
            Err(e) => {
                summary.failed_requests += 1;
                tracing::warn!(
                    topic = %fetch.request.topic,
                    platform = %fetch.request.platform,
                    kind = %e.kind(),
                    error = %e,
                    "extraction failed; continuing with zero new records"
                );
            }
        }
    }

    summary.inserted = brandpulse_db::append_raw_records(pool, &records)
        .await
        .at_stage(Stage::Extract)?;

    tracing::info!(
        requests = summary.requests,
        failed = summary.failed_requests,
        fetched = summary.fetched,
        inserted = summary.inserted,
        "extraction complete"
    );
    Ok(summary)
}

/// Normalize and classify the whole raw store, then replace the warehouse.
///
/// Returns the number of scored records and the loader's summary.
pub(crate) async fn process_store<B: SentimentBackend>(
    pool: &SqlitePool,
    classifier: &Classifier<B>,
    normalize_config: &NormalizeConfig,
    extra_kpis: &[KpiRow],
) -> Result<(usize, LoadSummary), StageError> {
    let raw = brandpulse_db::list_raw_records(pool, None)
        .await
        .at_stage(Stage::Normalize)?;
    let processed = normalize(&raw, normalize_config);

    let scored = classifier
        .classify(&processed)
        .await
        .at_stage(Stage::Classify)?;

    let load = brandpulse_db::load(pool, &scored, extra_kpis)
        .await
        .at_stage(Stage::Load)?;

    Ok((scored.len(), load))
}

/// Extract only: fetch and append to the raw store.
pub(crate) async fn run_extract(
    pool: &SqlitePool,
    config: &PipelineConfig,
    brands: &BrandsFile,
    options: &RunOptions,
) -> Result<ExtractSummary, StageError> {
    let extractor = Extractor::from_config(config).at_stage(Stage::Config)?;
    let requests = topic_requests(brands, &options.topics);
    let limit = options.limit.unwrap_or(config.fetch_limit);
    extract_into_store(pool, &extractor, requests, limit, options.since).await
}

/// Full pipeline run, recorded in the run ledger.
///
/// Stage failures after the ledger row exists mark it failed with the stage
/// and cause; the warehouse keeps its previous state.
pub(crate) async fn run_pipeline(
    pool: &SqlitePool,
    config: &PipelineConfig,
    brands: &BrandsFile,
    options: &RunOptions,
) -> Result<RunSummary, StageError> {
    let run = brandpulse_db::create_pipeline_run(pool, config.demo_mode)
        .await
        .at_stage(Stage::Config)?;
    tracing::info!(
        run_id = %run.public_id,
        demo_mode = config.demo_mode,
        "pipeline run started"
    );

    let mut extracted: i64 = 0;
    match execute(pool, config, brands, options, &mut extracted).await {
        Ok((extract, scored, load)) => {
            let scored_count = i64::try_from(scored).unwrap_or(i64::MAX);
            brandpulse_db::complete_pipeline_run(pool, run.id, extracted, scored_count)
                .await
                .at_stage(Stage::Load)?;
            tracing::info!(
                run_id = %run.public_id,
                inserted = extract.inserted,
                scored,
                kpi_rows = load.kpi_rows_written,
                "pipeline run succeeded"
            );
            Ok(RunSummary {
                run_id: run.public_id,
                extract,
                scored,
                load,
            })
        }
        Err(e) => {
            fail_run_best_effort(pool, run.id, &e, extracted).await;
            Err(e)
        }
    }
}

async fn execute(
    pool: &SqlitePool,
    config: &PipelineConfig,
    brands: &BrandsFile,
    options: &RunOptions,
    extracted: &mut i64,
) -> Result<(ExtractSummary, usize, LoadSummary), StageError> {
    let extractor = Extractor::from_config(config).at_stage(Stage::Config)?;
    let backend = Backend::from_config(config).at_stage(Stage::Config)?;
    tracing::debug!(backend = backend.name(), "sentiment backend selected");
    let classifier =
        Classifier::new(backend, ClassifierConfig::from_pipeline(config)).at_stage(Stage::Config)?;
    let normalize_config = NormalizeConfig::from_pipeline(config, brands);

    let requests = topic_requests(brands, &options.topics);
    let limit = options.limit.unwrap_or(config.fetch_limit);
    let extract = extract_into_store(pool, &extractor, requests, limit, options.since).await?;
    *extracted = i64::try_from(extract.inserted).unwrap_or(i64::MAX);

    let extra_kpis = if config.demo_mode {
        demo_marketing_kpis(Utc::now().date_naive())
    } else {
        Vec::new()
    };

    let (scored, load) = process_store(pool, &classifier, &normalize_config, &extra_kpis).await?;
    Ok((extract, scored, load))
}

async fn fail_run_best_effort(pool: &SqlitePool, run_id: i64, error: &StageError, extracted: i64) {
    let message = format!("{}: {}", error.kind, error.source);
    if let Err(mark_err) =
        brandpulse_db::fail_pipeline_run(pool, run_id, error.stage, extracted, &message).await
    {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark pipeline run as failed"
        );
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
