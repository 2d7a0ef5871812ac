//! Server Binary - single-server deployment
//!
//! Wires up:
//! - Store adapters (Redis, or in-process memory)
//! - Filesystem artifact storage and the yt-dlp extractor
//! - Download worker pool fed by an in-process queue
//! - HTTP API

use anyhow::Context;
use mediafetch::adapters::local::channel::ChannelQueue;
use mediafetch::adapters::local::fs::FsAdapter;
use mediafetch::adapters::local::http::cors_layer;
use mediafetch::adapters::local::ytdlp::YtDlpExtractor;
use mediafetch::adapters::local::{RedisPool, RedisTtls};
use mediafetch::adapters::memory::MemoryStore;
use mediafetch::application::orchestrator::OrchestratorService;
use mediafetch::application::retry::RetryPolicy;
use mediafetch::application::search::SearchService;
use mediafetch::application::worker::{WorkerDeps, WorkerService};
use mediafetch::config::StoreBackend;
use mediafetch::ports::cache::{AudioCache, SearchCache};
use mediafetch::ports::repository::JobRepository;
use mediafetch::ports::slots::SlotController;
use mediafetch::{router, AppState, LocalConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Stores {
    jobs: Arc<dyn JobRepository>,
    slots: Arc<dyn SlotController>,
    search_cache: Arc<dyn SearchCache>,
    audio_cache: Arc<dyn AudioCache>,
}

impl Stores {
    fn shared<T>(store: T) -> Self
    where
        T: JobRepository + SlotController + SearchCache + AudioCache + 'static,
    {
        let store = Arc::new(store);
        Self {
            jobs: store.clone(),
            slots: store.clone(),
            search_cache: store.clone(),
            audio_cache: store,
        }
    }
}

fn build_stores(config: &LocalConfig) -> anyhow::Result<Stores> {
    match config.store_backend {
        StoreBackend::Redis => {
            let pool = RedisPool::new(
                &config.redis_url,
                config.store_timeout,
                RedisTtls {
                    job: config.job_ttl,
                    slots: config.slot_ttl,
                },
                config.max_concurrent_downloads,
            )
            .context("Failed to configure Redis")?;
            Ok(Stores::shared(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-process store; jobs are lost on restart");
            Ok(Stores::shared(MemoryStore::new(
                config.job_ttl,
                config.max_concurrent_downloads,
                config.slot_ttl,
            )))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LocalConfig::from_env().context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mediafetch=info,tower_http=info")),
        )
        .init();

    // 1. Adapters
    let stores = build_stores(&config)?;
    if !stores.jobs.ping().await {
        warn!(backend = ?config.store_backend, "Backing store is not reachable yet");
    }

    let fs = Arc::new(FsAdapter::new(&config.files_dir, &config.media_url_prefix));
    fs.ensure_root()
        .await
        .with_context(|| format!("Failed to create {}", config.files_dir.display()))?;
    if let Err(e) = fs.cleanup_older_than(config.file_retention).await {
        warn!(error = %e, "Startup cleanup failed");
    }

    let extractor = Arc::new(YtDlpExtractor::new(&config.ytdlp_bin, config.fragment_retries));
    let queue = Arc::new(ChannelQueue::new());

    // 2. Application Services
    let orchestrator = Arc::new(OrchestratorService::new(
        stores.jobs.clone(),
        stores.audio_cache.clone(),
        queue.clone(),
        fs.clone(),
    ));
    let search = Arc::new(SearchService::new(
        extractor.clone(),
        stores.search_cache.clone(),
        config.search_max_results,
        config.search_cache_ttl,
    ));
    let worker = Arc::new(WorkerService::new(
        WorkerDeps {
            jobs: stores.jobs.clone(),
            slots: stores.slots.clone(),
            audio_cache: stores.audio_cache.clone(),
            storage: fs.clone(),
            extractor,
            queue,
        },
        RetryPolicy {
            max_attempts: config.download_attempts,
            ..RetryPolicy::default()
        },
        config.audio_cache_ttl,
    ));

    // 3. Start Workers
    let _workers = worker.spawn_pool(config.download_workers);
    info!(workers = config.download_workers, "Download workers started");

    // 4. HTTP Layer
    let state = AppState {
        orchestrator,
        search,
        jobs: stores.jobs,
        slots: stores.slots,
        storage: fs,
    };
    let app = router(
        state,
        cors_layer(&config.allowed_origins),
        &config.media_url_prefix,
        &config.files_dir,
    );

    // 5. Start Server
    let listener = tokio::net::TcpListener::bind((config.addr.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.addr, config.port))?;
    info!(addr = %config.addr, port = config.port, "Listening");
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
