//! concorda-api - daemon entrypoint: queue workers plus the HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concorda_api::handlers::{self, AppState};
use concorda_clients::memory::{MemoryQueue, MemoryStream, MemoryTopic};
use concorda_clients::{
    BlobStoreClient, ConcordancesClient, GraphWriterClient, HttpQueue, HttpStream, HttpTopic,
    PurgerClient, SearchWriterClient,
};
use concorda_core::{defaults, EventPublisher, HealthCheck, RecordStream, UpdateQueue};
use concorda_service::{
    health, AggregateService, ServiceConfig, SystemHealth, WorkerConfig, WorkerPool,
};

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logging: LOG_FORMAT selects json or text, RUST_LOG the filter.
    let log_format = env_or("LOG_FORMAT", "text");
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,concorda_service=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Configuration from environment
    let port: u16 = env_parse("APP_PORT", defaults::APP_PORT);
    let bucket_endpoint = env_or("BUCKET_ENDPOINT", "http://localhost:9000");
    let bucket_name = env_or("BUCKET_NAME", "concepts-normalised");
    let external_bucket_endpoint = env_or("EXTERNAL_BUCKET_ENDPOINT", bucket_endpoint.as_str());
    let external_bucket_name = env_or("EXTERNAL_BUCKET_NAME", "concepts-external");
    let concordances_address = env_or("CONCORDANCES_RW_ADDRESS", "http://localhost:8081");
    let neo_writer_address = env_or("NEO_WRITER_ADDRESS", "http://localhost:8082");
    let es_writer_address = env_or("ES_WRITER_ADDRESS", "http://localhost:8083");
    let purger_address = env_or("VARNISH_PURGER_ADDRESS", "http://localhost:8084");
    let queue_endpoint = std::env::var("QUEUE_ENDPOINT").ok();
    let queue_url = env_or("CONCEPT_UPDATES_QUEUE_URL", "");
    let topic_endpoint = std::env::var("TOPIC_ENDPOINT").ok();
    let topic_arn = env_or("EVENTS_TOPIC_ARN", "");
    let stream_endpoint = std::env::var("STREAM_ENDPOINT").ok();
    let stream_name = env_or("STREAM_NAME", "concept-notifications");

    let request_timeout = Duration::from_millis(env_parse(
        "REQUEST_TIMEOUT_MS",
        defaults::REQUEST_TIMEOUT_MS,
    ));
    let process_timeout = Duration::from_millis(env_parse(
        "PROCESS_TIMEOUT_MS",
        defaults::PROCESS_TIMEOUT_MS,
    ));
    let worker_config = WorkerConfig {
        workers: env_parse("WORKER_COUNT", WorkerConfig::default().workers),
        ..WorkerConfig::default()
    };
    let messages_to_process: usize =
        env_parse("MESSAGES_TO_PROCESS", defaults::MESSAGES_TO_PROCESS);
    let visibility_timeout: u32 =
        env_parse("VISIBILITY_TIMEOUT_S", defaults::VISIBILITY_TIMEOUT_S);
    let wait_time: u32 = env_parse("WAIT_TIME_S", defaults::WAIT_TIME_S);
    let read_only: bool = env_parse("READ_ONLY", false);

    info!(port, read_only, workers = worker_config.workers, "starting concorda");

    // Shared HTTP client; idle pool sized so every worker keeps a warm
    // connection per host.
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(defaults::HTTP_CONNECT_TIMEOUT_S))
        .pool_max_idle_per_host(worker_config.workers + 1)
        .build()?;

    // Clients
    let store = Arc::new(BlobStoreClient::new(
        http.clone(),
        bucket_endpoint,
        bucket_name,
    ));
    let external_store = Arc::new(BlobStoreClient::new(
        http.clone(),
        external_bucket_endpoint,
        external_bucket_name,
    ));
    let concordances = Arc::new(ConcordancesClient::new(http.clone(), concordances_address));
    let graph_writer = GraphWriterClient::new(http.clone(), neo_writer_address);
    let search_writer = SearchWriterClient::new(http.clone(), es_writer_address);
    let purger = PurgerClient::new(http.clone(), purger_address);

    // Health checks: the read path always, the write path unless read-only.
    let mut checks: Vec<Arc<dyn HealthCheck>> = vec![
        store.clone(),
        external_store.clone(),
        concordances.clone(),
    ];
    if !read_only {
        checks.push(Arc::new(graph_writer.clone()));
        checks.push(Arc::new(search_writer.clone()));
        checks.push(Arc::new(purger.clone()));
    }

    // Queue/topic/stream adapters: endpoint-configured wire clients, or
    // in-memory stand-ins for local development when no endpoint is set.
    let queue: Arc<dyn UpdateQueue> = match &queue_endpoint {
        Some(endpoint) => {
            let queue = HttpQueue::new(
                http.clone(),
                endpoint.clone(),
                queue_url,
                messages_to_process,
                visibility_timeout,
                wait_time,
            );
            if !read_only {
                checks.push(Arc::new(queue.clone()));
            }
            Arc::new(queue)
        }
        None => {
            info!("QUEUE_ENDPOINT not set, using in-memory queue");
            Arc::new(MemoryQueue::new(
                messages_to_process,
                Duration::from_secs(visibility_timeout as u64),
            ))
        }
    };
    let events: Arc<dyn EventPublisher> = match &topic_endpoint {
        Some(endpoint) => {
            let topic = HttpTopic::new(http.clone(), endpoint.clone(), topic_arn);
            if !read_only {
                checks.push(Arc::new(topic.clone()));
            }
            Arc::new(topic)
        }
        None => {
            info!("TOPIC_ENDPOINT not set, using in-memory topic");
            Arc::new(MemoryTopic::new())
        }
    };
    let stream: Arc<dyn RecordStream> = match &stream_endpoint {
        Some(endpoint) => {
            let stream = HttpStream::new(http.clone(), endpoint.clone(), stream_name);
            if !read_only {
                checks.push(Arc::new(stream.clone()));
            }
            Arc::new(stream)
        }
        None => {
            info!("STREAM_ENDPOINT not set, using in-memory stream");
            Arc::new(MemoryStream::new())
        }
    };

    let service = Arc::new(AggregateService::new(
        store,
        external_store,
        concordances,
        queue.clone(),
        events,
        stream,
        graph_writer,
        search_writer,
        purger,
        ServiceConfig {
            process_timeout,
            read_only,
            public_endpoint_types: defaults::PUBLIC_ENDPOINT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        },
    ));

    // Health gate: a supervisor drains the monitor's feedback channel;
    // workers poll only once the first healthy tick lands.
    let (done_tx, done_rx) = watch::channel(false);
    let (feedback_tx, feedback_rx) = mpsc::channel(8);
    let system_health = SystemHealth::new();
    health::spawn_supervisor(system_health.clone(), feedback_rx, done_rx.clone());
    health::spawn_monitor(
        checks.clone(),
        Duration::from_secs(defaults::HEALTH_CHECK_INTERVAL_S),
        feedback_tx,
        done_rx.clone(),
    );

    let pool = WorkerPool::new(service.clone(), queue, system_health, worker_config);
    let worker_handle = pool.start(done_rx.clone());

    // HTTP surface
    let state = Arc::new(AppState {
        service,
        request_timeout,
        checks,
    });
    let app = handlers::router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(done_tx))
        .await?;

    info!("waiting for workers to drain");
    worker_handle.join().await;
    info!("shutdown complete");
    Ok(())
}

/// Resolve on SIGINT/SIGTERM after flipping the done signal so workers stop
/// pulling before the server closes.
async fn shutdown_signal(done: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("install SIGTERM handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
    done.send(true).ok();
}
