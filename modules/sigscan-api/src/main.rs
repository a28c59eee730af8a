use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sigscan_core::{
    BackpressureGovernor, Classifier, Config, IncrementalFetcher, OutputStore, PdfInspector,
    PieceDirectory, PieceGraph, PieceSource, Pipeline, ProcessMemoryProbe, ShareStore,
    SnapshotStore,
};
use sparql_client::SparqlClient;

mod rest;

pub struct AppState {
    /// Held for the whole run so only one pass touches the cache at a time.
    pub pipeline: Mutex<Pipeline>,
    pub directory: Arc<dyn PieceDirectory>,
    pub outputs: OutputStore,
    pub reprocess_chunk_size: usize,
    pub reprocess_pause: Duration,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }).post(rest::run_pipeline))
        .route("/piece-url/{physical_uri}", get(rest::piece_url))
        .route("/strip-piece/{physical_uri}", post(rest::strip_piece))
        .route("/signed.csv", get(rest::signed_csv))
        .route("/reprocess", post(rest::reprocess))
        .with_state(state)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("sigscan=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = Config::from_env()?;

    let client = SparqlClient::new(&config.sparql_endpoint)?.with_sudo(config.sparql_sudo);
    let graph = Arc::new(PieceGraph::new(client, &config.document_base_url));
    let source: Arc<dyn PieceSource> = graph.clone();
    let directory: Arc<dyn PieceDirectory> = graph;

    let fetcher = IncrementalFetcher::new(
        source,
        SnapshotStore::new(&config.cache_dir),
        config.sync_window(),
    );
    let classifier = Classifier::new(
        Arc::new(ShareStore::new(&config.share_root)),
        Arc::new(PdfInspector),
        config.max_file_bytes,
    );
    let governor = BackpressureGovernor::new(
        Box::new(ProcessMemoryProbe::new(config.memory_ceiling_bytes)),
        config.memory_pressure_ratio,
        config.backpressure_delay,
    );
    let outputs = OutputStore::new(&config.cache_dir);
    let pipeline = Pipeline::new(
        fetcher,
        classifier,
        governor,
        outputs.clone(),
        config.memo_mode,
    );

    let state = Arc::new(AppState {
        pipeline: Mutex::new(pipeline),
        directory,
        outputs,
        reprocess_chunk_size: config.reprocess_chunk_size,
        reprocess_pause: config.reprocess_pause,
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(
        endpoint = %config.sparql_endpoint,
        cache_dir = %config.cache_dir.display(),
        memo_mode = ?config.memo_mode,
        "Signature scan service starting on {addr}"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
