use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{info, warn};

use sigscan_core::export::signed_csv as render_signed_csv;
use sigscan_core::{reprocess_signed, Category};

use crate::AppState;

const NO_URL_MESSAGE: &str =
    "No URL could be found for the given physical URI, check if the passed in URI is correct";

// --- Handlers ---

pub async fn run_pipeline(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pipeline = state.pipeline.lock().await;
    match pipeline.run().await {
        Ok(report) => {
            info!(%report, "Pipeline run finished");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            warn!(error = %e, "Pipeline run failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn piece_url(
    State(state): State<Arc<AppState>>,
    Path(physical_uri): Path<String>,
) -> impl IntoResponse {
    match state.directory.piece_url(&physical_uri).await {
        Ok(Some(url)) => Json(serde_json::json!({ "url": url })).into_response(),
        Ok(None) => {
            Json(serde_json::json!({ "message": NO_URL_MESSAGE })).into_response()
        }
        Err(e) => {
            warn!(error = %e, physical_uri = %physical_uri, "Failed to look up piece url");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn strip_piece(
    State(state): State<Arc<AppState>>,
    Path(physical_uri): Path<String>,
) -> impl IntoResponse {
    let piece_uri = match state.directory.piece_uri(&physical_uri).await {
        Ok(Some(piece_uri)) => piece_uri,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, physical_uri = %physical_uri, "Failed to look up piece");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.directory.reinsert_piece(&piece_uri).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(error = %e, piece_uri = %piece_uri, "Failed to reinsert piece");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn signed_csv(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.outputs.has(Category::Signed).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to check signed artifact");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let identifiers = match state.outputs.read(Category::Signed).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "Failed to read signed artifact");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match render_signed_csv(state.directory.as_ref(), &identifiers).await {
        Ok(csv) => ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render signed csv");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn reprocess(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let identifiers = match state.outputs.read(Category::Signed).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "Failed to read signed artifact");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let stats = reprocess_signed(
        state.directory.as_ref(),
        &identifiers,
        state.reprocess_chunk_size,
        state.reprocess_pause,
    )
    .await;
    Json(stats).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use sigscan_core::testing::{
        calm_governor, day, MockDirectory, MockInspector, MockResources, MockSource,
    };
    use sigscan_core::{
        Category, Classifier, IncrementalFetcher, MemoMode, OutputStore, Pipeline, SnapshotStore,
        SyncWindow,
    };

    use crate::{build_router, AppState};

    fn state(dir: &std::path::Path, source: MockSource, directory: MockDirectory) -> Arc<AppState> {
        let fetcher = IncrementalFetcher::new(
            Arc::new(source),
            SnapshotStore::new(dir),
            SyncWindow {
                epoch_start: day(0),
                cutoff: day(1000),
                page_size: 100,
            },
        );
        let classifier = Classifier::new(
            Arc::new(MockResources::new().with_file("share://s.pdf", b"sig".to_vec())),
            Arc::new(MockInspector::new().signed(b"sig")),
            1024,
        );
        let outputs = OutputStore::new(dir);
        Arc::new(AppState {
            pipeline: Mutex::new(Pipeline::new(
                fetcher,
                classifier,
                calm_governor(),
                outputs.clone(),
                MemoMode::WholeBatch,
            )),
            directory: Arc::new(directory),
            outputs,
            reprocess_chunk_size: 10,
            reprocess_pause: Duration::ZERO,
        })
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn run_writes_signed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new().with_record("share://s.pdf", day(1));
        let state = state(dir.path(), source, MockDirectory::new());
        let outputs = state.outputs.clone();

        let response = build_router(state).oneshot(request("POST", "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            outputs.read(Category::Signed).await.unwrap(),
            vec!["share://s.pdf"]
        );
    }

    #[tokio::test]
    async fn failed_run_returns_500() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new();
        source.fail_queries(true);

        let response = build_router(state(dir.path(), source, MockDirectory::new()))
            .oneshot(request("POST", "/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn piece_url_resolves_encoded_physical_uri() {
        let dir = tempfile::tempdir().unwrap();
        let directory = MockDirectory::new().with_piece(
            "share://s.pdf",
            "http://pieces/1",
            Some("https://docs/1"),
        );

        let response = build_router(state(dir.path(), MockSource::new(), directory))
            .oneshot(request("GET", "/piece-url/share%3A%2F%2Fs.pdf"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["url"], "https://docs/1");
    }

    #[tokio::test]
    async fn unknown_piece_url_returns_message() {
        let dir = tempfile::tempdir().unwrap();

        let response = build_router(state(dir.path(), MockSource::new(), MockDirectory::new()))
            .oneshot(request("GET", "/piece-url/share%3A%2F%2Fnope.pdf"))
            .await
            .unwrap();

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["url"].is_null());
        assert!(body["message"].as_str().unwrap().contains("No URL could be found"));
    }

    #[tokio::test]
    async fn strip_piece_reinserts_known_piece() {
        let dir = tempfile::tempdir().unwrap();
        let directory = MockDirectory::new().with_piece("share://s.pdf", "http://pieces/1", None);
        let app = build_router(state(dir.path(), MockSource::new(), directory.clone()));

        let found = app
            .clone()
            .oneshot(request("POST", "/strip-piece/share%3A%2F%2Fs.pdf"))
            .await
            .unwrap();
        let missing = app
            .oneshot(request("POST", "/strip-piece/share%3A%2F%2Fother.pdf"))
            .await
            .unwrap();

        assert_eq!(found.status(), StatusCode::NO_CONTENT);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(directory.reinserted(), vec!["http://pieces/1"]);
    }

    #[tokio::test]
    async fn signed_csv_requires_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let directory = MockDirectory::new().with_piece(
            "share://s.pdf",
            "http://pieces/1",
            Some("https://docs/1"),
        );
        let state = state(dir.path(), MockSource::new(), directory);
        let app = build_router(state.clone());

        let before = app.clone().oneshot(request("GET", "/signed.csv")).await.unwrap();
        assert_eq!(before.status(), StatusCode::NOT_FOUND);

        state
            .outputs
            .write(Category::Signed, &["share://s.pdf".to_string()])
            .await
            .unwrap();
        let after = app.oneshot(request("GET", "/signed.csv")).await.unwrap();

        assert_eq!(after.status(), StatusCode::OK);
        let csv = body_text(after).await;
        assert!(csv.starts_with("physical_uri,url\n"));
        assert!(csv.contains("share://s.pdf,https://docs/1"));
    }

    #[tokio::test]
    async fn reprocess_reports_stats() {
        let dir = tempfile::tempdir().unwrap();
        let directory = MockDirectory::new().with_piece("share://s.pdf", "http://pieces/1", None);
        let state = state(dir.path(), MockSource::new(), directory.clone());
        state
            .outputs
            .write(
                Category::Signed,
                &["share://s.pdf".to_string(), "share://gone.pdf".to_string()],
            )
            .await
            .unwrap();

        let response = build_router(state)
            .oneshot(request("POST", "/reprocess"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reinserted"], 1);
        assert_eq!(body["missing"], 1);
        assert_eq!(directory.reinserted(), vec!["http://pieces/1"]);
    }
}
