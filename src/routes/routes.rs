//! Defines routes for frame ingestion, lookup and deletion.
//!
//! ## Structure
//! - `GET    /healthz`: liveness
//! - `GET    /readyz`: readiness (index + object store)
//! - `POST   /frames/`: upload 1–15 frames as multipart `files`
//! - `GET    /frames/get/`: records registered in `[date_lower, date_upper]`
//! - `DELETE /frames/delete/`: delete frames by repeated `files_names`

use crate::{
    handlers::{
        frame_handlers::{delete_frames, get_frames_by_date, upload_frames},
        health_handlers::{healthz, readyz},
    },
    services::inbox_service::InboxService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build the router. The router carries shared state (`InboxService`) to all handlers.
pub fn routes(max_request_bytes: usize) -> Router<InboxService> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/frames/", post(upload_frames))
        .route("/frames/get/", get(get_frames_by_date))
        .route("/frames/delete/", delete(delete_frames))
        .layer(DefaultBodyLimit::max(max_request_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handlers::frame_handlers::{FrameEntry, UploadResponse},
        services::{
            bucket_namer::{BucketNamer, SystemClock},
            memory_object_store::MemoryObjectStore,
            sqlite_index::test_support::memory_index,
        },
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "frame-inbox-boundary";

    async fn app() -> (Router, Arc<MemoryObjectStore>) {
        let store = Arc::new(MemoryObjectStore::new());
        let index = Arc::new(memory_index().await);
        let service = InboxService::new(
            store.clone(),
            index,
            BucketNamer::new(Arc::new(SystemClock)),
        );
        (routes(1024 * 1024).with_state(service), store)
    }

    /// `count` complete `files` parts, without the closing boundary.
    fn file_parts(count: usize) -> Vec<u8> {
        let mut body = Vec::new();
        for i in 0..count {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"files\"; filename=\"im{i}.jpg\"\r\n\
                     Content-Type: image/jpeg\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&[0xff, 0xd8, 0xff, 0xd9, i as u8]);
            body.extend_from_slice(b"\r\n");
        }
        body
    }

    fn multipart_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/frames/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn upload_request(count: usize) -> Request<Body> {
        let mut body = file_parts(count);
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        multipart_request(body)
    }

    fn query_request(lower: Duration, upper: Duration, limit: u32) -> Request<Body> {
        let now = Utc::now();
        let fmt = "%Y-%m-%d_%H:%M:%S";
        let uri = format!(
            "/frames/get/?date_lower={}&date_upper={}&limit={}",
            (now + lower).format(fmt),
            (now + upper).format(fmt),
            limit
        );
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn delete_request(names: &[String]) -> Request<Body> {
        let query = names
            .iter()
            .map(|n| format!("files_names={n}"))
            .collect::<Vec<_>>()
            .join("&");
        Request::builder()
            .method("DELETE")
            .uri(format!("/frames/delete/?{query}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload(app: &Router, count: usize) -> Vec<String> {
        let response = send(app, upload_request(count)).await;
        assert_eq!(response.status(), StatusCode::OK);
        json::<UploadResponse>(response)
            .await
            .filenames_in_object_storage
    }

    #[tokio::test]
    async fn single_upload_is_found_by_date_range() {
        let (app, _) = app().await;
        let names = upload(&app, 1).await;
        assert_eq!(names.len(), 1);

        let response = send(
            &app,
            query_request(Duration::days(-1), Duration::days(1), 5),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let records: Vec<serde_json::Value> = json(response).await;
        assert_eq!(records.len(), 1);
        let entry: FrameEntry = serde_json::from_value(records[0].clone()).unwrap();
        assert_eq!(entry.stored_name, names[0]);
        assert!(records[0].get("id").is_none());
        assert!(records[0].get("request_descriptor").is_none());
    }

    #[tokio::test]
    async fn sixteen_files_are_rejected() {
        let (app, store) = app().await;
        let response = send(&app, upload_request(16)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.partition_count(), 0);

        let response = send(
            &app,
            query_request(Duration::days(-1), Duration::days(1), 5),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_is_rejected_at_the_sixteenth_part() {
        let (app, store) = app().await;
        // The 16th part is cut short and never terminated.
        let mut body = file_parts(15);
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"files\"; filename=\"im15.jpg\"\r\n\
                 Content-Type: image/jpeg\r\n\r\npartial"
            )
            .as_bytes(),
        );

        let response = send(&app, multipart_request(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: serde_json::Value = json(response).await;
        assert!(
            error["error"]
                .as_str()
                .unwrap()
                .contains("between 1 and 15 files")
        );
        assert_eq!(store.partition_count(), 0);
    }

    #[tokio::test]
    async fn zero_limit_is_not_found() {
        let (app, _) = app().await;
        upload(&app, 1).await;
        let response = send(
            &app,
            query_request(Duration::days(-1), Duration::days(1), 0),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_without_files_is_unprocessable() {
        let (app, store) = app().await;
        let response = send(&app, upload_request(0)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(store.partition_count(), 0);
    }

    #[tokio::test]
    async fn deleting_uploaded_frames_empties_the_range() {
        let (app, store) = app().await;
        let names = upload(&app, 3).await;
        assert_eq!(names.len(), 3);
        assert_eq!(store.object_count(), 3);

        let response = send(&app, delete_request(&names)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(store.object_count(), 0);

        let response = send(
            &app,
            query_request(Duration::days(-1), Duration::days(1), 5),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_unknown_names_is_not_found() {
        let (app, _) = app().await;
        let names = vec![
            "non_existing_name_1.jpg".to_string(),
            "non_existing_name_2.jpg".to_string(),
        ];
        let response = send(&app, delete_request(&names)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn inverted_range_is_bad_request() {
        let (app, _) = app().await;
        let response = send(
            &app,
            query_request(Duration::days(1), Duration::days(-1), 5),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn old_range_is_not_found() {
        let (app, _) = app().await;
        upload(&app, 2).await;
        let response = send(
            &app,
            query_request(Duration::days(-10), Duration::days(-9), 3),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn readiness_reflects_backend_state() {
        let (app, store) = app().await;
        let ready = Request::builder().uri("/readyz").body(Body::empty());
        assert_eq!(send(&app, ready.unwrap()).await.status(), StatusCode::OK);

        store.set_unavailable(true);
        let ready = Request::builder().uri("/readyz").body(Body::empty());
        assert_eq!(
            send(&app, ready.unwrap()).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let live = Request::builder().uri("/healthz").body(Body::empty());
        assert_eq!(send(&app, live.unwrap()).await.status(), StatusCode::OK);
    }
}
