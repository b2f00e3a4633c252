//! HTTP handlers for frame upload, lookup and deletion.
//! They translate requests into orchestrator calls and typed outcomes into
//! status codes; all storage concerns live in `InboxService`.

use crate::{
    context::RequestContext,
    errors::{AppError, InboxError},
    models::file_record::FileRecord,
    services::{
        inbox_service::InboxService,
        ingest_service::{IncomingFile, IngestBatch, MAX_BATCH_SIZE},
        query_service::DEFAULT_LIMIT,
    },
};
use axum::{
    Json,
    extract::{Multipart, OriginalUri, Query, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode, header},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Multipart field carrying the uploaded frames.
const FILES_FIELD: &str = "files";
/// Repeated query parameter naming frames to delete.
const NAMES_PARAM: &str = "files_names";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filenames_in_object_storage: Vec<String>,
}

/// One entry of a date-range lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct FrameEntry {
    pub stored_name: String,
    pub registered_at: DateTime<Utc>,
}

impl From<FileRecord> for FrameEntry {
    fn from(record: FileRecord) -> Self {
        Self {
            stored_name: record.stored_name,
            registered_at: record.registered_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub date_lower: String,
    pub date_upper: String,
    pub limit: Option<u32>,
}

/// POST `/frames/`: multipart upload of 1 to 15 `files` parts.
///
/// Reading stops at the first `files` part past the batch limit.
pub async fn upload_frames(
    State(service): State<InboxService>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        if files.len() == MAX_BATCH_SIZE {
            return Err(InboxError::InvalidBatchSize {
                got: MAX_BATCH_SIZE + 1,
                max: MAX_BATCH_SIZE,
            }
            .into());
        }
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        files.push(IncomingFile { file_name, data });
    }

    if files.is_empty() {
        return Err(AppError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("field `{}` is required", FILES_FIELD),
        ));
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let batch = IngestBatch {
        request_url: format!("http://{}{}", host, uri),
        files,
    };

    let ctx = RequestContext::new("ingest");
    let report = service.ingest.ingest(&ctx, batch).await?;
    Ok(Json(UploadResponse {
        filenames_in_object_storage: report.stored_names(),
    }))
}

/// GET `/frames/get/?date_lower=&date_upper=&limit=`
pub async fn get_frames_by_date(
    State(service): State<InboxService>,
    Query(q): Query<DateRangeQuery>,
) -> Result<Json<Vec<FrameEntry>>, AppError> {
    let ctx = RequestContext::new("query");
    let records = service
        .query
        .by_date_range(
            &ctx,
            &q.date_lower,
            &q.date_upper,
            q.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;
    Ok(Json(records.into_iter().map(FrameEntry::from).collect()))
}

/// DELETE `/frames/delete/?files_names=a.jpg&files_names=b.jpg`
pub async fn delete_frames(
    State(service): State<InboxService>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<StatusCode, AppError> {
    let names: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == NAMES_PARAM)
        .map(|(_, value)| value)
        .collect();
    if names.is_empty() {
        return Err(AppError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("query parameter `{}` is required", NAMES_PARAM),
        ));
    }

    let ctx = RequestContext::new("delete");
    service.deletion.delete(&ctx, &names).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}
