//! Submission endpoints
//!
//! Upload, listing, download, verification and grading.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use docket_core::{ActorId, SubmissionId, SubmissionStatus};
use docket_pipeline::SubmitRequest;
use docket_store::{BlobStore, SubmissionFilter, SubmissionStore};

use crate::dto::{
    attempt_to_response, submission_to_response, GradeRequest, ListQueryParams,
    SubmissionResponse, VerificationAttemptResponse, VerifyRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Upload a submission (multipart: title, owner_id, owner_name, file)
pub async fn submit_submission(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmissionResponse>)> {
    let mut title: Option<String> = None;
    let mut owner_id: Option<String> = None;
    let mut owner_name: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => title = Some(read_text(field).await?),
            Some("owner_id") => owner_id = Some(read_text(field).await?),
            Some("owner_name") => owner_name = Some(read_text(field).await?),
            Some("file") => {
                let original_name = field
                    .file_name()
                    .unwrap_or("upload")
                    .to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read file: {e}")))?;
                file = Some((original_name, mime_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (original_name, mime_type, content) =
        file.ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;

    let request = SubmitRequest {
        owner_id: ActorId(require(owner_id, "owner_id")?),
        owner_name: require(owner_name, "owner_name")?,
        title: require(title, "title")?,
        original_name,
        mime_type,
        content,
    };

    let submission = state.coordinator.submit(request).await?;

    Ok((StatusCode::CREATED, Json(submission_to_response(&submission))))
}

/// List submissions, newest first
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(params): Query<ListQueryParams>,
) -> ApiResult<Json<Vec<SubmissionResponse>>> {
    let status = match params.status.as_deref() {
        Some(s) => Some(
            SubmissionStatus::parse(s)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let filter = SubmissionFilter {
        owner: params.owner_id.map(ActorId),
        status,
        limit: params.limit,
        offset: params.offset,
    };

    let submissions = state.store.list(filter).await?;
    Ok(Json(submissions.iter().map(submission_to_response).collect()))
}

/// Get one submission
pub async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> ApiResult<Json<SubmissionResponse>> {
    let submission = state
        .store
        .get(&SubmissionId(submission_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission {submission_id} not found")))?;

    Ok(Json(submission_to_response(&submission)))
}

/// Download the submitted blob
pub async fn download_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let submission = state
        .store
        .get(&SubmissionId(submission_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission {submission_id} not found")))?;

    let bytes = state.blobs.read(&submission.blob_locator).await?;

    let headers = [
        (header::CONTENT_TYPE, submission.mime_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", submission.original_name),
        ),
    ];

    Ok((headers, bytes))
}

/// Reconcile a submission against the ledger
pub async fn verify_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<VerificationAttemptResponse>> {
    if req.verifier_id.trim().is_empty() {
        return Err(ApiError::BadRequest("verifier_id must not be empty".to_string()));
    }

    let attempt = state
        .reconciler
        .verify(&SubmissionId(submission_id), &ActorId(req.verifier_id))
        .await?;

    Ok(Json(attempt_to_response(&attempt)))
}

/// Grade a submission (one-time)
pub async fn grade_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
    Json(req): Json<GradeRequest>,
) -> ApiResult<Json<SubmissionResponse>> {
    if req.grader_id.trim().is_empty() {
        return Err(ApiError::BadRequest("grader_id must not be empty".to_string()));
    }

    let submission = state
        .grading
        .grade(
            &SubmissionId(submission_id),
            req.grade,
            req.feedback,
            &ActorId(req.grader_id),
        )
        .await?;

    Ok(Json(submission_to_response(&submission)))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed field: {e}")))
}

fn require(value: Option<String>, name: &str) -> ApiResult<String> {
    value.ok_or_else(|| ApiError::BadRequest(format!("missing {name} field")))
}
