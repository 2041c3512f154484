//! Audit trail endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use docket_store::AuditTrail;
use serde::Deserialize;

use crate::dto::AuditEntryResponse;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    100
}

/// List audit entries, newest first
pub async fn list_audit(
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> ApiResult<Json<Vec<AuditEntryResponse>>> {
    let entries = state.audit.entries(params.limit, params.offset).await?;

    Ok(Json(
        entries
            .iter()
            .map(|e| AuditEntryResponse {
                actor: e.actor.clone(),
                action: e.action.clone(),
                detail: e.detail.clone(),
                timestamp: e.timestamp,
            })
            .collect(),
    ))
}
