use axum::extract::{Extension, Multipart, Path, State};
use axum::response::Json;
use bytes::Bytes;
use cidgate_core::{AddOutcome, RemoveOutcome};
use cidgate_types::ContentId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Identity;
use crate::error::{ServerError, ServerResult};
use crate::logging::RequestId;
use crate::state::AppState;

/// Multipart field carrying the uploaded content.
pub const FILE_FIELD: &str = "file";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddResponse {
    pub cid: ContentId,
    pub new_root_cid: ContentId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub new_root_cid: ContentId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub root_cid: ContentId,
    pub cids: Vec<ContentId>,
}

/// `POST /add`
pub async fn add_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Extension(caller): Extension<Identity>,
    multipart: Multipart,
) -> ServerResult<Json<AddResponse>> {
    let data = read_file_field(multipart).await?;
    info!(%request_id, user = %caller.name, bytes = data.len(), "add requested");
    match state.service.add(data).await? {
        AddOutcome::Created { cid, new_root_cid } => {
            info!(%request_id, user = %caller.name, %cid, %new_root_cid, "added");
            Ok(Json(AddResponse { cid, new_root_cid }))
        }
        AddOutcome::Conflict { cid } => Err(ServerError::ContentExists { cid }),
    }
}

/// `POST /remove/:cid`
pub async fn remove_handler(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Extension(caller): Extension<Identity>,
    Path(cid): Path<String>,
) -> ServerResult<Json<RemoveResponse>> {
    info!(%request_id, user = %caller.name, %cid, "remove requested");
    match state.service.remove(&cid).await? {
        RemoveOutcome::Removed { cid, new_root_cid } => {
            info!(%request_id, user = %caller.name, %cid, %new_root_cid, "removed");
            Ok(Json(RemoveResponse { new_root_cid }))
        }
        RemoveOutcome::NotFound { cid } => Err(ServerError::ContentNotFound { cid }),
    }
}

/// `GET /list`
pub async fn list_handler(State(state): State<AppState>) -> ServerResult<Json<ListResponse>> {
    let listing = state.service.list().await?;
    Ok(Json(ListResponse {
        root_cid: listing.root_cid,
        cids: listing.cids,
    }))
}

/// `GET /healthz`
pub async fn health_handler(State(state): State<AppState>) -> ServerResult<&'static str> {
    state.service.health().await?;
    Ok("OK")
}

/// Read the first `file` field; other fields are skipped.
async fn read_file_field(mut multipart: Multipart) -> ServerResult<Bytes> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Multipart(e.body_text()))?
    {
        if field.name() == Some(FILE_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| ServerError::Multipart(e.body_text()));
        }
    }
    Err(ServerError::MissingField(FILE_FIELD))
}
