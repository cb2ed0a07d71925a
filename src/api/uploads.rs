use std::sync::Arc;

use axum::{
	extract::{Multipart, Path, Query, State},
	response::IntoResponse,
	Json
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{AppError, AppResult};
use crate::manager::{ChunkOutcome, UploadManager};
use crate::models::Snapshot;

// ----------------------------------------------
// API - Identify user
// ----------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
	user_key: Option<String>
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResponse {
	user_key: String,
	created: bool,
	uploads: Snapshot
}

pub async fn identify_user_api(
	State(manager): State<Arc<UploadManager>>,
	Json(req): Json<IdentifyRequest>
) -> AppResult<impl IntoResponse> {
	let (user_key, created) = manager.identify_user(req.user_key).await?;
	let uploads = manager.get_user_snapshot(&user_key).await?;

	Ok(Json(IdentifyResponse { user_key, created, uploads }))
}

// ----------------------------------------------
// API - Get snapshot
// ----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UserKeyQuery {
	#[serde(rename = "userKey")]
	user_key: Option<String>
}

pub async fn get_snapshot_api(
	State(manager): State<Arc<UploadManager>>,
	Query(query): Query<UserKeyQuery>
) -> AppResult<impl IntoResponse> {
	let user_key = query.user_key.ok_or(AppError::MissingUserKey)?;
	let snapshot = manager.get_user_snapshot(&user_key).await?;

	Ok(Json(snapshot))
}

// ----------------------------------------------
// API - Get a single upload
// ----------------------------------------------

pub async fn get_upload_api(
	State(manager): State<Arc<UploadManager>>,
	Path(upload_id): Path<String>,
	Query(query): Query<UserKeyQuery>
) -> AppResult<impl IntoResponse> {
	let user_key = query.user_key.ok_or(AppError::MissingUserKey)?;
	let (location, upload) = manager.get_upload(&user_key, &upload_id).await?;

	Ok(Json(json!({ "location": location, "upload": upload })))
}

// ----------------------------------------------
// API - Create upload
// ----------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadRequest {
	user_key: Option<String>,
	file_name: Option<String>,
	file_size: Option<u64>,
	chunk_size: Option<u64>,
	persist: Option<bool>
}

pub async fn create_upload_api(
	State(manager): State<Arc<UploadManager>>,
	Json(req): Json<CreateUploadRequest>
) -> AppResult<impl IntoResponse> {
	let user_key = req.user_key.ok_or(AppError::MissingUserKey)?;

	let file_name = req.file_name.ok_or_else(|| AppError::MissingFields("fileName".to_string()))?;
	let file_size = req.file_size.ok_or_else(|| AppError::MissingFields("fileSize".to_string()))?;
	let chunk_size = req.chunk_size.ok_or_else(|| AppError::MissingFields("chunkSize".to_string()))?;
	let persist = req.persist.unwrap_or(false);

	let upload = manager.create_upload(&user_key, file_name, file_size, chunk_size, persist).await?;

	Ok(Json(json!({ "upload": upload })))
}

// ----------------------------------------------
// API - Upload chunk
// ----------------------------------------------

/// Reads the three expected multipart fields in whatever order the client sends them (unlike
/// the teacher's strict-order `read_next_multipart_field!` macro, a browser's FormData doesn't
/// guarantee field order), mapping read failures directly to the wire's specific error codes.
pub async fn upload_chunk_api(
	State(manager): State<Arc<UploadManager>>,
	Path(upload_id): Path<String>,
	mut multipart: Multipart
) -> AppResult<impl IntoResponse> {
	let mut user_key: Option<String> = None;
	let mut chunk_index: Option<u64> = None;
	let mut bytes: Option<Vec<u8>> = None;

	while let Some(field) = multipart.next_field().await.map_err(|err| AppError::Internal(err.to_string()))? {
		match field.name().map(|s| s.to_string()).as_deref() {
			Some("userKey") => {
				user_key = Some(field.text().await.map_err(|err| AppError::Internal(err.to_string()))?);
			},
			Some("chunkIndex") => {
				let text = field.text().await.map_err(|err| AppError::Internal(err.to_string()))?;
				chunk_index = Some(text.trim().parse::<u64>().map_err(|_| AppError::InvalidChunkIndex)?);
			},
			Some("chunk") => {
				bytes = Some(field.bytes().await.map_err(|err| AppError::Internal(err.to_string()))?.to_vec());
			},
			_ => {}
		}
	}

	let user_key = user_key.ok_or(AppError::MissingUserKey)?;
	let chunk_index = chunk_index.ok_or(AppError::InvalidChunkIndex)?;
	let bytes = bytes.ok_or(AppError::MissingChunk)?;

	match manager.record_chunk(&user_key, &upload_id, chunk_index, bytes).await? {
		ChunkOutcome::Ok { upload } => Ok(Json(json!({ "status": "ok", "upload": upload }))),
		ChunkOutcome::Completed { upload, snapshot } => {
			Ok(Json(json!({ "status": "completed", "upload": upload, "uploads": snapshot })))
		}
	}
}

// ----------------------------------------------
// API - Update upload state
// ----------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStateRequest {
	user_key: Option<String>,
	action: Option<String>
}

pub async fn update_upload_state_api(
	State(manager): State<Arc<UploadManager>>,
	Path(upload_id): Path<String>,
	Json(req): Json<UpdateStateRequest>
) -> AppResult<impl IntoResponse> {
	let user_key = req.user_key.ok_or(AppError::MissingUserKey)?;
	let action = req.action.ok_or(AppError::InvalidAction)?;

	let upload = manager.update_status(&user_key, &upload_id, &action).await?;
	let snapshot = manager.get_user_snapshot(&user_key).await?;

	Ok(Json(json!({ "upload": upload, "uploads": snapshot })))
}

// ----------------------------------------------
// API - Clear history
// ----------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryRequest {
	user_key: Option<String>
}

pub async fn clear_history_api(
	State(manager): State<Arc<UploadManager>>,
	Json(req): Json<ClearHistoryRequest>
) -> AppResult<impl IntoResponse> {
	let user_key = req.user_key.ok_or(AppError::MissingUserKey)?;

	manager.clear_history(&user_key).await?;
	let snapshot = manager.get_user_snapshot(&user_key).await?;

	Ok(Json(snapshot))
}
