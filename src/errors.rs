use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json
};
use serde_json::json;
use thiserror::Error;

/// The coordinator's error taxonomy, covering both client-input and infrastructure failures.
///
/// Each variant carries the exact wire error code documented in the external interface, so
/// handlers can propagate `?` without re-deriving a status code at every call site.
#[derive(Debug, Error)]
pub enum AppError {
	#[error("missing user key")]
	MissingUserKey,

	#[error("missing required fields: {0}")]
	MissingFields(String),

	#[error("file size and chunk size must both be positive")]
	InvalidSizes,

	#[error("action must be one of: pause, resume, cancel, forget")]
	InvalidAction,

	#[error("missing chunk field")]
	MissingChunk,

	#[error("missing sample field")]
	MissingSample,

	#[error("chunk index is not a valid integer")]
	InvalidChunkIndex,

	#[error("chunk index is out of range for this upload")]
	ChunkOutOfRange,

	#[error("upload not found")]
	UploadNotFound,

	#[error("user not found")]
	UserNotFound,

	#[error("assembly aborted: chunk {0} is missing")]
	MissingChunkDuringAssembly(u64),

	#[error("internal error: {0}")]
	Internal(String)
}

impl AppError {
	pub fn code(&self) -> String {
		match self {
			AppError::MissingUserKey => "missing_user_key".to_string(),
			AppError::MissingFields(_) => "missing_fields".to_string(),
			AppError::InvalidSizes => "invalid_sizes".to_string(),
			AppError::InvalidAction => "invalid_action".to_string(),
			AppError::MissingChunk => "missing_chunk".to_string(),
			AppError::MissingSample => "missing_sample".to_string(),
			AppError::InvalidChunkIndex => "invalid_chunk_index".to_string(),
			AppError::ChunkOutOfRange => "chunk_out_of_range".to_string(),
			AppError::UploadNotFound => "upload_not_found".to_string(),
			AppError::UserNotFound => "user_not_found".to_string(),
			AppError::MissingChunkDuringAssembly(n) => format!("missing_chunk_{}", n),
			AppError::Internal(_) => "internal_error".to_string()
		}
	}

	fn status(&self) -> StatusCode {
		match self {
			AppError::MissingUserKey
			| AppError::MissingFields(_)
			| AppError::InvalidSizes
			| AppError::InvalidAction
			| AppError::MissingChunk
			| AppError::MissingSample
			| AppError::InvalidChunkIndex
			| AppError::ChunkOutOfRange => StatusCode::BAD_REQUEST,

			AppError::UploadNotFound | AppError::UserNotFound => StatusCode::NOT_FOUND,

			AppError::MissingChunkDuringAssembly(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = self.status();
		let code = self.code();

		if matches!(self, AppError::Internal(_)) {
			log::error!("internal error: {}", self);
		}

		(status, Json(json!({ "error": code }))).into_response()
	}
}

impl From<std::io::Error> for AppError {
	fn from(err: std::io::Error) -> Self {
		AppError::Internal(err.to_string())
	}
}

impl From<serde_json::Error> for AppError {
	fn from(err: serde_json::Error) -> Self {
		AppError::Internal(err.to_string())
	}
}

pub type AppResult<T> = Result<T, AppError>;
