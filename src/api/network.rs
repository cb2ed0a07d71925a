use std::time::Instant;

use axum::{extract::Multipart, response::IntoResponse, Json};
use serde_json::json;

use crate::errors::{AppError, AppResult};

/// Trivial byte-counting echo used by the client to probe upload bandwidth. Not part of the
/// upload coordinator proper -- no manager involvement, mirroring the teacher's thin
/// auxiliary-endpoint handlers that don't touch the database.
pub async fn probe_api(mut multipart: Multipart) -> AppResult<impl IntoResponse> {
	let started_at = Instant::now();
	let mut total_bytes: u64 = 0;
	let mut saw_sample = false;

	while let Some(field) = multipart.next_field().await.map_err(|err| AppError::Internal(err.to_string()))? {
		if field.name() == Some("sample") {
			saw_sample = true;
			let bytes = field.bytes().await.map_err(|err| AppError::Internal(err.to_string()))?;
			total_bytes += bytes.len() as u64;
		}
	}

	if !saw_sample {
		return Err(AppError::MissingSample);
	}

	let elapsed_ms = started_at.elapsed().as_millis() as u64;

	Ok(Json(json!({ "bytes": total_bytes, "elapsedMs": elapsed_ms })))
}
