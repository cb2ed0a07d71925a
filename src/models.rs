use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
	Active,
	Paused,
	Completed
}

/// Durable or ephemeral record of a single upload's progress. Persisted uploads live inside a
/// `UserRecord` in the state document; ephemeral ones live only in the `UploadRegistry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
	pub id: String,
	pub user_key: String,
	pub file_name: String,
	pub file_size: u64,
	pub chunk_size: u64,
	pub total_chunks: u64,
	pub persist: bool,
	pub status: UploadStatus,
	pub received_chunks: BTreeSet<u64>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>
}

impl UploadMetadata {
	pub fn new(id: String, user_key: String, file_name: String, file_size: u64, chunk_size: u64, persist: bool) -> Self {
		let total_chunks = (file_size + chunk_size - 1) / chunk_size;
		let now = Utc::now();

		Self {
			id,
			user_key,
			file_name,
			file_size,
			chunk_size,
			total_chunks,
			persist,
			status: UploadStatus::Active,
			received_chunks: BTreeSet::new(),
			created_at: now,
			updated_at: now,
			completed_at: None
		}
	}

	/// Sorted ascending indices in `[0, total_chunks)` not yet received.
	pub fn missing_chunks(&self) -> Vec<u64> {
		(0..self.total_chunks).filter(|i| !self.received_chunks.contains(i)).collect()
	}

	pub fn received_count(&self) -> usize {
		self.received_chunks.len()
	}

	pub fn is_complete(&self) -> bool {
		self.received_chunks.len() as u64 == self.total_chunks
	}

	/// Marks `index` received. Returns `true` if this call transitioned the upload from
	/// incomplete to complete (i.e. this caller owns the assemble+finalize step).
	pub fn mark_chunk(&mut self, index: u64) -> bool {
		let was_complete = self.is_complete();
		self.received_chunks.insert(index);
		self.status = UploadStatus::Active;
		self.updated_at = Utc::now();
		!was_complete && self.is_complete()
	}

	pub fn set_status(&mut self, status: UploadStatus) {
		self.status = status;
		self.updated_at = Utc::now();
	}

	pub fn mark_completed(&mut self) {
		self.status = UploadStatus::Completed;
		let now = Utc::now();
		self.updated_at = now;
		self.completed_at = Some(now);
	}

	pub fn decorate(&self) -> DecoratedUpload {
		DecoratedUpload {
			missing_chunks: self.missing_chunks(),
			received_count: self.received_count(),
			metadata: self.clone()
		}
	}

	pub fn to_history_entry(&self) -> HistoryEntry {
		HistoryEntry {
			id: self.id.clone(),
			file_name: self.file_name.clone(),
			file_size: self.file_size,
			chunk_size: self.chunk_size,
			total_chunks: self.total_chunks,
			persist: self.persist,
			completed_at: self.completed_at.unwrap_or_else(Utc::now)
		}
	}
}

/// Wire representation of an upload: the stored metadata plus the derived fields that are
/// never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratedUpload {
	pub missing_chunks: Vec<u64>,
	pub received_count: usize,

	#[serde(flatten)]
	pub metadata: UploadMetadata
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
	pub id: String,
	pub file_name: String,
	pub file_size: u64,
	pub chunk_size: u64,
	pub total_chunks: u64,
	pub persist: bool,
	pub completed_at: DateTime<Utc>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
	pub key: String,
	pub created_at: DateTime<Utc>,
	pub uploads: HashMap<String, UploadMetadata>,
	pub history: VecDeque<HistoryEntry>
}

impl UserRecord {
	pub fn new(key: String) -> Self {
		Self {
			key,
			created_at: Utc::now(),
			uploads: HashMap::new(),
			history: VecDeque::new()
		}
	}

	/// Pushes a new history entry to the front (newest first) and truncates to the cap.
	pub fn push_history(&mut self, entry: HistoryEntry) {
		self.history.push_front(entry);
		self.history.truncate(constants::MAX_HISTORY_ENTRIES);
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
	pub users: HashMap<String, UserRecord>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
	pub active: Vec<DecoratedUpload>,
	pub paused: Vec<DecoratedUpload>,
	pub history: Vec<HistoryEntry>
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn total_chunks_rounds_up() {
		let upload = UploadMetadata::new("id".into(), "user".into(), "f".into(), 10, 6, true);
		assert_eq!(upload.total_chunks, 2);
	}

	#[test]
	fn mark_chunk_reports_completion_exactly_once() {
		let mut upload = UploadMetadata::new("id".into(), "user".into(), "f".into(), 10, 6, true);
		assert!(!upload.mark_chunk(0));
		assert!(upload.mark_chunk(1));
		// Re-marking an already-received index must not re-signal completion.
		assert!(!upload.mark_chunk(1));
	}

	#[test]
	fn missing_chunks_sorted_ascending() {
		let mut upload = UploadMetadata::new("id".into(), "user".into(), "f".into(), 30, 10, true);
		upload.mark_chunk(2);
		assert_eq!(upload.missing_chunks(), vec![0, 1]);
	}

	#[test]
	fn history_cap_enforced() {
		let mut record = UserRecord::new("user".into());

		for i in 0..250u64 {
			record.push_history(HistoryEntry {
				id: format!("upload-{}", i),
				file_name: "f".into(),
				file_size: 1,
				chunk_size: 1,
				total_chunks: 1,
				persist: true,
				completed_at: Utc::now()
			});
		}

		assert_eq!(record.history.len(), constants::MAX_HISTORY_ENTRIES);
		assert_eq!(record.history.front().unwrap().id, "upload-249");
	}
}
