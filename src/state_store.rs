use std::path::PathBuf;

use tokio::sync::Mutex;

use crate::errors::AppResult;
use crate::models::StateDocument;

/// Durable, serialized access to the single state document. Every mutation and read goes
/// through the same `tokio::sync::Mutex`, which wakes waiters in arrival order -- exactly the
/// FIFO single-writer queue the persistence model calls for, without a bespoke actor/channel.
pub struct StateStore {
	path: PathBuf,
	document: Mutex<StateDocument>
}

impl StateStore {
	/// Loads the document from `path`, or starts from an empty document if the file is absent.
	pub async fn load(path: PathBuf) -> AppResult<Self> {
		let document = match tokio::fs::read(&path).await {
			Ok(bytes) => serde_json::from_slice(&bytes)?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => StateDocument::default(),
			Err(err) => return Err(err.into())
		};

		Ok(Self { path, document: Mutex::new(document) })
	}

	/// Runs `mutator` against a deep copy of the document. On success the copy is persisted to
	/// disk and becomes the new live document; on failure the live document is left untouched
	/// and nothing is written.
	pub async fn with_state<F, T>(&self, mutator: F) -> AppResult<T>
	where
		F: FnOnce(&mut StateDocument) -> AppResult<T>
	{
		let mut guard = self.document.lock().await;
		let mut scratch = guard.clone();

		let result = mutator(&mut scratch)?;

		self.persist(&scratch).await?;
		*guard = scratch;

		Ok(result)
	}

	/// Runs `selector` against a snapshot of the current document under the same serialization
	/// discipline as `with_state`, so reads never observe a torn write.
	pub async fn read_state<F, T>(&self, selector: F) -> T
	where
		F: FnOnce(&StateDocument) -> T
	{
		let guard = self.document.lock().await;
		selector(&guard)
	}

	async fn persist(&self, document: &StateDocument) -> AppResult<()> {
		let json = serde_json::to_string_pretty(document)?;
		let tmp_path = self.path.with_extension("json.tmp");

		tokio::fs::write(&tmp_path, json).await?;
		tokio::fs::rename(&tmp_path, &self.path).await?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::UserRecord;

	#[tokio::test]
	async fn load_missing_file_starts_empty() {
		let dir = tempfile::tempdir().unwrap();
		let store = StateStore::load(dir.path().join("state.json")).await.unwrap();

		let user_count = store.read_state(|doc| doc.users.len()).await;
		assert_eq!(user_count, 0);
	}

	#[tokio::test]
	async fn with_state_persists_across_reload() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("state.json");

		{
			let store = StateStore::load(path.clone()).await.unwrap();
			store.with_state(|doc| {
				doc.users.insert("u1".to_string(), UserRecord::new("u1".to_string()));
				Ok(())
			}).await.unwrap();
		}

		let store = StateStore::load(path).await.unwrap();
		let has_user = store.read_state(|doc| doc.users.contains_key("u1")).await;
		assert!(has_user);
	}

	#[tokio::test]
	async fn failed_mutator_does_not_persist_partial_state() {
		let dir = tempfile::tempdir().unwrap();
		let store = StateStore::load(dir.path().join("state.json")).await.unwrap();

		let result: AppResult<()> = store.with_state(|doc| {
			doc.users.insert("ghost".to_string(), UserRecord::new("ghost".to_string()));
			Err(crate::errors::AppError::UserNotFound)
		}).await;

		assert!(result.is_err());

		let has_ghost = store.read_state(|doc| doc.users.contains_key("ghost")).await;
		assert!(!has_ghost);
	}
}
