use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::id_factory;
use crate::models::{DecoratedUpload, Snapshot, UploadMetadata, UploadStatus, UserRecord};
use crate::registry::UploadRegistry;
use crate::state_store::StateStore;
use crate::storage::chunk_store::ChunkStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadLocation {
	Memory,
	Persistent
}

pub enum ChunkOutcome {
	Ok { upload: DecoratedUpload },
	Completed { upload: DecoratedUpload, snapshot: Snapshot }
}

/// Coordinates the state store, upload registry and chunk store into the upload lifecycle.
/// This is the hard part: every public method here is the Manager operation it implements in
/// the documented external surface.
pub struct UploadManager {
	state_store: StateStore,
	registry: UploadRegistry,
	chunk_store: ChunkStore
}

impl UploadManager {
	pub fn new(state_store: StateStore, registry: UploadRegistry, chunk_store: ChunkStore) -> Self {
		Self { state_store, registry, chunk_store }
	}

	pub async fn identify_user(&self, requested_key: Option<String>) -> AppResult<(String, bool)> {
		if let Some(key) = requested_key {
			let exists = self.state_store.read_state(|doc| doc.users.contains_key(&key)).await;

			if exists {
				self.registry.ensure_user(&key);
				return Ok((key, false));
			}
		}

		// requested_key absent or unknown: a fresh id is allocated, retrying on the
		// astronomically unlikely collision against the current state.
		loop {
			let candidate = id_factory::generate_user_id();

			let inserted = self.state_store.with_state(|doc| {
				if doc.users.contains_key(&candidate) {
					return Ok(false);
				}

				doc.users.insert(candidate.clone(), UserRecord::new(candidate.clone()));
				Ok(true)
			}).await?;

			if inserted {
				self.registry.ensure_user(&candidate);
				return Ok((candidate, true));
			}
		}
	}

	pub async fn get_user_snapshot(&self, user_key: &str) -> AppResult<Snapshot> {
		let persistent = self.state_store.read_state(|doc| doc.users.get(user_key).cloned()).await;
		let ephemeral_uploads = self.registry.list_for_user(user_key);

		if persistent.is_none() && ephemeral_uploads.is_empty() {
			return Err(AppError::UserNotFound);
		}

		let history = persistent.as_ref().map(|user| user.history.iter().cloned().collect()).unwrap_or_default();
		let persistent_uploads: Vec<UploadMetadata> = persistent.map(|user| user.uploads.into_values().collect()).unwrap_or_default();

		let mut active = Vec::new();
		let mut paused = Vec::new();

		for upload in persistent_uploads.into_iter().chain(ephemeral_uploads.into_iter()) {
			match upload.status {
				UploadStatus::Active => active.push(upload.decorate()),
				UploadStatus::Paused => paused.push(upload.decorate()),
				// A completed upload is always removed from both stores as part of finalize,
				// so this arm should be unreachable in practice; skip defensively rather than panic.
				UploadStatus::Completed => {}
			}
		}

		Ok(Snapshot { active, paused, history })
	}

	async fn locate_upload(&self, user_key: &str, upload_id: &str) -> AppResult<(UploadLocation, UploadMetadata)> {
		if let Some(upload) = self.registry.get(user_key, upload_id) {
			return Ok((UploadLocation::Memory, upload));
		}

		let upload = self.state_store
			.read_state(|doc| doc.users.get(user_key).and_then(|user| user.uploads.get(upload_id).cloned()))
			.await;

		upload.map(|upload| (UploadLocation::Persistent, upload)).ok_or(AppError::UploadNotFound)
	}

	pub async fn get_upload(&self, user_key: &str, upload_id: &str) -> AppResult<(UploadLocation, DecoratedUpload)> {
		let (location, upload) = self.locate_upload(user_key, upload_id).await?;
		Ok((location, upload.decorate()))
	}

	pub async fn create_upload(&self, user_key: &str, file_name: String, file_size: u64, chunk_size: u64, persist: bool) -> AppResult<DecoratedUpload> {
		if file_size == 0 || chunk_size == 0 {
			return Err(AppError::InvalidSizes);
		}

		let upload_id = id_factory::generate_upload_id();
		let metadata = UploadMetadata::new(upload_id.clone(), user_key.to_string(), file_name, file_size, chunk_size, persist);

		self.chunk_store.create_scratch_dir(&upload_id).await?;

		if persist {
			self.state_store.with_state(|doc| {
				let user = doc.users.entry(user_key.to_string()).or_insert_with(|| UserRecord::new(user_key.to_string()));
				user.uploads.insert(upload_id.clone(), metadata.clone());
				Ok(())
			}).await?;
		} else {
			self.registry.insert(user_key, metadata.clone());
		}

		Ok(metadata.decorate())
	}

	/// Writes the chunk's bytes to disk, then marks the index received. Returns `Completed`
	/// (with the post-finalize snapshot) exactly once per upload, the first time the mark
	/// transitions the upload from incomplete to complete.
	pub async fn record_chunk(&self, user_key: &str, upload_id: &str, index: u64, bytes: Vec<u8>) -> AppResult<ChunkOutcome> {
		let (location, metadata) = self.locate_upload(user_key, upload_id).await?;

		if index >= metadata.total_chunks {
			return Err(AppError::ChunkOutOfRange);
		}

		// Bytes land on disk before any state lock is touched.
		self.chunk_store.write_chunk(upload_id, index, &bytes).await?;

		let (upload, completed) = match location {
			UploadLocation::Memory => {
				let completed = self.registry
					.with_upload_mut(user_key, upload_id, |upload| upload.mark_chunk(index))
					.ok_or(AppError::UploadNotFound)?;

				let upload = self.registry.get(user_key, upload_id).ok_or(AppError::UploadNotFound)?;
				(upload, completed)
			},
			UploadLocation::Persistent => {
				self.state_store.with_state(|doc| {
					let user = doc.users.get_mut(user_key).ok_or(AppError::UserNotFound)?;
					let upload = user.uploads.get_mut(upload_id).ok_or(AppError::UploadNotFound)?;
					let completed = upload.mark_chunk(index);
					Ok((upload.clone(), completed))
				}).await?
			}
		};

		if completed {
			let finalized = self.finalize_upload(user_key, upload_id).await?;
			let snapshot = self.get_user_snapshot(user_key).await?;
			Ok(ChunkOutcome::Completed { upload: finalized, snapshot })
		} else {
			Ok(ChunkOutcome::Ok { upload: upload.decorate() })
		}
	}

	/// Assembles the scratch parts into the final file and moves the upload's metadata into
	/// the user's durable history. Called once, by whichever `record_chunk` caller observed
	/// the completing mark, or by `recover_on_startup` after a crash in this exact window.
	async fn finalize_upload(&self, user_key: &str, upload_id: &str) -> AppResult<DecoratedUpload> {
		let (location, mut metadata) = self.locate_upload(user_key, upload_id).await?;

		self.chunk_store.assemble(&metadata).await?;
		metadata.mark_completed();
		let history_entry = metadata.to_history_entry();

		match location {
			UploadLocation::Memory => {
				self.registry.remove(user_key, upload_id);

				self.state_store.with_state(|doc| {
					let user = doc.users.entry(user_key.to_string()).or_insert_with(|| UserRecord::new(user_key.to_string()));
					user.push_history(history_entry.clone());
					Ok(())
				}).await?;
			},
			UploadLocation::Persistent => {
				// Removal from `uploads` and the history append must land in the same disk
				// write: otherwise a crash between them drops the upload from every view
				// (not active/paused, not history) and recover_on_startup can't see it either,
				// since its scan only looks at entries still present in `uploads`.
				self.state_store.with_state(|doc| {
					let user = doc.users.entry(user_key.to_string()).or_insert_with(|| UserRecord::new(user_key.to_string()));
					user.uploads.remove(upload_id);
					user.push_history(history_entry.clone());
					Ok(())
				}).await?;
			}
		}

		Ok(metadata.decorate())
	}

	pub async fn update_status(&self, user_key: &str, upload_id: &str, action: &str) -> AppResult<DecoratedUpload> {
		match action {
			"pause" => self.set_status(user_key, upload_id, UploadStatus::Paused).await,
			"resume" => self.set_status(user_key, upload_id, UploadStatus::Active).await,
			"cancel" => self.remove_upload(user_key, upload_id, false).await,
			"forget" => self.remove_upload(user_key, upload_id, true).await,
			_ => Err(AppError::InvalidAction)
		}
	}

	async fn set_status(&self, user_key: &str, upload_id: &str, status: UploadStatus) -> AppResult<DecoratedUpload> {
		let (location, _) = self.locate_upload(user_key, upload_id).await?;

		let upload = match location {
			UploadLocation::Memory => {
				self.registry
					.with_upload_mut(user_key, upload_id, |upload| {
						upload.set_status(status);
						upload.clone()
					})
					.ok_or(AppError::UploadNotFound)?
			},
			UploadLocation::Persistent => {
				self.state_store.with_state(|doc| {
					let user = doc.users.get_mut(user_key).ok_or(AppError::UserNotFound)?;
					let upload = user.uploads.get_mut(upload_id).ok_or(AppError::UploadNotFound)?;
					upload.set_status(status);
					Ok(upload.clone())
				}).await?
			}
		};

		Ok(upload.decorate())
	}

	/// Removes the upload from wherever it lives and purges its scratch directory. Unless
	/// `forget` is set, a history entry is written first so the user can still see it happened.
	async fn remove_upload(&self, user_key: &str, upload_id: &str, forget: bool) -> AppResult<DecoratedUpload> {
		let (location, metadata) = self.locate_upload(user_key, upload_id).await?;

		self.chunk_store.purge_scratch(upload_id).await?;
		let history_entry = (!forget).then(|| metadata.to_history_entry());

		match location {
			UploadLocation::Memory => {
				self.registry.remove(user_key, upload_id);

				if let Some(history_entry) = history_entry {
					self.state_store.with_state(|doc| {
						let user = doc.users.entry(user_key.to_string()).or_insert_with(|| UserRecord::new(user_key.to_string()));
						user.push_history(history_entry.clone());
						Ok(())
					}).await?;
				}
			},
			UploadLocation::Persistent => {
				// Removal from `uploads` and the (optional) history append must land in the
				// same disk write -- otherwise a crash between them leaves the upload cancelled
				// but with no history entry ever written, even though `forget` was false.
				self.state_store.with_state(|doc| {
					let user = doc.users.entry(user_key.to_string()).or_insert_with(|| UserRecord::new(user_key.to_string()));
					user.uploads.remove(upload_id);

					if let Some(history_entry) = &history_entry {
						user.push_history(history_entry.clone());
					}

					Ok(())
				}).await?;
			}
		}

		Ok(metadata.decorate())
	}

	pub async fn clear_history(&self, user_key: &str) -> AppResult<()> {
		self.state_store.with_state(|doc| {
			let user = doc.users.get_mut(user_key).ok_or(AppError::UserNotFound)?;
			user.history.clear();
			Ok(())
		}).await
	}

	/// Re-drives assembly for any persistent upload found at boot with every chunk marked but
	/// no history entry -- the torn-completion window documented in the design notes.
	pub async fn recover_on_startup(&self) -> AppResult<()> {
		let candidates = self.state_store.read_state(|doc| {
			let mut out = Vec::new();

			for (user_key, user) in doc.users.iter() {
				for (upload_id, upload) in user.uploads.iter() {
					let in_flight = matches!(upload.status, UploadStatus::Active | UploadStatus::Paused);

					if in_flight && upload.missing_chunks().is_empty() {
						out.push((user_key.clone(), upload_id.clone()));
					}
				}
			}

			out
		}).await;

		for (user_key, upload_id) in candidates {
			match self.finalize_upload(&user_key, &upload_id).await {
				Ok(_) => log::info!("recovered torn completion for upload {} (user {})", upload_id, user_key),
				Err(err) => log::error!("failed to recover upload {} for user {}: {}", upload_id, user_key, err)
			}
		}

		Ok(())
	}
}
