use dashmap::DashMap;

use crate::models::UploadMetadata;

/// In-memory index of ephemeral (non-persistent) uploads, keyed by user then upload id.
///
/// Each user's bucket is its own `DashMap`, so concurrent mutations to different uploads (even
/// of the same user) don't contend, and `DashMap::get_mut` gives each individual upload its own
/// short critical section -- the same per-key locking discipline the teacher's more evolved
/// `UploadsManager` (the `DashMap<String, Mutex<ActiveUpload>>` variant) uses, generalised from
/// a single flat map to a per-user nesting so a snapshot query can enumerate one user cheaply.
#[derive(Default)]
pub struct UploadRegistry {
	buckets: DashMap<String, DashMap<String, UploadMetadata>>
}

impl UploadRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Ensures a (possibly empty) bucket exists for this user. Called on identify so a brand
	/// new user's snapshot queries don't need special-casing.
	pub fn ensure_user(&self, user_key: &str) {
		self.buckets.entry(user_key.to_string()).or_default();
	}

	pub fn insert(&self, user_key: &str, upload: UploadMetadata) {
		self.buckets
			.entry(user_key.to_string())
			.or_default()
			.insert(upload.id.clone(), upload);
	}

	pub fn get(&self, user_key: &str, upload_id: &str) -> Option<UploadMetadata> {
		self.buckets.get(user_key)?.get(upload_id).map(|entry| entry.clone())
	}

	/// Applies `mutator` to the upload in place under the shard's lock, returning its result.
	pub fn with_upload_mut<F, T>(&self, user_key: &str, upload_id: &str, mutator: F) -> Option<T>
	where
		F: FnOnce(&mut UploadMetadata) -> T
	{
		let bucket = self.buckets.get(user_key)?;
		let mut entry = bucket.get_mut(upload_id)?;
		Some(mutator(&mut entry))
	}

	pub fn remove(&self, user_key: &str, upload_id: &str) -> Option<UploadMetadata> {
		let bucket = self.buckets.get(user_key)?;
		bucket.remove(upload_id).map(|(_, upload)| upload)
	}

	pub fn list_for_user(&self, user_key: &str) -> Vec<UploadMetadata> {
		match self.buckets.get(user_key) {
			Some(bucket) => bucket.iter().map(|entry| entry.value().clone()).collect(),
			None => Vec::new()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample(id: &str) -> UploadMetadata {
		UploadMetadata::new(id.to_string(), "user".to_string(), "f".to_string(), 10, 5, false)
	}

	#[test]
	fn insert_and_get_roundtrip() {
		let registry = UploadRegistry::new();
		registry.insert("user", sample("u1"));

		let upload = registry.get("user", "u1").expect("upload present");
		assert_eq!(upload.id, "u1");
	}

	#[test]
	fn with_upload_mut_mutates_in_place() {
		let registry = UploadRegistry::new();
		registry.insert("user", sample("u1"));

		let completed = registry.with_upload_mut("user", "u1", |upload| upload.mark_chunk(0)).unwrap();
		assert!(!completed);

		let upload = registry.get("user", "u1").unwrap();
		assert_eq!(upload.received_count(), 1);
	}

	#[test]
	fn remove_drops_the_upload() {
		let registry = UploadRegistry::new();
		registry.insert("user", sample("u1"));
		assert!(registry.remove("user", "u1").is_some());
		assert!(registry.get("user", "u1").is_none());
	}

	#[test]
	fn unknown_user_bucket_yields_none_not_panic() {
		let registry = UploadRegistry::new();
		assert!(registry.get("ghost", "u1").is_none());
		assert!(registry.list_for_user("ghost").is_empty());
	}
}
