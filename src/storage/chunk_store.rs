use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

use crate::errors::{AppError, AppResult};
use crate::models::UploadMetadata;

/// Filesystem layout for chunk bytes and assembled output. Scratch parts live at
/// `<scratch_dir>/<upload_id>/<i>.part`; assembled files land at
/// `<output_dir>/<upload_id>-<safe file name>`.
#[derive(Debug, Clone)]
pub struct ChunkStore {
	scratch_dir: PathBuf,
	output_dir: PathBuf
}

impl ChunkStore {
	pub fn new(scratch_dir: PathBuf, output_dir: PathBuf) -> Self {
		Self { scratch_dir, output_dir }
	}

	fn upload_dir(&self, upload_id: &str) -> PathBuf {
		self.scratch_dir.join(upload_id)
	}

	fn part_path(&self, upload_id: &str, index: u64) -> PathBuf {
		self.upload_dir(upload_id).join(format!("{}.part", index))
	}

	/// Creates the upload's scratch directory. Called when an upload is created.
	pub async fn create_scratch_dir(&self, upload_id: &str) -> AppResult<()> {
		tokio::fs::create_dir_all(self.upload_dir(upload_id)).await?;
		Ok(())
	}

	/// Writes a chunk's bytes. Idempotent: if the part file already exists, the write is
	/// skipped and the existing bytes (from the first successful write) are kept.
	pub async fn write_chunk(&self, upload_id: &str, index: u64, bytes: &[u8]) -> AppResult<()> {
		let dir = self.upload_dir(upload_id);
		tokio::fs::create_dir_all(&dir).await?;

		let path = self.part_path(upload_id, index);

		if tokio::fs::try_exists(&path).await? {
			return Ok(());
		}

		let mut file = File::create(&path).await?;
		file.write_all(bytes).await?;
		file.flush().await?;

		Ok(())
	}

	/// Streams every part file in ascending index order into a single assembled file under
	/// `output_dir`, then removes the scratch directory. Fails without leaving a final output
	/// file if any part is missing.
	pub async fn assemble(&self, upload: &UploadMetadata) -> AppResult<PathBuf> {
		tokio::fs::create_dir_all(&self.output_dir).await?;

		let final_name = format!("{}-{}", upload.id, safe_file_name(&upload.file_name));
		let final_path = self.output_dir.join(&final_name);
		let tmp_path = self.output_dir.join(format!("{}.tmp", upload.id));

		let result = self.assemble_into(upload, &tmp_path).await;

		match result {
			Ok(()) => {
				tokio::fs::rename(&tmp_path, &final_path).await?;
				self.purge_scratch(&upload.id).await?;
				Ok(final_path)
			},
			Err(err) => {
				let _ = tokio::fs::remove_file(&tmp_path).await;
				Err(err)
			}
		}
	}

	async fn assemble_into(&self, upload: &UploadMetadata, tmp_path: &Path) -> AppResult<()> {
		let mut output = BufWriter::new(File::create(tmp_path).await?);

		for index in 0..upload.total_chunks {
			let part_path = self.part_path(&upload.id, index);

			let mut part = match File::open(&part_path).await {
				Ok(file) => file,
				Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
					return Err(AppError::MissingChunkDuringAssembly(index));
				},
				Err(err) => return Err(err.into())
			};

			let mut buf = Vec::new();
			part.read_to_end(&mut buf).await?;
			output.write_all(&buf).await?;
		}

		output.shutdown().await?;

		Ok(())
	}

	/// Recursively removes the upload's scratch directory, if present.
	pub async fn purge_scratch(&self, upload_id: &str) -> AppResult<()> {
		match tokio::fs::remove_dir_all(self.upload_dir(upload_id)).await {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into())
		}
	}
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`, operating on the file's base
/// name only (no directory components survive from an untrusted `fileName`).
pub fn safe_file_name(name: &str) -> String {
	let base = Path::new(name)
		.file_name()
		.and_then(|s| s.to_str())
		.unwrap_or("file");

	base.chars()
		.map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_upload(id: &str, total_chunks: u64) -> UploadMetadata {
		let mut upload = UploadMetadata::new(id.to_string(), "user".to_string(), "report final.csv".to_string(), total_chunks * 4, 4, true);
		upload.total_chunks = total_chunks;
		upload
	}

	#[tokio::test]
	async fn write_chunk_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		let store = ChunkStore::new(dir.path().join("uploads"), dir.path().join("files"));

		store.write_chunk("u1", 0, b"AAAA").await.unwrap();
		store.write_chunk("u1", 0, b"ZZZZ").await.unwrap();

		let bytes = tokio::fs::read(dir.path().join("uploads").join("u1").join("0.part")).await.unwrap();
		assert_eq!(bytes, b"AAAA");
	}

	#[tokio::test]
	async fn assemble_concatenates_in_ascending_order() {
		let dir = tempfile::tempdir().unwrap();
		let store = ChunkStore::new(dir.path().join("uploads"), dir.path().join("files"));

		let upload = sample_upload("u2", 3);
		store.write_chunk(&upload.id, 0, b"AAAA").await.unwrap();
		store.write_chunk(&upload.id, 1, b"BBBB").await.unwrap();
		store.write_chunk(&upload.id, 2, b"CCCC").await.unwrap();

		let final_path = store.assemble(&upload).await.unwrap();
		let contents = tokio::fs::read(&final_path).await.unwrap();

		assert_eq!(contents, b"AAAABBBBCCCC");
		assert!(!dir.path().join("uploads").join("u2").exists());
	}

	#[tokio::test]
	async fn assemble_fails_on_missing_chunk_and_leaves_no_output() {
		let dir = tempfile::tempdir().unwrap();
		let store = ChunkStore::new(dir.path().join("uploads"), dir.path().join("files"));

		let upload = sample_upload("u3", 2);
		store.write_chunk(&upload.id, 0, b"AAAA").await.unwrap();

		let result = store.assemble(&upload).await;
		assert!(matches!(result, Err(AppError::MissingChunkDuringAssembly(1))));

		let final_name = format!("{}-{}", upload.id, safe_file_name(&upload.file_name));
		assert!(!dir.path().join("files").join(final_name).exists());
	}

	#[test]
	fn safe_file_name_strips_path_components_and_unsafe_chars() {
		assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
		assert_eq!(safe_file_name("report final (v2).csv"), "report_final__v2_.csv");
	}
}
