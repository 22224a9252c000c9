//! Uploaded image storage.

use async_trait::async_trait;
use newsdesk_http::UploadedFile;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("IO error: {0}")]
	Io(#[from] io::Error),
	#[error("File not found: {0}")]
	NotFound(String),
	#[error("Path traversal detected in filename")]
	PathTraversal,
	#[error("Empty filename")]
	EmptyName,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage backend for uploaded files.
///
/// Names are flat file names; backends reject anything that could escape
/// their root.
#[async_trait]
pub trait StorageBackend: Send + Sync {
	/// Save a file, replacing any file of the same name. Returns the name.
	async fn save(&self, name: &str, content: &[u8]) -> Result<String>;

	async fn open(&self, name: &str) -> Result<Vec<u8>>;

	async fn delete(&self, name: &str) -> Result<()>;

	async fn exists(&self, name: &str) -> Result<bool>;
}

/// Reject `.`, `..` and names containing separators, raw or
/// percent-encoded. Interior dots (`photo..jpg`) stay a single flat name.
pub fn validate_safe_filename(filename: &str) -> Result<()> {
	if filename.is_empty() {
		return Err(StorageError::EmptyName);
	}

	let decoded = percent_decode_str(filename).decode_utf8_lossy();
	for candidate in [filename, decoded.as_ref()] {
		if candidate == "."
			|| candidate == ".."
			|| candidate.contains('\0')
			|| candidate.contains('/')
			|| candidate.contains('\\')
		{
			return Err(StorageError::PathTraversal);
		}
		// Windows drive prefix
		if candidate.len() >= 2
			&& candidate.as_bytes()[0].is_ascii_alphabetic()
			&& candidate.as_bytes()[1] == b':'
		{
			return Err(StorageError::PathTraversal);
		}
	}
	Ok(())
}

const WINDOWS_DEVICE_NAMES: &[&str] = &[
	"CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
	"COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce a client-supplied filename to a safe flat name.
///
/// Non-ASCII characters are dropped, path separators and whitespace runs
/// become `_`, anything outside `[A-Za-z0-9_.-]` is removed and leading or
/// trailing `.`/`_` are stripped. The result can be empty.
///
/// # Examples
///
/// ```
/// use newsdesk::storage::secure_filename;
///
/// assert_eq!(secure_filename("My cat.jpg"), "My_cat.jpg");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(secure_filename("../"), "");
/// ```
pub fn secure_filename(name: &str) -> String {
	let ascii: String = name
		.chars()
		.filter(char::is_ascii)
		.map(|c| if c == '/' || c == '\\' { ' ' } else { c })
		.collect();
	let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
	let cleaned: String = joined
		.chars()
		.filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
		.collect();
	let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

	let stem = trimmed.split('.').next().unwrap_or_default();
	if WINDOWS_DEVICE_NAMES.contains(&stem.to_ascii_uppercase().as_str()) {
		return format!("_{trimmed}");
	}
	trimmed.to_string()
}

/// Local file system storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
	base_path: PathBuf,
}

impl LocalStorage {
	pub fn new(base_path: impl Into<PathBuf>) -> Self {
		Self {
			base_path: base_path.into(),
		}
	}

	pub fn base_path(&self) -> &std::path::Path {
		&self.base_path
	}

	/// Create the root directory if needed
	pub async fn prepare(&self) -> Result<()> {
		fs::create_dir_all(&self.base_path).await?;
		Ok(())
	}

	fn get_path(&self, name: &str) -> Result<PathBuf> {
		validate_safe_filename(name)?;
		Ok(self.base_path.join(name))
	}
}

#[async_trait]
impl StorageBackend for LocalStorage {
	async fn save(&self, name: &str, content: &[u8]) -> Result<String> {
		let path = self.get_path(name)?;
		fs::create_dir_all(&self.base_path).await?;
		fs::write(&path, content).await?;
		Ok(name.to_string())
	}

	async fn open(&self, name: &str) -> Result<Vec<u8>> {
		let path = self.get_path(name)?;
		match fs::read(&path).await {
			Ok(content) => Ok(content),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(name.to_string())),
			Err(e) => Err(e.into()),
		}
	}

	async fn delete(&self, name: &str) -> Result<()> {
		let path = self.get_path(name)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(name.to_string())),
			Err(e) => Err(e.into()),
		}
	}

	async fn exists(&self, name: &str) -> Result<bool> {
		let path = self.get_path(name)?;
		Ok(fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false))
	}
}

/// An image written by [`ImageUploads::store`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
	/// Value stored on the article, e.g. `uploads/photo.jpg`
	pub reference: String,
	pub file_name: String,
	/// False when an existing file of the same name was overwritten
	pub created: bool,
}

/// Article images kept in a storage backend under a fixed subdirectory
/// of the static root.
#[derive(Clone)]
pub struct ImageUploads {
	backend: Arc<dyn StorageBackend>,
	subdir: String,
}

impl ImageUploads {
	pub fn new(backend: Arc<dyn StorageBackend>, subdir: impl Into<String>) -> Self {
		Self {
			backend,
			subdir: subdir.into().trim_matches('/').to_string(),
		}
	}

	/// Uploads on the local disk at `<static_dir>/<subdir>`
	pub fn local(static_dir: impl Into<PathBuf>, subdir: &str) -> (Self, LocalStorage) {
		let local = LocalStorage::new(static_dir.into().join(subdir));
		(Self::new(Arc::new(local.clone()), subdir), local)
	}

	/// Reference stored on a record for `file_name`
	pub fn reference(&self, file_name: &str) -> String {
		format!("{}/{}", self.subdir, file_name)
	}

	/// Save an uploaded file under its sanitized name.
	///
	/// `Ok(None)` when the client filename sanitizes to nothing.
	pub async fn store(&self, file: &UploadedFile) -> Result<Option<StoredImage>> {
		let file_name = secure_filename(&file.filename);
		if file_name.is_empty() {
			return Ok(None);
		}
		let created = !self.backend.exists(&file_name).await?;
		self.backend.save(&file_name, &file.data).await?;
		tracing::info!(file = %file_name, bytes = file.data.len(), "image stored");
		Ok(Some(StoredImage {
			reference: self.reference(&file_name),
			file_name,
			created,
		}))
	}

	/// Undo [`ImageUploads::store`] after the record could not be saved.
	///
	/// Overwritten files are left in place; failures are only logged.
	pub async fn discard(&self, image: &StoredImage) {
		if !image.created {
			return;
		}
		if let Err(err) = self.backend.delete(&image.file_name).await {
			tracing::warn!(file = %image.file_name, error = %err, "failed to remove orphaned image");
		}
	}
}
