//! One-file-per-key [`TokenCache`] for deployments without an external store.

// std
use std::{
	fs,
	io::ErrorKind,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, TokenCache},
};

/// Persists each cache entry as a regular file named after its key.
///
/// The directory is created on first use; failing to create it is fatal for this
/// implementation only, so callers with stricter durability needs can substitute their own
/// [`TokenCache`].
#[derive(Clone, Debug)]
pub struct FileCache {
	dir: PathBuf,
}
impl FileCache {
	/// Opens (or creates) a cache directory at the provided path.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let dir = dir.into();

		fs::create_dir_all(&dir).map_err(|e| CacheError::Backend {
			message: format!("Failed to create cache directory {}: {e}", dir.display()),
		})?;

		Ok(Self { dir })
	}

	/// Opens the crate's default cache directory under the system temp dir.
	pub fn open_default() -> Result<Self, CacheError> {
		Self::open(std::env::temp_dir().join("bru-api-cache"))
	}

	fn entry_path(&self, key: &str) -> PathBuf {
		self.dir.join(key)
	}

	fn read_entry(path: &Path) -> Result<Option<String>, CacheError> {
		match fs::read_to_string(path) {
			Ok(value) => Ok(Some(value)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(CacheError::Backend {
				message: format!("Failed to read {}: {e}", path.display()),
			}),
		}
	}

	fn write_entry(&self, path: &Path, value: &str) -> Result<(), CacheError> {
		// Write-then-rename keeps concurrent readers from observing a torn token.
		let mut tmp_path = path.to_path_buf();

		tmp_path.set_extension("tmp");
		fs::write(&tmp_path, value).map_err(|e| CacheError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		fs::rename(&tmp_path, path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}
}
impl TokenCache for FileCache {
	fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
		Box::pin(async move {
			// Only a missing entry is a miss; an unreadable one is a backend failure.
			match fs::metadata(self.entry_path(key)) {
				Ok(_) => Ok(true),
				Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
				Err(e) => Err(CacheError::Backend {
					message: format!("Failed to stat entry `{key}`: {e}"),
				}),
			}
		})
	}

	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { Self::read_entry(&self.entry_path(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.write_entry(&self.entry_path(key), value) })
	}

	fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			match fs::remove_file(self.entry_path(key)) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
				Err(e) => Err(CacheError::Backend {
					message: format!("Failed to delete entry `{key}`: {e}"),
				}),
			}
		})
	}
}
