//! Token persistence contracts and built-in cache implementations.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::_prelude::*;

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Key-to-string storage contract for persisted session tokens.
///
/// A missing entry is not an error: [`get`](TokenCache::get) resolves to `None` on a miss.
/// Entries are opaque bytes to the backend; the client only ever stores token strings under
/// the derived [`cache_key`](crate::auth::cache_key).
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Returns whether an entry exists for the key.
	fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool>;

	/// Fetches the entry for the key, if present.
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;

	/// Durably stores or replaces the entry for the key.
	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> CacheFuture<'a, ()>;

	/// Removes the entry for the key, if present.
	fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// The backend refused a read or write (permissions, IO).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
