//! Thread-safe in-memory [`TokenCache`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	cache::{CacheFuture, TokenCache},
};

type CacheMap = Arc<RwLock<HashMap<String, String>>>;

/// Keeps entries in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Returns the current entry without going through the async contract; test hook.
	pub fn peek(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}
}
impl TokenCache for MemoryCache {
	fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().contains_key(key)) })
	}

	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn set<'a>(&'a self, key: &'a str, value: &'a str) -> CacheFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key.to_owned(), value.to_owned());

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> CacheFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(key);

			Ok(())
		})
	}
}
