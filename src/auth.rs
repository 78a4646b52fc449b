//! Credential types: the session token wrapper, app credentials, and the cache-key derivation.

// self
use crate::_prelude::*;

/// Length the server guarantees for both tokens and secrets.
pub const TOKEN_LEN: usize = 32;

/// Redacted 32-character session token issued by the `repair` endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token(String);
impl Token {
	/// Wraps a server-issued token, rejecting anything that is not exactly 32 characters.
	pub fn new(value: impl Into<String>) -> Option<Self> {
		let value = value.into();

		(value.len() == TOKEN_LEN).then_some(Self(value))
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Token {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Token").field(&"<redacted>").finish()
	}
}
impl Display for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Integration credential pair identifying the caller to the CRM.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
	/// Integration identifier transmitted as `app_id`.
	pub app_id: u32,
	/// Shared 32-character secret, never transmitted in the clear.
	pub secret: String,
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("app_id", &self.app_id)
			.field("secret", &"<redacted>")
			.finish()
	}
}

/// Derives the cache key under which the token for `account` + `app_id` is persisted.
///
/// The key doubles as the file name of the default [`FileCache`](crate::cache::FileCache) entry,
/// so it must stay stable across releases.
pub fn cache_key(account: &str, app_id: u32) -> String {
	format!("{:x}", md5::compute(format!("{account}{app_id}")))
}
