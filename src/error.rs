//! Client-level error types shared across the pipeline, caches, and transports.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Cache-layer failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		crate::cache::CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token handshake or rotation failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A 200 response whose `app_psw` signature did not match the payload.
	#[error("Response signature did not match the payload.")]
	AuthMismatch,
	/// The server replied 503 and the client is not configured to wait.
	#[error("Request limit exceeded; the server replied 503.")]
	RateLimited,
	/// The 503 wait-and-poll loop ran past its wall-clock deadline.
	#[error("Rate-limit polling exceeded the configured deadline.")]
	DeadlineExceeded,
	/// Any other non-200 status surfaced verbatim.
	#[error("Server replied with HTTP {status}.")]
	Http {
		/// Status code returned by the server.
		status: u16,
	},
	/// The logical call was aborted by the caller's cancellation token.
	#[error("Call was cancelled.")]
	Cancelled,
	/// Response body is not valid JSON or has an unexpected shape.
	#[error("Response body could not be deserialized.")]
	Serialisation {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
	},
}

/// Configuration and validation failures raised while building or using a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Account argument is neither a subdomain label nor a parseable URL.
	#[error("Account `{account}` is not a valid subdomain or URL.")]
	InvalidAccount {
		/// The rejected account argument.
		account: String,
	},
	/// Secret is not the expected 32-character string.
	#[error("Secret must be exactly 32 characters.")]
	InvalidSecret,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Builder finished without a transport.
	#[error("A transport must be provided before building the client.")]
	MissingTransport,
	/// A notification is missing one of its required fields.
	#[error("Notification parameters must include `{field}`.")]
	MissingNotificationField {
		/// The absent field name.
		field: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token acquisition and rotation failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The `repair` handshake returned a non-200 status.
	#[error("Token handshake failed with HTTP {status}.")]
	Handshake {
		/// Status code returned by the repair endpoint.
		status: u16,
	},
	/// The `repair` payload did not carry a 32-character token.
	#[error("Token handshake returned a malformed token.")]
	MalformedToken,
	/// The server rejected a freshly rotated token with a second 401.
	#[error("Server rejected the credentials after a token rotation.")]
	TokenRejected,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
