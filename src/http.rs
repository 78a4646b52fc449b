//! Transport primitives for signed API exchanges.
//!
//! The [`Transport`] trait is the client's only dependency on an HTTP stack: one method that
//! takes a fully built request and resolves to the raw response. Wire-level failures (DNS,
//! connect, TLS, read) surface as [`TransportError`] and bypass the pipeline's status
//! classification entirely. Per-attempt timeouts belong to the transport; the client never
//! adds its own.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Outbound request handed to a [`Transport`]; the body already carries the signed wire form.
pub type WireRequest = http::Request<Vec<u8>>;
/// Raw response returned by a [`Transport`]: status code plus body bytes.
pub type WireResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<WireResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing a single request/response exchange.
///
/// Implementations must be `Send + Sync + 'static` so one client can be shared across tasks
/// without extra wrappers. The client relies on exactly two guarantees: the response carries an
/// integer status code, and its body bytes are readable.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes the request and resolves to the raw response.
	fn send(&self, request: WireRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// API responses are returned directly rather than via redirects, so custom clients should
/// disable redirect following before being wrapped here.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: WireRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let outbound = reqwest::Request::try_from(request).map_err(TransportError::from)?;
			let response = self.0.execute(outbound).await.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();
			let mut rebuilt = WireResponse::new(body);

			*rebuilt.status_mut() = status;
			*rebuilt.headers_mut() = headers;

			Ok(rebuilt)
		})
	}
}
