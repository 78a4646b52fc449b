//! Business.ru CRM signed REST API client—MD5-signed requests, token repair and rotation,
//! rate-limit polling, pagination, and webhook verification with pluggable caches and transports.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod obs;
pub mod sign;
pub mod webhook;
#[cfg(feature = "reqwest")]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by the crate's integration tests; not part of
	//! the stable API surface.

	pub use crate::_prelude::*;

	pub use crate::{cache::MemoryCache, sign::Payload};

	// self
	use crate::{
		cache::TokenCache,
		client::{Client, RetryPolicy},
		http::ReqwestTransport,
		sign,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = Client<ReqwestTransport>;

	/// Constructs a [`Client`] pointed at a mock server URL, backed by an in-memory cache and a
	/// millisecond-scale retry policy so rate-limit tests finish quickly.
	pub fn build_reqwest_test_client(
		base_url: &str,
		app_id: u32,
		secret: &str,
		sleepy: bool,
	) -> (ReqwestTestClient, Arc<MemoryCache>) {
		let cache_backend = Arc::new(MemoryCache::default());
		let cache: Arc<dyn TokenCache> = cache_backend.clone();
		let client = Client::builder(base_url, app_id, secret)
			.sleepy(sleepy)
			.cache(cache)
			.transport(ReqwestTransport::default())
			.retry_policy(RetryPolicy {
				poll_interval: Duration::from_millis(10),
				deadline: Duration::from_millis(200),
			})
			.build()
			.expect("Failed to build test client.");

		(client, cache_backend)
	}

	/// Serializes `payload`, appends the matching `app_psw` response signature, and returns the
	/// body a well-behaved server would produce for the given token + secret pair.
	pub fn signed_body(token: &str, secret: &str, payload: Payload) -> String {
		let serialized = serde_json::to_string(&payload).expect("Failed to serialize test payload.");
		let signature = sign::response_signature(token, secret, &serialized);

		// `app_psw` goes last so the verifier sees the remainder in its original order.
		if payload.is_empty() {
			format!("{{\"app_psw\":\"{signature}\"}}")
		} else {
			format!(
				"{},\"app_psw\":\"{signature}\"}}",
				serialized
					.strip_suffix('}')
					.expect("Test payload must serialize to a JSON object."),
			)
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use client::{Client, ClientBuilder, Method, PreparedRequest, RetryPolicy};
pub use error::{Error, Result};
pub use sign::{Params, Payload};

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
