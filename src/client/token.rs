//! Token lifecycle: lazy acquisition, cache hydration, and 401-driven rotation.
//!
//! The slot holds at most one in-memory token; the cache keeps a persistent copy under
//! `md5(account || app_id)` shared last-writer-wins across processes. Duplicate rotations
//! across processes are tolerated because any valid token is acceptable to the server.

// crates.io
use http::{Method as HttpMethod, Request};
// self
use crate::{
	_prelude::*,
	auth::Token,
	client::Client,
	error::{AuthError, ConfigError},
	http::Transport,
	obs::{self, CallKind, CallSpan, CallStage},
	sign::{self, APP_PSW_KEY, Params, canonical},
};

impl<T> Client<T>
where
	T: Transport,
{
	/// Returns the in-memory token, if one has been loaded or acquired.
	pub(crate) fn current_token(&self) -> Option<Token> {
		self.token_slot.lock().clone()
	}

	/// Returns a usable token: the slot first, then the cache, then a fresh handshake.
	///
	/// Callers hold the call guard, so at most one acquisition is in flight per instance.
	pub(crate) async fn ensure_token(&self) -> Result<Token> {
		if let Some(token) = self.current_token() {
			return Ok(token);
		}
		if let Some(cached) = self.cache.get(&self.cache_key).await?
			&& let Some(token) = Token::new(cached)
		{
			*self.token_slot.lock() = Some(token.clone());

			return Ok(token);
		}

		// Missing or malformed cache entry; fall through to a fresh handshake.
		self.rotate().await
	}

	/// Acquires a fresh token, replaces the slot, and overwrites the cache entry.
	pub(crate) async fn rotate(&self) -> Result<Token> {
		let token = self.acquire().await?;

		*self.token_slot.lock() = Some(token.clone());
		self.cache.set(&self.cache_key, token.expose()).await?;

		Ok(token)
	}

	/// Adopts a rotated token the server piggybacked on a verified payload.
	///
	/// The persistent copy is left alone; it is overwritten on the next explicit rotation.
	pub(crate) fn sync_token(&self, payload: &sign::Payload) {
		if let Some(Value::String(value)) = payload.get("token")
			&& let Some(token) = Token::new(value.clone())
		{
			let mut slot = self.token_slot.lock();

			if slot.as_ref() != Some(&token) {
				*slot = Some(token);
			}
		}
	}

	/// Performs the `repair` handshake: a GET with an empty token and the unauthenticated
	/// signature shape. The response is parsed without verification; the server does not sign
	/// repair payloads against a token the client does not have yet.
	async fn acquire(&self) -> Result<Token> {
		const KIND: CallKind = CallKind::Repair;

		let span = CallSpan::new(KIND, "acquire");

		obs::record_call_stage(KIND, CallStage::Attempt);

		let result = span.instrument(self.acquire_inner()).await;

		match &result {
			Ok(_) => obs::record_call_stage(KIND, CallStage::Success),
			Err(_) => obs::record_call_stage(KIND, CallStage::Failure),
		}

		result
	}

	async fn acquire_inner(&self) -> Result<Token> {
		let canonical = canonical::request_form(&Params::new(), self.credentials.app_id);
		let signature = sign::handshake_signature(&self.credentials.secret, &canonical);
		let mut url = self.endpoint.model_url("repair")?;

		url.set_query(Some(&format!("{canonical}&{APP_PSW_KEY}={signature}")));

		let request = Request::builder()
			.method(HttpMethod::GET)
			.uri(url.as_str())
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = self.transport.send(request).await?;
		let status = response.status().as_u16();

		if status != 200 {
			return Err(AuthError::Handshake { status }.into());
		}

		let payload = sign::parse_unverified(response.body())?;

		match payload.get("token") {
			Some(Value::String(value)) =>
				Token::new(value.clone()).ok_or_else(|| AuthError::MalformedToken.into()),
			_ => Err(AuthError::MalformedToken.into()),
		}
	}
}
