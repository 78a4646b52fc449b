//! The API client: configuration, token lifecycle, signed request pipeline, retry control,
//! and pagination.

pub mod paginate;
pub mod pipeline;
pub mod retry;
pub mod token;

pub use pipeline::Method;
pub use retry::RetryPolicy;

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{self, Credentials, TOKEN_LEN, Token},
	cache::{FileCache, TokenCache},
	client::pipeline::AttemptSpec,
	error::ConfigError,
	http::Transport,
	obs::{self, CallKind, CallSpan, CallStage},
	sign::{Params, Payload},
	webhook,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Notification fields required by [`Client::send_notification`].
const NOTIFICATION_FIELDS: [&str; 3] = ["employee_ids", "header", "message"];

/// Coordinates signed calls against a single CRM tenant.
///
/// The client owns the parsed endpoint, the credential pair, the token slot, and references to
/// the cache + transport so the pipeline, retry controller, and paginator can focus on their
/// own logic. One instance serves one logical caller at a time: an internal async mutex
/// serializes logical calls, so sharing a client across tasks is safe but calls never overlap.
pub struct Client<T>
where
	T: ?Sized + Transport,
{
	pub(crate) endpoint: Endpoint,
	pub(crate) credentials: Credentials,
	pub(crate) sleepy: bool,
	pub(crate) retry_policy: RetryPolicy,
	pub(crate) cache: Arc<dyn TokenCache>,
	pub(crate) transport: Arc<T>,
	pub(crate) cancellation: CancellationToken,
	pub(crate) cache_key: String,
	pub(crate) token_slot: Mutex<Option<Token>>,
	pub(crate) call_guard: AsyncMutex<()>,
}
impl<T> Client<T>
where
	T: Transport,
{
	/// Starts building a client for the given tenant and credential pair.
	///
	/// `account` is either a bare subdomain (resolved to `https://<account>.business.ru`) or a
	/// full URL used verbatim.
	pub fn builder(account: impl Into<String>, app_id: u32, secret: impl Into<String>) -> ClientBuilder<T> {
		ClientBuilder {
			account: account.into(),
			app_id,
			secret: secret.into(),
			sleepy: false,
			retry_policy: RetryPolicy::default(),
			cache: None,
			transport: None,
			cancellation: CancellationToken::new(),
		}
	}

	/// Issues a signed API request and returns the verified payload.
	///
	/// An expired token (401) is rotated and retried exactly once; a 503 enters the
	/// wait-and-poll loop when the client was built `sleepy`.
	pub async fn request(&self, method: Method, model: &str, params: Params) -> Result<Payload> {
		const KIND: CallKind = CallKind::Rest;

		let span = CallSpan::new(KIND, "request");

		obs::record_call_stage(KIND, CallStage::Attempt);

		let result =
			span.instrument(self.execute(AttemptSpec::Rest { method, model, params: &params })).await;

		match &result {
			Ok(_) => obs::record_call_stage(KIND, CallStage::Success),
			Err(_) => obs::record_call_stage(KIND, CallStage::Failure),
		}

		result
	}

	/// Issues a GraphQL query against `api/rest/graphql.json`.
	///
	/// The signature shape differs from REST calls and the response carries no `app_psw`, so no
	/// integrity verification is performed; 401/503 recovery matches [`Client::request`].
	pub async fn graphql(&self, query: &str) -> Result<Payload> {
		const KIND: CallKind = CallKind::GraphQl;

		let span = CallSpan::new(KIND, "graphql");

		obs::record_call_stage(KIND, CallStage::Attempt);

		let result = span.instrument(self.execute(AttemptSpec::GraphQl { query })).await;

		match &result {
			Ok(_) => obs::record_call_stage(KIND, CallStage::Success),
			Err(_) => obs::record_call_stage(KIND, CallStage::Failure),
		}

		result
	}

	/// Sends an in-CRM notification to the given employees.
	///
	/// Fails locally with [`ConfigError::MissingNotificationField`] before touching the network
	/// when `employee_ids`, `header`, or `message` is absent.
	pub async fn send_notification(&self, params: Params) -> Result<Payload> {
		for field in NOTIFICATION_FIELDS {
			if !params.contains_key(field) {
				return Err(ConfigError::MissingNotificationField { field }.into());
			}
		}

		self.request(Method::Post, "notifications", params).await
	}

	/// Verifies an incoming webhook notification against this client's credentials.
	pub fn check_notification(&self, form: &HashMap<String, String>) -> bool {
		webhook::check(self.credentials.app_id, &self.credentials.secret, form)
	}

	/// Builds the signed wire form of a request without dispatching it.
	///
	/// A token is ensured first (which may hit the `repair` endpoint), so the returned URL and
	/// body are dispatchable as-is by any HTTP stack.
	pub async fn prepared_url(
		&self,
		method: Method,
		model: &str,
		params: &Params,
	) -> Result<PreparedRequest> {
		let _serial = self.call_guard.lock().await;
		let token = self.ensure_token().await?;
		let (url, body) = self.build_wire(method, model, params, token.expose())?;

		Ok(PreparedRequest { url, body })
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client with the default reqwest transport and file-backed token cache.
	///
	/// Use [`Client::builder`] to swap the cache, the transport, the retry policy, or to opt
	/// into rate-limit waiting.
	pub fn new(account: impl Into<String>, app_id: u32, secret: impl Into<String>) -> Result<Self> {
		Self::builder(account, app_id, secret).transport(ReqwestTransport::default()).build()
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("endpoint", &self.endpoint)
			.field("credentials", &self.credentials)
			.field("sleepy", &self.sleepy)
			.field("token_set", &self.token_slot.lock().is_some())
			.finish()
	}
}

/// Builder returned by [`Client::builder`].
pub struct ClientBuilder<T>
where
	T: ?Sized + Transport,
{
	account: String,
	app_id: u32,
	secret: String,
	sleepy: bool,
	retry_policy: RetryPolicy,
	cache: Option<Arc<dyn TokenCache>>,
	transport: Option<Arc<T>>,
	cancellation: CancellationToken,
}
impl<T> ClientBuilder<T>
where
	T: Transport,
{
	/// Opts into the 503 wait-and-poll loop instead of surfacing rate limits immediately.
	pub fn sleepy(mut self, sleepy: bool) -> Self {
		self.sleepy = sleepy;

		self
	}

	/// Replaces the default file-backed token cache.
	pub fn cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Sets the transport used for every outbound request.
	pub fn transport(mut self, transport: impl Into<Arc<T>>) -> Self {
		self.transport = Some(transport.into());

		self
	}

	/// Overrides the rate-limit polling policy (30 s interval, 300 s deadline by default).
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = policy;

		self
	}

	/// Attaches a cancellation token that aborts calls between attempts and during 503 sleeps.
	pub fn cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = token;

		self
	}

	/// Validates the configuration and constructs the client.
	pub fn build(self) -> Result<Client<T>> {
		if self.secret.len() != TOKEN_LEN {
			return Err(ConfigError::InvalidSecret.into());
		}

		let endpoint = Endpoint::parse(&self.account)?;
		let transport = self.transport.ok_or(ConfigError::MissingTransport)?;
		let cache = match self.cache {
			Some(cache) => cache,
			None => Arc::new(FileCache::open_default()?),
		};
		let cache_key = auth::cache_key(&self.account, self.app_id);

		Ok(Client {
			endpoint,
			credentials: Credentials { app_id: self.app_id, secret: self.secret },
			sleepy: self.sleepy,
			retry_policy: self.retry_policy,
			cache,
			transport,
			cancellation: self.cancellation,
			cache_key,
			token_slot: Mutex::new(None),
			call_guard: AsyncMutex::new(()),
		})
	}
}

/// Signed wire form of a request, exposed without dispatching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedRequest {
	/// Target URL; carries the signed query string for GET requests.
	pub url: Url,
	/// Form-encoded body for POST/PUT/DELETE requests; `None` for GET.
	pub body: Option<String>,
}

/// Parsed tenant endpoint; every request path hangs off `base`.
#[derive(Clone, Debug)]
pub(crate) struct Endpoint {
	base: Url,
}
impl Endpoint {
	pub(crate) fn parse(account: &str) -> Result<Self, ConfigError> {
		let invalid = || ConfigError::InvalidAccount { account: account.into() };
		let base = if account.contains("://") {
			Url::parse(account.trim_end_matches('/')).map_err(|_| invalid())?
		} else {
			if account.is_empty()
				|| !account.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
			{
				return Err(invalid());
			}

			Url::parse(&format!("https://{account}.business.ru")).map_err(|_| invalid())?
		};

		if base.host_str().is_none() || base.cannot_be_a_base() {
			return Err(invalid());
		}

		Ok(Self { base })
	}

	/// Returns `<base>/api/rest/<model>.json`.
	pub(crate) fn model_url(&self, model: &str) -> Result<Url, ConfigError> {
		let mut url = self.base.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidAccount { account: self.base.to_string() })?
			.pop_if_empty()
			.extend(["api", "rest", &format!("{model}.json")]);

		Ok(url)
	}
}
