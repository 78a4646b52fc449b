//! Signed request construction, dispatch, and response classification.
//!
//! One invocation equals one HTTP attempt: the pipeline signs the canonical form with the
//! current token, dispatches through the transport, and classifies the result as a
//! [`CallOutcome`]. It never retries; the retry controller owns that decision.

// crates.io
use http::{
	Method as HttpMethod, Request,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	client::Client,
	error::ConfigError,
	http::{Transport, WireRequest},
	obs,
	sign::{self, APP_PSW_KEY, Params, Payload, canonical},
};

/// HTTP verbs accepted by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// Read; the signed form travels on the query string.
	Get,
	/// Create; the signed form travels in the body.
	Post,
	/// Update; the signed form travels in the body.
	Put,
	/// Remove; the signed form travels in the body.
	Delete,
}
impl Method {
	fn as_http(self) -> HttpMethod {
		match self {
			Method::Get => HttpMethod::GET,
			Method::Post => HttpMethod::POST,
			Method::Put => HttpMethod::PUT,
			Method::Delete => HttpMethod::DELETE,
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_http().as_str())
	}
}

/// One logical request as seen by the pipeline and retry controller.
#[derive(Clone, Copy, Debug)]
pub(crate) enum AttemptSpec<'a> {
	/// Signed REST call against `api/rest/<model>.json`.
	Rest {
		method: Method,
		model: &'a str,
		params: &'a Params,
	},
	/// GraphQL call against `api/rest/graphql.json`.
	GraphQl { query: &'a str },
}

/// Classification of a single HTTP attempt.
#[derive(Clone, Debug)]
pub(crate) enum CallOutcome {
	/// 200 with a verified payload (`app_psw` removed).
	Ok(Payload),
	/// 200 whose response signature failed verification.
	AuthMismatch,
	/// 401; the token must be rotated.
	TokenExpired,
	/// 503; the request limit is exhausted.
	RateLimited,
	/// Any other status, surfaced verbatim.
	HttpError(u16),
}

impl<T> Client<T>
where
	T: Transport,
{
	/// Executes one HTTP attempt and classifies the response.
	pub(crate) async fn attempt(&self, spec: &AttemptSpec<'_>) -> Result<CallOutcome> {
		let token = self.current_token().map(|t| t.expose().to_owned()).unwrap_or_default();
		let request = match spec {
			AttemptSpec::Rest { method, model, params } =>
				self.build_rest_request(*method, model, params, &token)?,
			AttemptSpec::GraphQl { query } => self.build_graphql_request(query, &token)?,
		};
		let response = self.transport.send(request).await?;
		let status = response.status().as_u16();
		let kind = match spec {
			AttemptSpec::Rest { .. } => obs::CallKind::Rest,
			AttemptSpec::GraphQl { .. } => obs::CallKind::GraphQl,
		};

		match status {
			200 => match spec {
				AttemptSpec::Rest { .. } =>
					match sign::verify_response(&token, &self.credentials.secret, response.body()) {
						Ok(payload) => {
							obs::note_status(kind, status);
							self.sync_token(&payload);

							Ok(CallOutcome::Ok(payload))
						},
						Err(Error::AuthMismatch) => {
							obs::note_auth_mismatch(kind);

							Ok(CallOutcome::AuthMismatch)
						},
						Err(e) => Err(e),
					},
				// GraphQL responses carry no `app_psw`; parsed without verification.
				AttemptSpec::GraphQl { .. } =>
					Ok(CallOutcome::Ok(sign::parse_unverified(response.body())?)),
			},
			401 => {
				obs::note_status(kind, status);

				Ok(CallOutcome::TokenExpired)
			},
			503 => {
				obs::note_status(kind, status);

				Ok(CallOutcome::RateLimited)
			},
			other => Ok(CallOutcome::HttpError(other)),
		}
	}

	/// Builds the signed wire form: the target URL plus the body for non-GET methods.
	pub(crate) fn build_wire(
		&self,
		method: Method,
		model: &str,
		params: &Params,
		token: &str,
	) -> Result<(Url, Option<String>), ConfigError> {
		let canonical = canonical::request_form(params, self.credentials.app_id);
		let signature = sign::request_signature(token, &self.credentials.secret, &canonical);
		let wire = format!("{canonical}&{APP_PSW_KEY}={signature}");
		let mut url = self.endpoint.model_url(model)?;

		match method {
			Method::Get => {
				url.set_query(Some(&wire));

				Ok((url, None))
			},
			_ => Ok((url, Some(wire))),
		}
	}

	fn build_rest_request(
		&self,
		method: Method,
		model: &str,
		params: &Params,
		token: &str,
	) -> Result<WireRequest, ConfigError> {
		let (url, body) = self.build_wire(method, model, params, token)?;
		let builder = Request::builder().method(method.as_http()).uri(url.as_str());

		Ok(match body {
			Some(wire) => builder
				.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
				.body(wire.into_bytes())?,
			None => builder.body(Vec::new())?,
		})
	}

	fn build_graphql_request(&self, query: &str, token: &str) -> Result<WireRequest, ConfigError> {
		let app_id = self.credentials.app_id;
		let signature = sign::graphql_signature(app_id, &self.credentials.secret, token);
		let mut url = self.endpoint.model_url("graphql")?;

		url.set_query(Some(&format!("{}={app_id}&{APP_PSW_KEY}={signature}", canonical::APP_ID_KEY)));

		let body = serde_json::json!({ "query": query }).to_string();

		Ok(Request::builder()
			.method(HttpMethod::POST)
			.uri(url.as_str())
			.header(AUTHORIZATION, token)
			.header(CONTENT_TYPE, "application/json")
			.body(body.into_bytes())?)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn method_displays_as_http_verb() {
		assert_eq!(Method::Get.to_string(), "GET");
		assert_eq!(Method::Delete.to_string(), "DELETE");
	}
}
