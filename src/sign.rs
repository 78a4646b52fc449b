//! Signature shapes and response-envelope verification.
//!
//! The wire protocol is MD5-based (a legacy server requirement, not a cryptographic choice).
//! Three request shapes exist: the token-bound signature attached to every normal call, the
//! unauthenticated shape used by the `repair` handshake and webhook notifications, and the
//! GraphQL shape computed over `app_id`, secret, and token. A 200 response is accepted only if
//! its `app_psw` field matches the MD5 of token + secret + the remaining payload's JSON text.

pub mod canonical;

pub use canonical::Params;

// self
use crate::_prelude::*;

/// Verified response payload: the 200 envelope with `app_psw` removed.
pub type Payload = serde_json::Map<String, Value>;

/// Signature field carried by every request and 200 response.
pub const APP_PSW_KEY: &str = "app_psw";

/// Lowercase hex MD5 digest of the input bytes.
pub fn md5_hex(input: &str) -> String {
	format!("{:x}", md5::compute(input))
}

/// Token-bound request signature attached to every normal API call.
pub fn request_signature(token: &str, secret: &str, canonical: &str) -> String {
	md5_hex(&format!("{token}{secret}{canonical}"))
}

/// Unauthenticated signature used by the `repair` handshake and webhook notifications.
pub fn handshake_signature(secret: &str, canonical: &str) -> String {
	md5_hex(&format!("{secret}{canonical}"))
}

/// GraphQL request signature, placed on the query string next to `app_id`.
pub fn graphql_signature(app_id: u32, secret: &str, token: &str) -> String {
	md5_hex(&format!("{app_id}{secret}{token}"))
}

/// Integrity signature of a response payload (its JSON text without `app_psw`).
pub fn response_signature(token: &str, secret: &str, payload_json: &str) -> String {
	md5_hex(&format!("{token}{secret}{payload_json}"))
}

/// Parses a response body into its JSON object without checking any signature.
///
/// The `repair` handshake and GraphQL responses carry no `app_psw`, so this is their only
/// decoding path.
pub fn parse_unverified(body: &[u8]) -> Result<Payload> {
	let deserializer = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(deserializer).map_err(|source| Error::Serialisation { source })
}

/// Verifies a 200 response envelope and returns the payload with `app_psw` removed.
///
/// The remainder is re-serialized in the key order the server sent it, which is why the crate
/// pins `serde_json`'s `preserve_order` feature.
pub fn verify_response(token: &str, secret: &str, body: &[u8]) -> Result<Payload> {
	let mut payload = parse_unverified(body)?;
	let Some(Value::String(received)) = payload.remove(APP_PSW_KEY) else {
		return Err(Error::AuthMismatch);
	};
	let serialized = Value::Object(payload.clone()).to_string();

	if response_signature(token, secret, &serialized) != received {
		return Err(Error::AuthMismatch);
	}

	Ok(payload)
}
