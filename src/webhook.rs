//! Stateless verification of incoming webhook notifications.
//!
//! The CRM signs each notification with the unauthenticated shape:
//! `md5(secret || canonical(fields))` over whichever of `app_id`, `model`, `action`, `changes`,
//! and `data` the notification carries. Each field is hashed under its own key; a signature
//! computed with `action` and `changes` collapsed into the `model` slot fails verification.

// self
use crate::{
	_prelude::*,
	sign::{self, APP_PSW_KEY, Params, canonical},
};

/// Form fields that participate in the notification signature, besides `app_id`.
const SIGNED_FIELDS: [&str; 4] = ["model", "action", "changes", "data"];

/// Verifies an incoming notification against the expected credential pair.
///
/// `form` is the parsed body of the webhook request. Returns `false` when `app_psw` is absent,
/// when `app_id` is absent or differs from the expected one, or when the recomputed signature
/// does not match bytewise.
pub fn check(app_id: u32, secret: &str, form: &HashMap<String, String>) -> bool {
	let Some(received) = form.get(APP_PSW_KEY) else {
		return false;
	};
	let Some(form_app_id) = form.get(canonical::APP_ID_KEY) else {
		return false;
	};

	if *form_app_id != app_id.to_string() {
		return false;
	}

	let mut params = Params::new();

	params.insert(canonical::APP_ID_KEY.into(), Value::String(form_app_id.clone()));

	for field in SIGNED_FIELDS {
		if let Some(value) = form.get(field) {
			params.insert(field.into(), Value::String(value.clone()));
		}
	}

	sign::handshake_signature(secret, &canonical::form_encode(&params)) == *received
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn secret() -> String {
		"s".repeat(32)
	}

	fn signed_form(fields: &[(&str, &str)]) -> HashMap<String, String> {
		let mut params = Params::new();

		for (key, value) in fields {
			params.insert((*key).into(), Value::String((*value).into()));
		}

		let signature = sign::handshake_signature(&secret(), &canonical::form_encode(&params));
		let mut form: HashMap<String, String> =
			fields.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();

		form.insert(APP_PSW_KEY.into(), signature);

		form
	}

	#[test]
	fn accepts_valid_notification() {
		let form = signed_form(&[("app_id", "42"), ("model", "goods")]);

		assert!(check(42, &secret(), &form));
	}

	#[test]
	fn rejects_mutated_fields() {
		let mut form = signed_form(&[("app_id", "42"), ("model", "goods")]);

		form.insert("model".into(), "sales".into());

		assert!(!check(42, &secret(), &form));
	}

	#[test]
	fn rejects_missing_signature_or_foreign_app_id() {
		let mut form = signed_form(&[("app_id", "42"), ("model", "goods")]);

		assert!(!check(43, &secret(), &form));

		form.remove(APP_PSW_KEY);

		assert!(!check(42, &secret(), &form));
	}

	#[test]
	fn action_and_changes_hash_under_their_own_keys() {
		// A signature computed with all three values written into `model` must be rejected.
		let form = signed_form(&[
			("app_id", "42"),
			("model", "goods"),
			("action", "update"),
			("changes", "{\"price\":5}"),
		]);

		assert!(check(42, &secret(), &form));

		let mut collapsed = Params::new();

		collapsed.insert("app_id".into(), Value::String("42".into()));
		collapsed.insert("model".into(), Value::String("{\"price\":5}".into()));

		let legacy_signature =
			sign::handshake_signature(&secret(), &canonical::form_encode(&collapsed));
		let mut legacy_form = form.clone();

		legacy_form.insert(APP_PSW_KEY.into(), legacy_signature);

		assert!(!check(42, &secret(), &legacy_form));
	}
}
