//! Deterministic form-urlencoded rendering of request parameters.
//!
//! Every signature in the protocol is computed over the exact byte sequence produced here, so
//! the rendering must match what the server reconstructs: top-level keys in ascending byte
//! order, `null` flattened to the empty string, booleans as `1`/`0`, nested mappings as
//! `key[sub]=…`, and HTML-form percent encoding (space becomes `+`, `*` becomes `%2A`).

// std
use std::collections::BTreeMap;
// crates.io
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Request parameter mapping, keyed by field name.
pub type Params = serde_json::Map<String, Value>;

/// Key injected into every outbound request.
pub const APP_ID_KEY: &str = "app_id";
/// Nested image payloads are flattened to an opaque JSON string before encoding.
const IMAGES_KEY: &str = "images";

/// Renders the canonical form-encoded string for an outbound request: the caller's parameters
/// with `images` flattened and `app_id` injected.
pub fn request_form(params: &Params, app_id: u32) -> String {
	let mut working = params.clone();

	if let Some(images) = working.get(IMAGES_KEY)
		&& (images.is_array() || images.is_object())
	{
		// Display for `Value` is its JSON text; the server treats the field as an opaque string.
		let flattened = images.to_string();

		working.insert(IMAGES_KEY.into(), Value::String(flattened));
	}

	working.insert(APP_ID_KEY.into(), Value::from(app_id));

	form_encode(&working)
}

/// Renders a parameter mapping as its canonical form-encoded string without touching its
/// contents. Webhook verification hashes incoming fields through this entry point.
pub fn form_encode(params: &Params) -> String {
	let sorted: BTreeMap<&String, &Value> = params.iter().collect();
	let mut pairs = Vec::with_capacity(params.len());

	for (key, value) in sorted {
		collect_pairs(key, value, &mut pairs);
	}

	let mut out = String::new();

	for (key, value) in pairs {
		if !out.is_empty() {
			out.push('&');
		}

		out.push_str(&percent_encode(&key));
		out.push('=');
		out.push_str(&percent_encode(&value));
	}

	out
}

fn percent_encode(input: &str) -> String {
	let serialized: String = form_urlencoded::byte_serialize(input.as_bytes()).collect();

	// `byte_serialize` leaves `*` literal; the server renders it as `%2A`.
	serialized.replace('*', "%2A")
}

fn collect_pairs(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
	match value {
		// Nulls render as empty strings rather than the literal `null`.
		Value::Null => out.push((key.to_owned(), String::new())),
		Value::Bool(flag) => out.push((key.to_owned(), if *flag { "1" } else { "0" }.into())),
		Value::Number(number) => out.push((key.to_owned(), number.to_string())),
		Value::String(text) => out.push((key.to_owned(), text.clone())),
		Value::Array(items) =>
			for (index, item) in items.iter().enumerate() {
				collect_pairs(&format!("{key}[{index}]"), item, out);
			},
		Value::Object(map) =>
			for (sub_key, sub_value) in map {
				collect_pairs(&format!("{key}[{sub_key}]"), sub_value, out);
			},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn params(value: Value) -> Params {
		value.as_object().expect("Fixture must be a JSON object.").clone()
	}

	#[test]
	fn empty_params_render_app_id_only() {
		assert_eq!(request_form(&Params::new(), 42), "app_id=42");
	}

	#[test]
	fn keys_sort_byte_wise() {
		let input = params(serde_json::json!({ "b": "2", "a": "1", "limit": 10 }));

		assert_eq!(request_form(&input, 7), "a=1&app_id=7&b=2&limit=10");
	}

	#[test]
	fn encoding_is_stable_across_deep_copies() {
		let input = params(serde_json::json!({
			"name": "чай",
			"nested": { "x": 1, "y": [true, null] },
		}));
		let copy = input.clone();

		assert_eq!(request_form(&input, 1), request_form(&copy, 1));
	}

	#[test]
	fn nulls_become_empty_strings() {
		let input = params(serde_json::json!({ "comment": null, "tags": [null, "a"] }));
		let encoded = request_form(&input, 3);

		assert!(!encoded.contains("null"));
		assert_eq!(encoded, "app_id=3&comment=&tags%5B0%5D=&tags%5B1%5D=a");
	}

	#[test]
	fn booleans_render_as_bits() {
		let input = params(serde_json::json!({ "deleted": false, "spend_bonuses": true }));

		assert_eq!(request_form(&input, 1), "app_id=1&deleted=0&spend_bonuses=1");
	}

	#[test]
	fn spaces_and_reserved_characters_follow_form_rules() {
		let input = params(serde_json::json!({ "name": "green tea", "note": "a&b=c" }));

		assert_eq!(request_form(&input, 1), "app_id=1&name=green+tea&note=a%26b%3Dc");
	}

	#[test]
	fn asterisks_encode_as_percent_2a() {
		let input = params(serde_json::json!({ "mask": "**", "note": "a*b" }));

		assert_eq!(request_form(&input, 1), "app_id=1&mask=%2A%2A&note=a%2Ab");
	}

	#[test]
	fn nested_images_flatten_to_json() {
		let input = params(serde_json::json!({ "images": [{ "url": "x" }] }));
		let encoded = request_form(&input, 9);

		assert_eq!(
			encoded,
			format!(
				"app_id=9&images={}",
				form_urlencoded::byte_serialize(b"[{\"url\":\"x\"}]").collect::<String>(),
			),
		);
	}

	#[test]
	fn scalar_images_pass_through() {
		let input = params(serde_json::json!({ "images": "already-a-string" }));

		assert_eq!(request_form(&input, 9), "app_id=9&images=already-a-string");
	}

	#[test]
	fn nested_mappings_render_bracketed_paths() {
		let input = params(serde_json::json!({ "filter": { "status": "active", "ids": [5, 6] } }));

		// Nested mappings keep their own order; only top-level keys are sorted.
		assert_eq!(
			request_form(&input, 2),
			"app_id=2&filter%5Bstatus%5D=active&filter%5Bids%5D%5B0%5D=5&filter%5Bids%5D%5B1%5D=6",
		);
	}

	#[test]
	fn no_trailing_ampersand() {
		let input = params(serde_json::json!({ "a": "1" }));

		assert!(!request_form(&input, 1).ends_with('&'));
	}
}
