//! Fetch-all pagination: a count probe plus page fan-out merged into one payload.

// self
use crate::{
	_prelude::*,
	client::{Client, Method},
	http::Transport,
	obs::{self, CallKind, CallSpan, CallStage},
	sign::{Params, Payload},
};

/// Server-side page size ceiling.
const PAGE_SIZE: u64 = 250;

/// Shape of `result` in a `count_only=1` probe response.
#[derive(Debug, Deserialize)]
struct CountProbe {
	count: Option<u64>,
}

impl<T> Client<T>
where
	T: Transport,
{
	/// Fetches every row of `model` matching `params`, fanning out over pages of 250.
	///
	/// A caller-supplied `limit` (numeric, or a numeric string as form-shaped callers send it)
	/// is trusted as the row count and skips the probe. Pages are requested in ascending order
	/// and their `result` lists concatenated in that order; the
	/// last page's `status` and `request_count` are preserved on the aggregate.
	pub async fn request_all(&self, model: &str, params: Params) -> Result<Payload> {
		const KIND: CallKind = CallKind::Pagination;

		let span = CallSpan::new(KIND, "request_all");

		obs::record_call_stage(KIND, CallStage::Attempt);

		let result = span.instrument(self.fetch_all(model, params)).await;

		match &result {
			Ok(_) => obs::record_call_stage(KIND, CallStage::Success),
			Err(_) => obs::record_call_stage(KIND, CallStage::Failure),
		}

		result
	}

	async fn fetch_all(&self, model: &str, mut params: Params) -> Result<Payload> {
		let caller_limit = params.get("limit").and_then(coerce_limit);
		let max_limit = match caller_limit {
			Some(limit) => limit,
			None => {
				let mut probe_params = params.clone();

				probe_params.insert("count_only".into(), Value::from(1));

				let probe = self.request(Method::Get, model, probe_params).await?;
				let count = probe
					.get("result")
					.and_then(|result| {
						serde_json::from_value::<CountProbe>(result.clone()).ok()
					})
					.and_then(|probe| probe.count);

				match count {
					Some(count) => count,
					// The model does not support counting; hand back the probe verbatim.
					None => return Ok(probe),
				}
			},
		};

		if max_limit <= PAGE_SIZE {
			return self.request(Method::Get, model, params).await;
		}

		let pages = max_limit.div_ceil(PAGE_SIZE);
		let mut rows = Vec::new();
		let mut aggregated = Payload::new();

		for page in 1..=pages {
			params.insert("limit".into(), Value::from(PAGE_SIZE));
			params.insert("page".into(), Value::from(page));

			let mut response = self.request(Method::Get, model, params.clone()).await?;
			let page_rows = match response.remove("result") {
				Some(Value::Array(items)) => items,
				_ => Vec::new(),
			};
			let exhausted = page_rows.is_empty();

			rows.extend(page_rows);

			for key in ["status", "request_count"] {
				if let Some(value) = response.remove(key) {
					aggregated.insert(key.into(), value);
				}
			}

			// A short page ends the walk early only when the count came from a probe; a
			// caller-supplied limit is honored to the letter.
			if exhausted && caller_limit.is_none() {
				break;
			}
		}

		aggregated.insert("result".into(), Value::Array(rows));

		Ok(aggregated)
	}
}

/// Reads a caller-supplied `limit`, accepting numbers and numeric strings alike.
fn coerce_limit(value: &Value) -> Option<u64> {
	match value {
		Value::Number(number) => number.as_u64(),
		Value::String(text) => text.parse().ok(),
		_ => None,
	}
}
