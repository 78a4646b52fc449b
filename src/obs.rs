//! Optional observability for API calls.
//!
//! # Feature Flags
//!
//! - `tracing`: every client helper runs inside a `bru_api.call` span carrying the call kind
//!   and entry point, and status classifications are emitted as events.
//! - `metrics`: the `bru_api_call_total` counter is incremented per attempt/success/failure,
//!   labeled by `call` + `stage`.
//!
//! Without the features every helper in this module compiles down to a no-op.

// self
use crate::_prelude::*;

/// API call kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Signed REST call against `api/rest/<model>.json`.
	Rest,
	/// Token handshake against `api/rest/repair.json`.
	Repair,
	/// GraphQL call against `api/rest/graphql.json`.
	GraphQl,
	/// Aggregated fetch-all pagination.
	Pagination,
}

/// Stage labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallStage {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}

macro_rules! stable_label {
	($ty:ty { $($variant:ident => $label:literal,)+ }) => {
		impl $ty {
			/// Returns a stable label suitable for span or metric fields.
			pub const fn as_str(self) -> &'static str {
				match self {
					$(Self::$variant => $label,)+
				}
			}
		}
		impl Display for $ty {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(self.as_str())
			}
		}
	};
}
stable_label!(CallKind {
	Rest => "rest",
	Repair => "repair",
	GraphQl => "graphql",
	Pagination => "pagination",
});
stable_label!(CallStage {
	Attempt => "attempt",
	Success => "success",
	Failure => "failure",
});

/// Counts a call stage on the global metrics recorder.
pub fn record_call_stage(kind: CallKind, stage: CallStage) {
	#[cfg(feature = "metrics")]
	metrics::counter!("bru_api_call_total", "call" => kind.as_str(), "stage" => stage.as_str())
		.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, stage);
}

/// Emits an event for a classified HTTP status.
pub fn note_status(kind: CallKind, status: u16) {
	#[cfg(feature = "tracing")]
	tracing::info!(call = kind.as_str(), status, "API call classified.");
	#[cfg(not(feature = "tracing"))]
	let _ = (kind, status);
}

/// Emits an event for a failed response-signature check.
pub fn note_auth_mismatch(kind: CallKind) {
	#[cfg(feature = "tracing")]
	tracing::error!(call = kind.as_str(), "Response signature did not match the payload.");
	#[cfg(not(feature = "tracing"))]
	let _ = kind;
}

/// Future type produced by [`CallSpan::instrument`]; the plain future when tracing is off.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Future type produced by [`CallSpan::instrument`]; the plain future when tracing is off.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Per-call span handle created at the client's entry points.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a span tagged with the call kind and the entry-point name.
	pub fn new(kind: CallKind, entry: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		return Self { span: tracing::info_span!("bru_api.call", call = kind.as_str(), entry) };

		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, entry);

			Self {}
		}
	}

	/// Attaches the span to a future; no guard is held across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			return fut.instrument(self.span.clone());
		}

		#[cfg(not(feature = "tracing"))]
		fut
	}
}
