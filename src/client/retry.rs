//! The retry controller: the outer state machine wrapping single pipeline attempts.
//!
//! Exactly one rotation is allowed per logical call: a 401 triggers a token repair and one
//! replay, a second 401 surfaces as [`AuthError::TokenRejected`]. A 503 either surfaces
//! immediately (`sleepy = false`) or enters a wait-and-poll loop bounded by a wall-clock
//! deadline measured from the first 503. Cancellation aborts between attempts and interrupts
//! the sleep itself.

// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	client::{
		Client,
		pipeline::{AttemptSpec, CallOutcome},
	},
	error::AuthError,
	http::Transport,
	sign::Payload,
};

/// Timing knobs for the 503 wait-and-poll loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Sleep between polls once the server reports 503.
	pub poll_interval: Duration,
	/// Wall-clock budget for one logical call's polling, measured from the first 503.
	pub deadline: Duration,
}
impl RetryPolicy {
	/// Hard ceiling on the polling deadline; hosts with tighter budgets configure less.
	pub const MAX_DEADLINE: Duration = Duration::from_secs(300);

	/// Returns the configured deadline clamped to [`RetryPolicy::MAX_DEADLINE`].
	pub fn effective_deadline(&self) -> Duration {
		self.deadline.min(Self::MAX_DEADLINE)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { poll_interval: Duration::from_secs(30), deadline: Self::MAX_DEADLINE }
	}
}

impl<T> Client<T>
where
	T: Transport,
{
	/// Runs one logical call through the retry state machine.
	///
	/// The per-instance call guard serializes logical calls; the controller itself is not
	/// re-entrant.
	pub(crate) async fn execute(&self, spec: AttemptSpec<'_>) -> Result<Payload> {
		let _serial = self.call_guard.lock().await;

		self.ensure_token().await?;

		let mut rotated = false;
		let mut first_rate_limit: Option<Instant> = None;

		loop {
			if self.cancellation.is_cancelled() {
				return Err(Error::Cancelled);
			}

			match self.attempt(&spec).await? {
				CallOutcome::Ok(payload) => return Ok(payload),
				CallOutcome::AuthMismatch => return Err(Error::AuthMismatch),
				CallOutcome::TokenExpired => {
					if rotated {
						return Err(AuthError::TokenRejected.into());
					}

					self.rotate().await?;

					rotated = true;
				},
				CallOutcome::RateLimited => {
					if !self.sleepy {
						return Err(Error::RateLimited);
					}

					let started = *first_rate_limit.get_or_insert_with(Instant::now);

					if started.elapsed() >= self.retry_policy.effective_deadline() {
						return Err(Error::DeadlineExceeded);
					}

					tokio::select! {
						_ = self.cancellation.cancelled() => return Err(Error::Cancelled),
						_ = tokio::time::sleep(self.retry_policy.poll_interval) => {},
					}
				},
				CallOutcome::HttpError(status) => return Err(Error::Http { status }),
			}
		}
	}
}
