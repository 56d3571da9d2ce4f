//! Optional observability helpers for discovery, key set, and factory stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oidc_preset.stage` with the `stage` and
//!   `step` (call site) fields.
//! - Enable `metrics` to increment the `oidc_preset_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Network-facing stages observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Well-known discovery document fetch.
	Discovery,
	/// JWKS fetch and parse.
	KeySet,
	/// Whole provider construction.
	Create,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Discovery => "discovery",
			Stage::KeySet => "key_set",
			Stage::Create => "create",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto its terminal outcome.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		match result {
			Ok(_) => StageOutcome::Success,
			Err(_) => StageOutcome::Failure,
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside the span for `stage`, counting the attempt and its terminal outcome.
pub async fn observe<F, T, E>(stage: Stage, step: &'static str, fut: F) -> Result<T, E>
where
	F: Future<Output = Result<T, E>>,
{
	let span = StageSpan::new(stage, step);

	record_stage_outcome(stage, StageOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_stage_outcome(stage, StageOutcome::of(&result));

	result
}
