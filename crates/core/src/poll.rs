//! Deadline-bounded polling for generation completion.
//!
//! The remote site offers no push channel; the only available signal is a
//! point-in-time snapshot of the visible interactive elements, classified
//! by [`classify`](crate::classify) on every pass.

use std::time::Duration;

use tracing::debug;

use crate::classify::{self, Signal};
use crate::driver::PageDriver;
use crate::error::Result;
use crate::retry::RetryPolicy;

/// Structural probe used when no marker is visible at all: literal code
/// content in the document counts as a positive completion signal.
const CODE_PROBE_JS: &str = "(() => { const el = document.querySelector('pre code, [data-filename], .monaco-editor'); return !!el && (el.innerText || '').trim().length > 0; })()";

/// Poller tuning.
///
/// The defaults reflect how long the remote site takes to produce a full
/// set of files; both values are deployment-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
	/// Total time to wait before giving up.
	pub deadline: Duration,
	/// Sleep between observation passes.
	pub interval: Duration,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			deadline: Duration::from_secs(180),
			interval: Duration::from_secs(3),
		}
	}
}

/// Terminal outcome of one polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
	Completed,
	Failed(String),
	TimedOut,
}

/// Polls observable page state until the generation completes, fails, or
/// the deadline elapses.
pub struct GenerationPoller {
	config: PollConfig,
}

impl GenerationPoller {
	pub fn new(config: PollConfig) -> Self {
		Self { config }
	}

	/// Waits for a terminal signal, within the configured deadline.
	///
	/// Driver faults while observing propagate immediately; a failed code
	/// probe does not (it is a best-effort secondary signal).
	pub async fn await_completion(&self, driver: &dyn PageDriver) -> Result<PollOutcome> {
		let policy = RetryPolicy::new(self.attempt_budget(), self.config.interval);
		let poll = policy.run(|attempt| async move {
			let actions = driver.observe_actions().await?;
			match classify::classify(&actions) {
				Signal::Failed => {
					let reason = classify::first_error_label(&actions)
						.unwrap_or("remote site reported a failure")
						.to_string();
					Ok(Some(PollOutcome::Failed(reason)))
				}
				Signal::Completed => Ok(Some(PollOutcome::Completed)),
				Signal::InProgress => {
					debug!(target = "genbridge.poll", attempt, "still generating");
					Ok(None)
				}
				Signal::Indeterminate => {
					if probe_for_code(driver).await? {
						debug!(target = "genbridge.poll", attempt, "no marker, but code is present");
						Ok(Some(PollOutcome::Completed))
					} else {
						Ok(None)
					}
				}
			}
		});

		match tokio::time::timeout(self.config.deadline, poll).await {
			Ok(Ok(Some(outcome))) => Ok(outcome),
			Ok(Ok(None)) | Err(_) => Ok(PollOutcome::TimedOut),
			Ok(Err(err)) => Err(err),
		}
	}

	/// Enough attempts to outlast the deadline; the timeout is what
	/// actually ends the run.
	fn attempt_budget(&self) -> u32 {
		let interval_ms = self.config.interval.as_millis().max(1);
		let deadline_ms = self.config.deadline.as_millis();
		(deadline_ms / interval_ms + 2).min(u32::MAX as u128) as u32
	}
}

async fn probe_for_code(driver: &dyn PageDriver) -> Result<bool> {
	match driver.eval(CODE_PROBE_JS).await {
		Ok(value) => Ok(value.as_bool().unwrap_or(false)),
		Err(err) => {
			debug!(target = "genbridge.poll", error = %err, "code probe failed; continuing to wait");
			Ok(false)
		}
	}
}
