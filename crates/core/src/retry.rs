//! Bounded retry policy shared by the poller and the extractor.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Fixed-interval bounded retry.
///
/// One definition for every racy interaction with the remote page: the
/// operation is attempted up to `max_attempts` times with `delay` between
/// attempts. An attempt yields `Ok(Some(value))` to finish, `Ok(None)` to
/// try again, or `Err`; errors also consume attempts, and only the last
/// one is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			delay: Duration::from_secs(2),
		}
	}
}

impl RetryPolicy {
	pub fn new(max_attempts: u32, delay: Duration) -> Self {
		Self { max_attempts, delay }
	}

	/// Runs `op` until it yields a value or the attempts are exhausted.
	///
	/// Returns `Ok(None)` when every attempt came back empty.
	pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<Option<T>>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<Option<T>>>,
	{
		let mut last_err = None;
		for attempt in 1..=self.max_attempts {
			match op(attempt).await {
				Ok(Some(value)) => return Ok(Some(value)),
				Ok(None) => {}
				Err(err) => {
					debug!(target = "genbridge.retry", attempt, error = %err, "attempt failed");
					last_err = Some(err);
				}
			}
			if attempt < self.max_attempts {
				tokio::time::sleep(self.delay).await;
			}
		}
		match last_err {
			Some(err) => Err(err),
			None => Ok(None),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;
	use crate::error::Error;

	fn policy() -> RetryPolicy {
		RetryPolicy::new(5, Duration::from_millis(1))
	}

	#[tokio::test]
	async fn succeeds_on_a_later_attempt() {
		let calls = AtomicU32::new(0);
		let result = policy()
			.run(|attempt| {
				calls.fetch_add(1, Ordering::SeqCst);
				async move { Ok((attempt == 3).then_some("ready")) }
			})
			.await
			.unwrap();
		assert_eq!(result, Some("ready"));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn exhaustion_yields_none_after_max_attempts() {
		let calls = AtomicU32::new(0);
		let result: Option<()> = policy()
			.run(|_| {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Ok(None) }
			})
			.await
			.unwrap();
		assert_eq!(result, None);
		assert_eq!(calls.load(Ordering::SeqCst), 5);
	}

	#[tokio::test]
	async fn last_error_surfaces_after_exhaustion() {
		let result: crate::error::Result<Option<()>> = policy()
			.run(|attempt| async move { Err(Error::Driver(format!("fault {attempt}"))) })
			.await;
		match result {
			Err(Error::Driver(message)) => assert_eq!(message, "fault 5"),
			other => panic!("expected driver error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn an_error_does_not_mask_a_later_success() {
		let result = policy()
			.run(|attempt| async move {
				if attempt < 2 {
					Err(Error::Driver("transient".into()))
				} else {
					Ok(Some(attempt))
				}
			})
			.await
			.unwrap();
		assert_eq!(result, Some(2));
	}
}
