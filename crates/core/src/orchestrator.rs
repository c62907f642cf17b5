//! Per-request orchestration from prompt to generated files.

use tracing::{debug, info, warn};

use crate::auth::{AuthFlow, AuthOutcome};
use crate::config::Config;
use crate::driver::{DriverProvider, PageDriver};
use crate::error::{Error, Result};
use crate::extract::{ExtractStrategy, GenerationResult};
use crate::poll::{GenerationPoller, PollOutcome};
use crate::session::{SessionState, SessionStore};

/// Locator of the prompt input on the generation page.
const PROMPT_FIELD: &str = "textarea";

/// Sequences one prompt submission end to end.
///
/// Everything runs strictly sequentially against one exclusively owned
/// driver: restore session → authenticate → submit → poll → extract →
/// persist session.
pub struct Orchestrator {
	config: Config,
	store: SessionStore,
	strategy: Box<dyn ExtractStrategy>,
}

impl Orchestrator {
	pub fn new(config: Config, strategy: Box<dyn ExtractStrategy>) -> Self {
		let store = SessionStore::new(config.session_file.clone());
		Self { config, store, strategy }
	}

	/// Acquires a driver, runs the sequence, and releases the driver on
	/// every exit path, success and failure alike.
	pub async fn execute(&self, provider: &dyn DriverProvider, prompt: &str) -> Result<GenerationResult> {
		let driver = provider.acquire().await?;
		let result = self.handle_prompt(driver.as_ref(), prompt).await;
		if let Err(err) = driver.close().await {
			warn!(target = "genbridge", error = %err, "driver release failed");
		}
		result
	}

	/// Runs the full sequence against an already-acquired driver.
	pub async fn handle_prompt(&self, driver: &dyn PageDriver, prompt: &str) -> Result<GenerationResult> {
		info!(target = "genbridge", url = %self.config.target_url, "starting generation request");
		driver.navigate(self.config.target_url.as_str()).await?;

		self.restore_session(driver).await?;

		let mut auth = AuthFlow::new(self.config.identity.as_ref());
		if auth.ensure_authenticated(driver).await? == AuthOutcome::Authenticated {
			// A fresh login is worth keeping even if the request fails
			// later; an aborted login never reaches this point.
			self.persist_session(driver).await;
		}

		self.submit_prompt(driver, prompt).await?;

		let poller = GenerationPoller::new(self.config.poll);
		match poller.await_completion(driver).await? {
			PollOutcome::Completed => {}
			PollOutcome::Failed(reason) => return Err(Error::GenerationFailed(reason)),
			PollOutcome::TimedOut => {
				return Err(Error::GenerationTimeout {
					secs: self.config.poll.deadline.as_secs(),
				});
			}
		}

		let result = self.strategy.extract(driver).await?;

		// Happens-after a successful extraction, never before.
		self.persist_session(driver).await;

		info!(target = "genbridge", files = result.len(), "generation request complete");
		Ok(result)
	}

	async fn restore_session(&self, driver: &dyn PageDriver) -> Result<()> {
		let Some(state) = self.store.load() else {
			return Ok(());
		};
		if state.is_empty() {
			return Ok(());
		}
		debug!(target = "genbridge", cookies = state.cookies.len(), "restoring saved session");
		driver.set_cookies(&state.cookies).await?;
		// Cookies only apply on the next document load.
		driver.navigate(self.config.target_url.as_str()).await
	}

	async fn submit_prompt(&self, driver: &dyn PageDriver, prompt: &str) -> Result<()> {
		debug!(target = "genbridge", chars = prompt.len(), "submitting prompt");
		driver.fill(PROMPT_FIELD, prompt).await?;
		driver.press("Enter").await
	}

	/// Best effort: a session that cannot be saved must not fail the
	/// request that produced it.
	async fn persist_session(&self, driver: &dyn PageDriver) {
		let cookies = match driver.cookies().await {
			Ok(cookies) => cookies,
			Err(err) => {
				warn!(target = "genbridge", error = %err, "could not read cookies for persistence");
				return;
			}
		};
		let state = SessionState { cookies };
		if let Err(err) = self.store.save(&state) {
			warn!(
				target = "genbridge",
				path = %self.store.path().display(),
				error = %err,
				"failed to save session"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;
	use std::time::Duration;

	use super::*;
	use crate::config::AutomationConfig;
	use crate::driver::fake::{FailAt, FakeDriver, FakeDriverBuilder, FakeDriverController, FakeProvider};
	use crate::driver::ObservableAction;
	use crate::extract::ClipboardExtract;
	use crate::poll::PollConfig;
	use crate::retry::RetryPolicy;
	use crate::session::CookieRecord;

	fn test_config(session_file: PathBuf) -> Config {
		Config {
			target_url: url::Url::parse("https://ui.example.test").unwrap(),
			identity: Some(crate::config::CredentialPair {
				identity: "dev@example.test".into(),
				secret: "hunter2".to_string().into(),
			}),
			automation: AutomationConfig {
				api_key: "key".to_string().into(),
				project_id: "project".into(),
				ws_url: "wss://automation.example.test".into(),
			},
			session_file,
			poll: PollConfig {
				deadline: Duration::from_secs(10),
				interval: Duration::from_millis(1),
			},
			retry: RetryPolicy::new(5, Duration::from_millis(1)),
		}
	}

	fn orchestrator(session_file: PathBuf) -> Orchestrator {
		let config = test_config(session_file);
		let retry = config.retry;
		Orchestrator::new(config, Box::new(ClipboardExtract::new(retry)))
	}

	fn completed_frame() -> Vec<ObservableAction> {
		vec![
			ObservableAction::with_locator("login.tsx", "[data-gb=\"0\"]"),
			ObservableAction::with_locator("Copy code", "[data-gb=\"1\"]"),
		]
	}

	fn happy_driver() -> (FakeDriver, FakeDriverController) {
		FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("New Chat")])
			.frame(completed_frame())
			.clipboard("export default function Login() {...}")
			.cookies(vec![CookieRecord::new("__session", "abc123")])
			.build()
	}

	#[tokio::test]
	async fn happy_path_returns_files_and_persists_the_session_afterwards() {
		let dir = tempfile::tempdir().unwrap();
		let session_file = dir.path().join("session.json");
		let orchestrator = orchestrator(session_file.clone());
		let (driver, controller) = happy_driver();
		let provider = FakeProvider::single(driver);

		let result = orchestrator.execute(&provider, "Create a login form").await.unwrap();

		let files: Vec<_> = result.iter().collect();
		assert_eq!(files, vec![("login.tsx", "export default function Login() {...}")]);
		assert_eq!(controller.fills(), vec![("textarea".to_string(), "Create a login form".to_string())]);
		assert_eq!(controller.presses(), vec!["Enter"]);
		assert_eq!(controller.close_calls(), 1);

		let saved = SessionStore::new(session_file).load().unwrap();
		assert_eq!(saved.cookies, vec![CookieRecord::new("__session", "abc123")]);
	}

	#[tokio::test]
	async fn saved_session_is_replayed_before_authentication() {
		let dir = tempfile::tempdir().unwrap();
		let session_file = dir.path().join("session.json");
		SessionStore::new(session_file.clone())
			.save(&SessionState {
				cookies: vec![CookieRecord::new("__session", "prior")],
			})
			.unwrap();

		let orchestrator = orchestrator(session_file);
		let (driver, controller) = happy_driver();
		let provider = FakeProvider::single(driver);

		orchestrator.execute(&provider, "prompt").await.unwrap();

		assert_eq!(controller.set_cookie_calls(), 1);
		// Initial load plus the reload that applies the cookies.
		assert_eq!(controller.navigations().len(), 2);
	}

	#[tokio::test]
	async fn auth_failure_releases_the_driver_and_persists_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let session_file = dir.path().join("session.json");
		let config = Config {
			identity: None,
			..test_config(session_file.clone())
		};
		let retry = config.retry;
		let orchestrator = Orchestrator::new(config, Box::new(ClipboardExtract::new(retry)));

		let (driver, controller) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("Sign in")])
			.build();
		let provider = FakeProvider::single(driver);

		let err = orchestrator.execute(&provider, "prompt").await.unwrap_err();

		assert!(matches!(err, Error::Auth(_)), "got {err:?}");
		assert_eq!(controller.close_calls(), 1);
		assert!(!session_file.exists(), "cookies persisted for an unauthenticated session");
	}

	#[tokio::test]
	async fn submission_failure_releases_the_driver_exactly_once() {
		let dir = tempfile::tempdir().unwrap();
		let orchestrator = orchestrator(dir.path().join("session.json"));
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("New Chat")])
			.fail_at(FailAt::Fill)
			.build();
		let provider = FakeProvider::single(driver);

		let err = orchestrator.execute(&provider, "prompt").await.unwrap_err();

		assert!(matches!(err, Error::Driver(_)), "got {err:?}");
		assert_eq!(controller.close_calls(), 1);
	}

	#[tokio::test]
	async fn polling_failure_releases_the_driver_exactly_once() {
		let dir = tempfile::tempdir().unwrap();
		let orchestrator = orchestrator(dir.path().join("session.json"));
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("New Chat")])
			.frame(vec![ObservableAction::new("Something went wrong")])
			.build();
		let provider = FakeProvider::single(driver);

		let err = orchestrator.execute(&provider, "prompt").await.unwrap_err();

		assert!(matches!(err, Error::GenerationFailed(_)), "got {err:?}");
		assert_eq!(controller.close_calls(), 1);
	}

	#[tokio::test]
	async fn extraction_failure_releases_the_driver_exactly_once() {
		let dir = tempfile::tempdir().unwrap();
		let session_file = dir.path().join("session.json");
		let orchestrator = orchestrator(session_file.clone());
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("New Chat")])
			.frame(completed_frame())
			.clipboard("")
			.build();
		let provider = FakeProvider::single(driver);

		let err = orchestrator.execute(&provider, "prompt").await.unwrap_err();

		assert!(matches!(err, Error::Extraction(_)), "got {err:?}");
		assert_eq!(controller.close_calls(), 1);
		// Persistence happens-after successful extraction only.
		assert!(!session_file.exists());
	}
}
