//! Federated-login authentication flow.

use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::classify;
use crate::config::CredentialPair;
use crate::driver::PageDriver;
use crate::error::{Error, Result};

/// Locator for the identity field on the provider's credential form.
const IDENTITY_FIELD: &str = "input[type='email'], input[name='identifier']";

/// Locator for the secret field on the provider's credential form.
const SECRET_FIELD: &str = "input[type='password']";

/// Label fragment of the federated-provider affordance on the sign-in page.
const PROVIDER_MARKER: &str = "continue with";

/// Progression of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
	Unknown,
	CheckingLoginRequired,
	NotRequired,
	LoggingIn,
	Authenticated,
	LoginFailed,
}

/// Outcome reported to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
	/// No login affordance was visible; credentials were never touched.
	NotRequired,
	/// Login completed and post-submit verification passed.
	Authenticated,
}

/// Drives a login when the page demands one.
///
/// There is no automatic retry: a failed login with possibly-wrong
/// credentials is surfaced, not repeated, to avoid provider lockouts.
pub struct AuthFlow<'a> {
	credentials: Option<&'a CredentialPair>,
	state: AuthState,
}

impl<'a> AuthFlow<'a> {
	pub fn new(credentials: Option<&'a CredentialPair>) -> Self {
		Self {
			credentials,
			state: AuthState::Unknown,
		}
	}

	/// Current state, for logging and tests.
	pub fn state(&self) -> AuthState {
		self.state
	}

	/// Checks whether the page demands a login and drives one if so.
	///
	/// On a `LoginFailed` exit the session cookies must not be persisted;
	/// the orchestrator relies on the returned error for that.
	pub async fn ensure_authenticated(&mut self, driver: &dyn PageDriver) -> Result<AuthOutcome> {
		self.state = AuthState::CheckingLoginRequired;
		let actions = driver.observe_actions().await?;
		if !classify::requires_login(&actions) {
			self.state = AuthState::NotRequired;
			debug!(target = "genbridge.auth", "no login affordance visible; skipping");
			return Ok(AuthOutcome::NotRequired);
		}

		self.state = AuthState::LoggingIn;
		let Some(credentials) = self.credentials else {
			self.state = AuthState::LoginFailed;
			return Err(Error::Auth("no credentials configured".into()));
		};

		info!(target = "genbridge.auth", "login required; driving federated sign-in");

		if let Some(sign_in) = classify::find_login_action(&actions) {
			driver.perform(sign_in).await?;
		}

		let provider_actions = driver.observe_actions().await?;
		if let Some(provider) = classify::find_labeled(&provider_actions, PROVIDER_MARKER) {
			driver.perform(provider).await?;
		}

		driver.fill(IDENTITY_FIELD, &credentials.identity).await?;
		driver.fill(SECRET_FIELD, credentials.secret.expose_secret()).await?;
		driver.press("Enter").await?;

		// The provider redirects back; the login affordance must be gone.
		let after = driver.observe_actions().await?;
		if classify::requires_login(&after) {
			self.state = AuthState::LoginFailed;
			return Err(Error::Auth("post-login verification failed".into()));
		}

		self.state = AuthState::Authenticated;
		info!(target = "genbridge.auth", "authenticated");
		Ok(AuthOutcome::Authenticated)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::driver::ObservableAction;
	use crate::driver::fake::FakeDriverBuilder;

	fn credentials() -> CredentialPair {
		CredentialPair {
			identity: "dev@example.test".into(),
			secret: "hunter2".to_string().into(),
		}
	}

	#[tokio::test]
	async fn skipped_entirely_when_no_login_marker_is_visible() {
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("New Chat")])
			.build();
		let pair = credentials();
		let mut flow = AuthFlow::new(Some(&pair));

		let outcome = flow.ensure_authenticated(&driver).await.unwrap();

		assert_eq!(outcome, AuthOutcome::NotRequired);
		assert_eq!(flow.state(), AuthState::NotRequired);
		// No credential field was ever touched.
		assert!(controller.fills().is_empty());
		assert!(controller.performed().is_empty());
	}

	#[tokio::test]
	async fn missing_credentials_fail_before_any_interaction() {
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("Sign in")])
			.build();
		let mut flow = AuthFlow::new(None);

		let err = flow.ensure_authenticated(&driver).await.unwrap_err();

		assert!(matches!(err, Error::Auth(ref reason) if reason == "no credentials configured"));
		assert_eq!(flow.state(), AuthState::LoginFailed);
		assert!(controller.performed().is_empty());
	}

	#[tokio::test]
	async fn full_login_sequence_fills_both_fields_and_submits() {
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::with_locator("Sign in", "[data-gb=\"0\"]")])
			.frame(vec![ObservableAction::with_locator("Continue with GitHub", "[data-gb=\"1\"]")])
			.frame(vec![ObservableAction::new("New Chat")])
			.build();
		let pair = credentials();
		let mut flow = AuthFlow::new(Some(&pair));

		let outcome = flow.ensure_authenticated(&driver).await.unwrap();

		assert_eq!(outcome, AuthOutcome::Authenticated);
		assert_eq!(controller.performed(), vec!["Sign in", "Continue with GitHub"]);
		assert_eq!(
			controller.fills(),
			vec![
				(IDENTITY_FIELD.to_string(), "dev@example.test".to_string()),
				(SECRET_FIELD.to_string(), "hunter2".to_string()),
			]
		);
		assert_eq!(controller.presses(), vec!["Enter"]);
	}

	#[tokio::test]
	async fn persistent_login_marker_after_submit_is_a_failure() {
		let (driver, _) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("Sign in")])
			.frame(vec![ObservableAction::new("Continue with GitHub")])
			.frame(vec![ObservableAction::new("Sign in")])
			.build();
		let pair = credentials();
		let mut flow = AuthFlow::new(Some(&pair));

		let err = flow.ensure_authenticated(&driver).await.unwrap_err();

		assert!(matches!(err, Error::Auth(ref reason) if reason == "post-login verification failed"));
		assert_eq!(flow.state(), AuthState::LoginFailed);
	}
}
