//! Process configuration resolved from the environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{Error, Result};
use crate::poll::PollConfig;
use crate::retry::RetryPolicy;

/// Default UI-generation site driven by the service.
pub const DEFAULT_TARGET_URL: &str = "https://v0.dev";

const DEFAULT_AUTOMATION_WS_URL: &str = "wss://connect.browserbase.com";

/// Identity-provider credentials for auto-login.
///
/// Held in process memory only, exposed once at the credential-form fill,
/// and never serialized or logged.
#[derive(Debug, Clone)]
pub struct CredentialPair {
	pub identity: String,
	pub secret: SecretString,
}

/// Connection secrets for the remote browser-automation backend.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
	pub api_key: SecretString,
	pub project_id: String,
	/// Endpoint base; the connect URL is built from this plus the secrets.
	pub ws_url: String,
}

impl AutomationConfig {
	/// Full CDP websocket URL for the backend connection.
	pub fn connect_url(&self) -> String {
		format!(
			"{}?apiKey={}&projectId={}",
			self.ws_url,
			self.api_key.expose_secret(),
			self.project_id
		)
	}
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct Config {
	pub target_url: Url,
	/// Absent pair disables auto-login; a pre-seeded session file is then
	/// the only way past a login wall.
	pub identity: Option<CredentialPair>,
	pub automation: AutomationConfig,
	pub session_file: PathBuf,
	pub poll: PollConfig,
	pub retry: RetryPolicy,
}

impl Config {
	/// Reads configuration from the environment.
	///
	/// `IDP_EMAIL`/`IDP_PASSWORD` are optional; `AUTOMATION_API_KEY` and
	/// `AUTOMATION_PROJECT_ID` are required.
	pub fn from_env() -> Result<Self> {
		let target_url = env_or("GENBRIDGE_TARGET_URL", DEFAULT_TARGET_URL);
		let target_url = Url::parse(&target_url)
			.map_err(|err| Error::Config(format!("invalid GENBRIDGE_TARGET_URL: {err}")))?;

		let identity = match (env_opt("IDP_EMAIL"), env_opt("IDP_PASSWORD")) {
			(Some(identity), Some(secret)) => Some(CredentialPair {
				identity,
				secret: secret.into(),
			}),
			_ => None,
		};

		let automation = AutomationConfig {
			api_key: required("AUTOMATION_API_KEY")?.into(),
			project_id: required("AUTOMATION_PROJECT_ID")?,
			ws_url: env_or("AUTOMATION_WS_URL", DEFAULT_AUTOMATION_WS_URL),
		};

		let session_file = env_opt("GENBRIDGE_SESSION_FILE")
			.map(PathBuf::from)
			.unwrap_or_else(default_session_file);

		let mut poll = PollConfig::default();
		if let Some(deadline) = env_secs("GENBRIDGE_POLL_DEADLINE_SECS")? {
			poll.deadline = deadline;
		}
		if let Some(interval) = env_secs("GENBRIDGE_POLL_INTERVAL_SECS")? {
			poll.interval = interval;
		}

		Ok(Self {
			target_url,
			identity,
			automation,
			session_file,
			poll,
			retry: RetryPolicy::default(),
		})
	}
}

fn default_session_file() -> PathBuf {
	std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
		.unwrap_or_else(|| PathBuf::from("."))
		.join("genbridge/session.json")
}

fn env_opt(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
	env_opt(name).unwrap_or_else(|| default.to_string())
}

fn required(name: &str) -> Result<String> {
	env_opt(name).ok_or_else(|| Error::Config(format!("{name} is not set")))
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
	let Some(raw) = env_opt(name) else {
		return Ok(None);
	};
	let secs: u64 = raw
		.parse()
		.map_err(|_| Error::Config(format!("{name} must be a whole number of seconds")))?;
	Ok(Some(Duration::from_secs(secs)))
}
