//! Cookie persistence for skip-login across runs.
//!
//! The session file is the only durable state the service keeps: a JSON
//! list of cookie records captured after an authenticated interaction and
//! replayed into the browser on the next request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// One persisted browser cookie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
	pub name: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	/// Unix expiry in seconds; absent for session cookies.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub same_site: Option<String>,
}

impl CookieRecord {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: None,
			path: None,
			expires: None,
			http_only: false,
			secure: false,
			same_site: None,
		}
	}
}

/// The full cookie jar captured after an authenticated interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
	#[serde(default)]
	pub cookies: Vec<CookieRecord>,
}

impl SessionState {
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty()
	}
}

/// File-backed store for [`SessionState`].
#[derive(Debug, Clone)]
pub struct SessionStore {
	path: PathBuf,
}

impl SessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Loads the persisted session.
	///
	/// A missing, unreadable, or corrupt file means "no prior session",
	/// never an error.
	pub fn load(&self) -> Option<SessionState> {
		let raw = match std::fs::read_to_string(&self.path) {
			Ok(raw) => raw,
			Err(err) => {
				debug!(
					target = "genbridge.session",
					path = %self.path.display(),
					error = %err,
					"no session to restore"
				);
				return None;
			}
		};
		match serde_json::from_str(&raw) {
			Ok(state) => Some(state),
			Err(err) => {
				warn!(
					target = "genbridge.session",
					path = %self.path.display(),
					error = %err,
					"discarding corrupt session file"
				);
				None
			}
		}
	}

	/// Persists `state`, replacing any previous session.
	///
	/// Writes a sibling temp file and renames it over the target so a
	/// concurrent reader never observes a partial write.
	pub fn save(&self, state: &SessionState) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		let tmp = self.path.with_extension("tmp");
		let json = serde_json::to_string_pretty(state)?;
		std::fs::write(&tmp, json)?;
		std::fs::rename(&tmp, &self.path)?;
		Ok(())
	}
}
