//! Abstract page-driver capability for browser automation backends.

pub mod cdp;
pub mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::CookieRecord;

/// A currently interactable element on the remote page.
///
/// Produced fresh on each observation pass and never persisted. The label
/// is the only signal used for state classification; the locator, when
/// present, targets the element for a follow-up action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservableAction {
	pub label: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locator: Option<String>,
}

impl ObservableAction {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			locator: None,
		}
	}

	pub fn with_locator(label: impl Into<String>, locator: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			locator: Some(locator.into()),
		}
	}
}

/// Capability interface every automation backend implements.
///
/// Every operation suspends from the caller's perspective. Faults surface
/// as [`Error::Driver`](crate::error::Error::Driver) unless a more
/// specific classification applies at the call site.
#[async_trait]
pub trait PageDriver: Send + Sync {
	/// Navigates the page to `url` and waits for it to settle.
	async fn navigate(&self, url: &str) -> Result<()>;

	/// Snapshots the currently visible interactive elements.
	async fn observe_actions(&self) -> Result<Vec<ObservableAction>>;

	/// Activates the interactive element described by `action`.
	async fn perform(&self, action: &ObservableAction) -> Result<()>;

	/// Replaces the contents of the element at `locator` with `text`.
	async fn fill(&self, locator: &str, text: &str) -> Result<()>;

	/// Sends a keyboard key (e.g. `"Enter"`) to the focused element.
	async fn press(&self, key: &str) -> Result<()>;

	/// Reads the current system clipboard text.
	async fn read_clipboard(&self) -> Result<String>;

	/// Evaluates a structural query in the page, returning its JSON value.
	async fn eval(&self, expression: &str) -> Result<serde_json::Value>;

	/// Captures a PNG screenshot of the current viewport.
	async fn screenshot(&self) -> Result<Vec<u8>>;

	/// Current browser cookies.
	async fn cookies(&self) -> Result<Vec<CookieRecord>>;

	/// Seeds the browser with previously persisted cookies.
	async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<()>;

	/// Releases the underlying browser resources.
	///
	/// Called exactly once per request, on success and failure paths alike.
	async fn close(&self) -> Result<()>;
}

/// Acquires an exclusively owned driver for one in-flight request.
///
/// There is no pooling: concurrent requests each acquire an independent
/// driver, which multiplies remote browser sessions under load.
#[async_trait]
pub trait DriverProvider: Send + Sync {
	async fn acquire(&self) -> Result<Box<dyn PageDriver>>;
}
