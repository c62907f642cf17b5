//! Scripted page driver for unit and end-to-end tests.
//!
//! Mirrors the real driver's surface without a browser. Observation
//! frames, clipboard reads, and eval results are scripted up front through
//! the builder; every interaction is recorded and can be inspected through
//! the controller returned alongside the driver.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{DriverProvider, ObservableAction, PageDriver};
use crate::error::{Error, Result};
use crate::session::CookieRecord;

/// Operation at which the fake should fail, for error-path tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
	Navigate,
	Observe,
	Fill,
	Clipboard,
}

#[derive(Default)]
struct FakeState {
	frames: VecDeque<Vec<ObservableAction>>,
	clipboard: VecDeque<String>,
	eval_results: VecDeque<serde_json::Value>,
	cookies: Vec<CookieRecord>,
	fail_at: Option<FailAt>,

	navigations: Vec<String>,
	performed: Vec<String>,
	fills: Vec<(String, String)>,
	presses: Vec<String>,
	observe_calls: u32,
	clipboard_reads: u32,
	set_cookie_calls: u32,
	close_calls: u32,
}

/// Builder for a scripted driver and its inspection controller.
pub struct FakeDriverBuilder {
	state: FakeState,
}

impl FakeDriverBuilder {
	pub fn new() -> Self {
		Self {
			state: FakeState::default(),
		}
	}

	/// Queues one observation frame; the last frame repeats once drained.
	pub fn frame(mut self, actions: Vec<ObservableAction>) -> Self {
		self.state.frames.push_back(actions);
		self
	}

	/// Queues one clipboard read result; the last value repeats once
	/// drained.
	pub fn clipboard(mut self, text: impl Into<String>) -> Self {
		self.state.clipboard.push_back(text.into());
		self
	}

	/// Queues one eval result; a drained queue yields JSON null.
	pub fn eval_result(mut self, value: serde_json::Value) -> Self {
		self.state.eval_results.push_back(value);
		self
	}

	/// Sets the cookies the fake browser reports.
	pub fn cookies(mut self, cookies: Vec<CookieRecord>) -> Self {
		self.state.cookies = cookies;
		self
	}

	/// Makes the given operation fail on every call.
	pub fn fail_at(mut self, step: FailAt) -> Self {
		self.state.fail_at = Some(step);
		self
	}

	pub fn build(self) -> (FakeDriver, FakeDriverController) {
		let state = Arc::new(Mutex::new(self.state));
		(
			FakeDriver {
				state: Arc::clone(&state),
			},
			FakeDriverController { state },
		)
	}
}

impl Default for FakeDriverBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Scripted [`PageDriver`] implementation.
pub struct FakeDriver {
	state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
	fn state(&self) -> MutexGuard<'_, FakeState> {
		self.state.lock().unwrap()
	}

	fn check_failure(&self, step: FailAt) -> Result<()> {
		if self.state().fail_at == Some(step) {
			return Err(Error::Driver(format!("injected {step:?} failure")));
		}
		Ok(())
	}
}

/// Inspection handle over the shared scripted state.
pub struct FakeDriverController {
	state: Arc<Mutex<FakeState>>,
}

impl FakeDriverController {
	fn state(&self) -> MutexGuard<'_, FakeState> {
		self.state.lock().unwrap()
	}

	pub fn navigations(&self) -> Vec<String> {
		self.state().navigations.clone()
	}

	pub fn performed(&self) -> Vec<String> {
		self.state().performed.clone()
	}

	pub fn fills(&self) -> Vec<(String, String)> {
		self.state().fills.clone()
	}

	pub fn presses(&self) -> Vec<String> {
		self.state().presses.clone()
	}

	pub fn observe_calls(&self) -> u32 {
		self.state().observe_calls
	}

	pub fn clipboard_reads(&self) -> u32 {
		self.state().clipboard_reads
	}

	pub fn set_cookie_calls(&self) -> u32 {
		self.state().set_cookie_calls
	}

	pub fn close_calls(&self) -> u32 {
		self.state().close_calls
	}
}

#[async_trait]
impl PageDriver for FakeDriver {
	async fn navigate(&self, url: &str) -> Result<()> {
		self.check_failure(FailAt::Navigate)?;
		self.state().navigations.push(url.to_string());
		Ok(())
	}

	async fn observe_actions(&self) -> Result<Vec<ObservableAction>> {
		self.check_failure(FailAt::Observe)?;
		let mut state = self.state();
		state.observe_calls += 1;
		let frame = if state.frames.len() > 1 {
			state.frames.pop_front().unwrap_or_default()
		} else {
			state.frames.front().cloned().unwrap_or_default()
		};
		Ok(frame)
	}

	async fn perform(&self, action: &ObservableAction) -> Result<()> {
		self.state().performed.push(action.label.clone());
		Ok(())
	}

	async fn fill(&self, locator: &str, text: &str) -> Result<()> {
		self.check_failure(FailAt::Fill)?;
		self.state().fills.push((locator.to_string(), text.to_string()));
		Ok(())
	}

	async fn press(&self, key: &str) -> Result<()> {
		self.state().presses.push(key.to_string());
		Ok(())
	}

	async fn read_clipboard(&self) -> Result<String> {
		self.check_failure(FailAt::Clipboard)?;
		let mut state = self.state();
		state.clipboard_reads += 1;
		let text = if state.clipboard.len() > 1 {
			state.clipboard.pop_front().unwrap_or_default()
		} else {
			state.clipboard.front().cloned().unwrap_or_default()
		};
		Ok(text)
	}

	async fn eval(&self, _expression: &str) -> Result<serde_json::Value> {
		let value = self
			.state()
			.eval_results
			.pop_front()
			.unwrap_or(serde_json::Value::Null);
		Ok(value)
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		Ok(Vec::new())
	}

	async fn cookies(&self) -> Result<Vec<CookieRecord>> {
		Ok(self.state().cookies.clone())
	}

	async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<()> {
		let mut state = self.state();
		state.set_cookie_calls += 1;
		state.cookies = cookies.to_vec();
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		self.state().close_calls += 1;
		Ok(())
	}
}

/// Hands out pre-built fakes, one per acquisition.
pub struct FakeProvider {
	drivers: Mutex<VecDeque<FakeDriver>>,
}

impl FakeProvider {
	pub fn new(drivers: Vec<FakeDriver>) -> Self {
		Self {
			drivers: Mutex::new(drivers.into()),
		}
	}

	pub fn single(driver: FakeDriver) -> Self {
		Self::new(vec![driver])
	}
}

#[async_trait]
impl DriverProvider for FakeProvider {
	async fn acquire(&self) -> Result<Box<dyn PageDriver>> {
		let driver = self
			.drivers
			.lock()
			.unwrap()
			.pop_front()
			.ok_or_else(|| Error::Driver("no scripted driver available".into()))?;
		Ok(Box::new(driver))
	}
}
