//! CDP-backed page driver over a remote automation provider.
//!
//! The CDP client is synchronous, so every operation runs on the blocking
//! pool with a cloned tab handle while the caller awaits.

use std::sync::Arc;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Tab};
use tracing::debug;

use super::{DriverProvider, ObservableAction, PageDriver};
use crate::config::AutomationConfig;
use crate::error::{Error, Result};
use crate::session::CookieRecord;

/// JS producing the currently visible interactive elements as JSON.
/// Non-destructive apart from stamping `data-gb` locator attributes.
const OBSERVE_JS: &str = r#"
(() => {
  let id = 0;
  const out = [];
  const visible = (el) => {
    if (el.offsetParent === null && el.tagName !== 'BODY') return false;
    const s = getComputedStyle(el);
    return s.display !== 'none' && s.visibility !== 'hidden' && s.opacity !== '0';
  };
  const sel = 'a, button, input, textarea, select, [role="button"], [role="tab"]';
  for (const el of document.querySelectorAll(sel)) {
    if (!visible(el)) continue;
    const label = (el.innerText || el.value || el.getAttribute('aria-label') || el.placeholder || '')
      .trim().slice(0, 120);
    if (!label) continue;
    el.setAttribute('data-gb', String(id));
    out.push({ label, locator: '[data-gb="' + (id++) + '"]' });
  }
  return JSON.stringify(out);
})()
"#;

/// One remote browser session, exclusively owned by one request.
pub struct CdpDriver {
	_browser: Browser,
	tab: Arc<Tab>,
}

impl CdpDriver {
	/// Connects to the automation backend and opens a fresh tab.
	pub async fn connect(automation: &AutomationConfig) -> Result<Self> {
		let url = automation.connect_url();
		debug!(target = "genbridge.driver", endpoint = %automation.ws_url, "connecting to automation backend");
		let (browser, tab) = tokio::task::spawn_blocking(move || -> Result<(Browser, Arc<Tab>)> {
			let browser = Browser::connect(url).map_err(Error::driver)?;
			let tab = browser.new_tab().map_err(Error::driver)?;
			Ok((browser, tab))
		})
		.await
		.map_err(|err| Error::Driver(format!("driver task panicked: {err}")))??;

		Ok(Self {
			_browser: browser,
			tab,
		})
	}

	/// Runs a blocking CDP call off the async runtime.
	async fn with_tab<T, F>(&self, op: F) -> Result<T>
	where
		T: Send + 'static,
		F: FnOnce(&Tab) -> Result<T> + Send + 'static,
	{
		let tab = Arc::clone(&self.tab);
		tokio::task::spawn_blocking(move || op(&tab))
			.await
			.map_err(|err| Error::Driver(format!("driver task panicked: {err}")))?
	}
}

#[async_trait]
impl PageDriver for CdpDriver {
	async fn navigate(&self, url: &str) -> Result<()> {
		let url = url.to_string();
		self.with_tab(move |tab| {
			tab.navigate_to(&url).map_err(Error::driver)?;
			tab.wait_until_navigated().map_err(Error::driver)?;
			Ok(())
		})
		.await
	}

	async fn observe_actions(&self) -> Result<Vec<ObservableAction>> {
		self.with_tab(|tab| {
			let result = tab.evaluate(OBSERVE_JS, false).map_err(Error::driver)?;
			let raw = result
				.value
				.and_then(|value| value.as_str().map(String::from))
				.unwrap_or_else(|| "[]".to_string());
			Ok(serde_json::from_str(&raw)?)
		})
		.await
	}

	async fn perform(&self, action: &ObservableAction) -> Result<()> {
		match &action.locator {
			Some(locator) => {
				let locator = locator.clone();
				self.with_tab(move |tab| {
					tab.find_element(&locator).map_err(Error::driver)?.click().map_err(Error::driver)?;
					Ok(())
				})
				.await
			}
			// No structural locator; click the first element matching the
			// label text instead.
			None => {
				let label = serde_json::to_string(action.label.trim())?;
				self.with_tab(move |tab| {
					let expr = format!(
						"(() => {{ const wanted = {label}; \
						 for (const el of document.querySelectorAll('a, button, [role=\"button\"], [role=\"tab\"]')) {{ \
						   if ((el.innerText || '').trim() === wanted) {{ el.click(); return true; }} \
						 }} return false; }})()"
					);
					let result = tab.evaluate(&expr, false).map_err(Error::driver)?;
					let clicked = result.value.and_then(|v| v.as_bool()).unwrap_or(false);
					if clicked {
						Ok(())
					} else {
						Err(Error::Driver(format!("no element labeled {label}")))
					}
				})
				.await
			}
		}
	}

	async fn fill(&self, locator: &str, text: &str) -> Result<()> {
		let locator = locator.to_string();
		let text = text.to_string();
		self.with_tab(move |tab| {
			tab.find_element(&locator).map_err(Error::driver)?.click().map_err(Error::driver)?;
			let escaped = locator.replace('\\', "\\\\").replace('\'', "\\'");
			tab.evaluate(
				&format!("document.querySelector('{escaped}').value = ''"),
				false,
			)
			.map_err(Error::driver)?;
			tab.type_str(&text).map_err(Error::driver)?;
			Ok(())
		})
		.await
	}

	async fn press(&self, key: &str) -> Result<()> {
		let key = key.to_string();
		self.with_tab(move |tab| {
			tab.press_key(&key).map_err(Error::driver)?;
			Ok(())
		})
		.await
	}

	async fn read_clipboard(&self) -> Result<String> {
		self.with_tab(|tab| {
			let result = tab
				.evaluate("navigator.clipboard.readText()", true)
				.map_err(Error::driver)?;
			Ok(result
				.value
				.and_then(|value| value.as_str().map(String::from))
				.unwrap_or_default())
		})
		.await
	}

	async fn eval(&self, expression: &str) -> Result<serde_json::Value> {
		let expression = expression.to_string();
		self.with_tab(move |tab| {
			let result = tab.evaluate(&expression, false).map_err(Error::driver)?;
			Ok(result.value.unwrap_or(serde_json::Value::Null))
		})
		.await
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		self.with_tab(|tab| {
			tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
				.map_err(Error::driver)
		})
		.await
	}

	async fn cookies(&self) -> Result<Vec<CookieRecord>> {
		self.with_tab(|tab| {
			let cookies = tab.get_cookies().map_err(Error::driver)?;
			Ok(cookies.into_iter().map(record_from_cookie).collect())
		})
		.await
	}

	async fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<()> {
		let params: Vec<Network::CookieParam> = cookies.iter().map(param_from_record).collect();
		self.with_tab(move |tab| {
			tab.set_cookies(params).map_err(Error::driver)?;
			Ok(())
		})
		.await
	}

	async fn close(&self) -> Result<()> {
		self.with_tab(|tab| {
			tab.close(true).map_err(Error::driver)?;
			Ok(())
		})
		.await
	}
}

/// CDP reports -1 for session cookies.
fn expiry_from_cdp(expires: f64) -> Option<f64> {
	(expires >= 0.0).then_some(expires)
}

fn record_from_cookie(cookie: Network::Cookie) -> CookieRecord {
	CookieRecord {
		name: cookie.name,
		value: cookie.value,
		domain: Some(cookie.domain),
		path: Some(cookie.path),
		expires: expiry_from_cdp(cookie.expires),
		http_only: cookie.http_only,
		secure: cookie.secure,
		same_site: cookie.same_site.map(|same_site| {
			match same_site {
				Network::CookieSameSite::Strict => "Strict",
				Network::CookieSameSite::Lax => "Lax",
				Network::CookieSameSite::None => "None",
			}
			.to_string()
		}),
	}
}

fn param_from_record(record: &CookieRecord) -> Network::CookieParam {
	Network::CookieParam {
		name: record.name.clone(),
		value: record.value.clone(),
		url: None,
		domain: record.domain.clone(),
		path: record.path.clone(),
		secure: Some(record.secure),
		http_only: Some(record.http_only),
		same_site: record.same_site.as_deref().and_then(|same_site| {
			match same_site.to_ascii_lowercase().as_str() {
				"strict" => Some(Network::CookieSameSite::Strict),
				"lax" => Some(Network::CookieSameSite::Lax),
				"none" => Some(Network::CookieSameSite::None),
				_ => None,
			}
		}),
		expires: record.expires,
		priority: None,
		same_party: None,
		source_scheme: None,
		source_port: None,
		partition_key: None,
	}
}

/// Acquires one remote browser session per request.
pub struct CdpProvider {
	automation: AutomationConfig,
}

impl CdpProvider {
	pub fn new(automation: AutomationConfig) -> Self {
		Self { automation }
	}
}

#[async_trait]
impl DriverProvider for CdpProvider {
	async fn acquire(&self) -> Result<Box<dyn PageDriver>> {
		Ok(Box::new(CdpDriver::connect(&self.automation).await?))
	}
}
