//! Code extraction strategies for a completed generation.
//!
//! The remote UI has exposed two different shapes over time (code blocks
//! readable straight out of the document, and a copy button feeding the
//! system clipboard), so extraction is a pluggable strategy rather than a
//! hardcoded path.

use async_trait::async_trait;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::classify;
use crate::driver::PageDriver;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Name assigned when the UI exposes no filename for the active code view.
pub const DEFAULT_FILENAME: &str = "generated.tsx";

/// Structural query collecting every code-bearing element in one pass.
const SCRAPE_JS: &str = r#"
(() => {
  const blocks = [];
  for (const el of document.querySelectorAll('pre code, [data-filename]')) {
    const text = (el.innerText || '').trim();
    if (!text) continue;
    const filename = el.getAttribute('data-filename')
      || (el.closest('[data-filename]') || {getAttribute: () => null}).getAttribute('data-filename');
    blocks.push({ filename, text });
  }
  return JSON.stringify(blocks);
})()
"#;

/// Generated files keyed by name, unique, in extraction order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
	entries: Vec<(String, String)>,
}

impl GenerationResult {
	/// Adds a file, replacing any earlier entry with the same name.
	pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
		let name = name.into();
		let contents = contents.into();
		if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| *existing == name) {
			entry.1 = contents;
		} else {
			self.entries.push((name, contents));
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// True when at least one entry has non-empty contents.
	pub fn has_content(&self) -> bool {
		self.entries.iter().any(|(_, contents)| !contents.trim().is_empty())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(name, contents)| (name.as_str(), contents.as_str()))
	}
}

impl Serialize for GenerationResult {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;
		for (name, contents) in &self.entries {
			map.serialize_entry(name, contents)?;
		}
		map.end()
	}
}

/// Pluggable extraction strategy, called only after the poller reports
/// completion.
#[async_trait]
pub trait ExtractStrategy: Send + Sync {
	async fn extract(&self, driver: &dyn PageDriver) -> Result<GenerationResult>;
}

/// Copy-affordance round-trip bound to the active tab's label.
///
/// The copy action races the clipboard read, so the whole cycle retries
/// under the shared policy before the request is failed.
pub struct ClipboardExtract {
	retry: RetryPolicy,
}

impl ClipboardExtract {
	pub fn new(retry: RetryPolicy) -> Self {
		Self { retry }
	}

	/// Resolves the displayed filename from the active tab's label.
	async fn active_filename(&self, driver: &dyn PageDriver) -> Result<String> {
		let actions = driver.observe_actions().await?;
		let filename = actions
			.iter()
			.find(|action| looks_like_filename(&action.label))
			.map(|action| action.label.trim().to_string())
			.unwrap_or_else(|| DEFAULT_FILENAME.to_string());
		Ok(filename)
	}
}

#[async_trait]
impl ExtractStrategy for ClipboardExtract {
	async fn extract(&self, driver: &dyn PageDriver) -> Result<GenerationResult> {
		let filename = self.active_filename(driver).await?;
		debug!(target = "genbridge.extract", %filename, "extracting via clipboard");

		let copied = self
			.retry
			.run(|attempt| async move {
				debug!(target = "genbridge.extract", attempt, "copy+read cycle");
				let actions = driver.observe_actions().await?;
				if let Some(copy) = classify::find_labeled(&actions, "copy") {
					driver.perform(copy).await?;
				}
				let text = driver.read_clipboard().await?;
				Ok((!text.trim().is_empty()).then_some(text))
			})
			.await?;

		let Some(text) = copied else {
			return Err(Error::Extraction(format!(
				"clipboard stayed empty after {} attempts",
				self.retry.max_attempts
			)));
		};

		let mut result = GenerationResult::default();
		result.insert(filename, text);
		Ok(result)
	}
}

/// Structural scrape of every code-bearing element in the document.
pub struct DomScrapeExtract;

#[derive(Debug, Deserialize)]
struct ScrapedBlock {
	filename: Option<String>,
	text: String,
}

#[async_trait]
impl ExtractStrategy for DomScrapeExtract {
	async fn extract(&self, driver: &dyn PageDriver) -> Result<GenerationResult> {
		let value = driver.eval(SCRAPE_JS).await?;
		let raw = value.as_str().unwrap_or("[]");
		let blocks: Vec<ScrapedBlock> = serde_json::from_str(raw)?;

		let mut result = GenerationResult::default();
		for block in blocks {
			let name = block.filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string());
			result.insert(name, block.text);
		}

		if !result.has_content() {
			return Err(Error::Extraction("no code-bearing elements found in the document".into()));
		}
		debug!(target = "genbridge.extract", files = result.len(), "extracted via structural scrape");
		Ok(result)
	}
}

/// A tab label counts as a filename when it has a dotted extension and no
/// spaces, e.g. `login.tsx`.
fn looks_like_filename(label: &str) -> bool {
	let label = label.trim();
	if label.is_empty() || label.contains(char::is_whitespace) {
		return false;
	}
	match label.rsplit_once('.') {
		Some((stem, ext)) => {
			!stem.is_empty()
				&& !ext.is_empty()
				&& ext.len() <= 4
				&& ext.chars().all(|c| c.is_ascii_alphanumeric())
		}
		None => false,
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use serde_json::json;

	use super::*;
	use crate::driver::ObservableAction;
	use crate::driver::fake::FakeDriverBuilder;

	fn fast_retry() -> RetryPolicy {
		RetryPolicy::new(5, Duration::from_millis(1))
	}

	fn completed_frame() -> Vec<ObservableAction> {
		vec![
			ObservableAction::with_locator("login.tsx", "[data-gb=\"0\"]"),
			ObservableAction::with_locator("Copy code", "[data-gb=\"1\"]"),
		]
	}

	#[tokio::test]
	async fn clipboard_content_on_third_attempt_succeeds() {
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(completed_frame())
			.clipboard("")
			.clipboard("")
			.clipboard("export default function Login() {...}")
			.build();

		let result = ClipboardExtract::new(fast_retry()).extract(&driver).await.unwrap();

		let files: Vec<_> = result.iter().collect();
		assert_eq!(files, vec![("login.tsx", "export default function Login() {...}")]);
		assert_eq!(controller.clipboard_reads(), 3);
	}

	#[tokio::test]
	async fn empty_clipboard_for_all_attempts_is_an_extraction_error() {
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(completed_frame())
			.clipboard("")
			.build();

		let err = ClipboardExtract::new(fast_retry()).extract(&driver).await.unwrap_err();

		assert!(matches!(err, Error::Extraction(_)), "got {err:?}");
		assert_eq!(controller.clipboard_reads(), 5);
	}

	#[tokio::test]
	async fn copy_affordance_is_activated_each_attempt() {
		let (driver, controller) = FakeDriverBuilder::new()
			.frame(completed_frame())
			.clipboard("")
			.clipboard("content")
			.build();

		ClipboardExtract::new(fast_retry()).extract(&driver).await.unwrap();
		assert_eq!(controller.performed(), vec!["Copy code", "Copy code"]);
	}

	#[tokio::test]
	async fn missing_tab_label_falls_back_to_the_default_filename() {
		let (driver, _) = FakeDriverBuilder::new()
			.frame(vec![ObservableAction::new("Copy code")])
			.clipboard("const x = 1;")
			.build();

		let result = ClipboardExtract::new(fast_retry()).extract(&driver).await.unwrap();
		let files: Vec<_> = result.iter().collect();
		assert_eq!(files, vec![(DEFAULT_FILENAME, "const x = 1;")]);
	}

	#[tokio::test]
	async fn dom_scrape_collects_every_named_block() {
		let blocks = json!([
			{"filename": "app.tsx", "text": "export default function App() {}"},
			{"filename": "styles.css", "text": "body { margin: 0; }"},
		]);
		let (driver, _) = FakeDriverBuilder::new()
			.eval_result(json!(blocks.to_string()))
			.build();

		let result = DomScrapeExtract.extract(&driver).await.unwrap();
		let files: Vec<_> = result.iter().collect();
		assert_eq!(
			files,
			vec![
				("app.tsx", "export default function App() {}"),
				("styles.css", "body { margin: 0; }"),
			]
		);
	}

	#[tokio::test]
	async fn dom_scrape_with_only_empty_blocks_is_an_extraction_error() {
		let blocks = json!([{"filename": "app.tsx", "text": "   "}]);
		let (driver, _) = FakeDriverBuilder::new()
			.eval_result(json!(blocks.to_string()))
			.build();

		let err = DomScrapeExtract.extract(&driver).await.unwrap_err();
		assert!(matches!(err, Error::Extraction(_)), "got {err:?}");
	}

	#[test]
	fn result_serializes_in_extraction_order_with_unique_names() {
		let mut result = GenerationResult::default();
		result.insert("z.tsx", "last alphabetically, first extracted");
		result.insert("a.tsx", "first alphabetically");
		result.insert("z.tsx", "replaced");

		let json = serde_json::to_string(&result).unwrap();
		assert_eq!(
			json,
			r#"{"z.tsx":"replaced","a.tsx":"first alphabetically"}"#
		);
	}

	#[test]
	fn filename_heuristic_accepts_tab_labels_only() {
		assert!(looks_like_filename("login.tsx"));
		assert!(looks_like_filename("index.html"));
		assert!(!looks_like_filename("Copy code"));
		assert!(!looks_like_filename("v0.dev is thinking..."));
		assert!(!looks_like_filename(".env"));
		assert!(!looks_like_filename("Download"));
	}
}
