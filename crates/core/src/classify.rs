//! Marker classification over observable actions.
//!
//! String matching against the remote UI's copy is the only state signal
//! available, so every matching rule lives here and nowhere else; the
//! polling loop and the auth flow stay ignorant of the actual wording.

use crate::driver::ObservableAction;

/// Label fragments that indicate the generation ended in an error.
const ERROR_MARKERS: &[&str] = &["error", "failed", "something went wrong", "try again"];

/// Label fragments that indicate generated code is ready.
const COMPLETION_MARKERS: &[&str] = &[
	"copy code",
	"preview",
	"download",
	"save to project",
	"add to codebase",
];

/// Label fragments shown while the site is still generating.
const PROGRESS_MARKERS: &[&str] = &["generating", "loading", "thinking", "stop generating"];

/// Label fragments that indicate the site is asking for a login.
const LOGIN_MARKERS: &[&str] = &["sign in", "log in", "login"];

/// Point-in-time classification of one observation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
	/// An error marker is visible. Takes precedence over completion.
	Failed,
	/// A completion marker is visible.
	Completed,
	/// A generating/loading marker is visible; keep waiting.
	InProgress,
	/// No recognized marker at all; the caller may probe for code directly.
	Indeterminate,
}

/// Classifies one snapshot of observable actions.
///
/// Error markers win over completion markers when both are present in the
/// same poll; the decision is binary per poll, with no partial-completion
/// state.
pub fn classify(actions: &[ObservableAction]) -> Signal {
	if any_label_matches(actions, ERROR_MARKERS) {
		return Signal::Failed;
	}
	if any_label_matches(actions, COMPLETION_MARKERS) {
		return Signal::Completed;
	}
	if any_label_matches(actions, PROGRESS_MARKERS) {
		return Signal::InProgress;
	}
	Signal::Indeterminate
}

/// True when the page is showing a login affordance.
pub fn requires_login(actions: &[ObservableAction]) -> bool {
	any_label_matches(actions, LOGIN_MARKERS)
}

/// The first login affordance on the page, if any.
pub fn find_login_action(actions: &[ObservableAction]) -> Option<&ObservableAction> {
	find_matching(actions, LOGIN_MARKERS)
}

/// The label of the first visible error marker, for failure reporting.
pub fn first_error_label(actions: &[ObservableAction]) -> Option<&str> {
	find_matching(actions, ERROR_MARKERS).map(|action| action.label.as_str())
}

/// The first action whose label contains `marker`, case-insensitively.
pub fn find_labeled<'a>(actions: &'a [ObservableAction], marker: &str) -> Option<&'a ObservableAction> {
	let marker = marker.to_lowercase();
	actions.iter().find(|action| action.label.to_lowercase().contains(&marker))
}

fn find_matching<'a>(actions: &'a [ObservableAction], markers: &[&str]) -> Option<&'a ObservableAction> {
	actions.iter().find(|action| {
		let label = action.label.to_lowercase();
		markers.iter().any(|marker| label.contains(marker))
	})
}

fn any_label_matches(actions: &[ObservableAction], markers: &[&str]) -> bool {
	find_matching(actions, markers).is_some()
}
