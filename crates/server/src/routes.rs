//! HTTP surface: one prompt-submission endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use genbridge::driver::DriverProvider;
use genbridge::error::Error;
use genbridge::extract::GenerationResult;
use genbridge::orchestrator::Orchestrator;

/// Per-process shared state: the orchestrator and the driver source.
pub struct AppState {
	pub orchestrator: Orchestrator,
	pub provider: Box<dyn DriverProvider>,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
	#[serde(default)]
	prompt: String,
}

#[derive(Debug, Serialize)]
struct PromptResponse {
	files: GenerationResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
	error: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	kind: Option<&'static str>,
}

pub fn router(state: Arc<AppState>) -> Router {
	Router::new()
		.route("/api/prompt", post(prompt_handler))
		.layer(CorsLayer::permissive())
		.with_state(state)
}

async fn prompt_handler(
	State(state): State<Arc<AppState>>,
	Json(request): Json<PromptRequest>,
) -> Response {
	let prompt = request.prompt.trim();
	if prompt.is_empty() {
		return error_response(&Error::Validation("prompt must be a non-empty string".into()));
	}

	info!(target = "genbridge.http", chars = prompt.len(), "prompt accepted");

	match state.orchestrator.execute(state.provider.as_ref(), prompt).await {
		Ok(files) => (StatusCode::OK, Json(PromptResponse { files })).into_response(),
		Err(err) => {
			error!(target = "genbridge.http", error = %err, kind = err.kind(), "prompt request failed");
			error_response(&err)
		}
	}
}

/// Exactly one JSON error object per failed request; the `kind` field is
/// only attached to server-side failures.
fn error_response(err: &Error) -> Response {
	let status = match err {
		Error::Validation(_) => StatusCode::BAD_REQUEST,
		_ => StatusCode::INTERNAL_SERVER_ERROR,
	};
	let kind = (status == StatusCode::INTERNAL_SERVER_ERROR).then(|| err.kind());
	(
		status,
		Json(ErrorResponse {
			error: err.to_string(),
			kind,
		}),
	)
		.into_response()
}
