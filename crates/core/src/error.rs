//! Error taxonomy for generation requests.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Malformed request input; maps to a client error response.
	#[error("invalid request: {0}")]
	Validation(String),

	/// Process configuration is missing or unparseable.
	#[error("configuration error: {0}")]
	Config(String),

	/// Login was required but could not be completed.
	#[error("authentication failed: {0}")]
	Auth(String),

	/// The remote site reported an explicit failure marker while generating.
	#[error("generation failed: {0}")]
	GenerationFailed(String),

	/// The polling deadline elapsed without a terminal signal.
	#[error("generation timed out after {secs}s")]
	GenerationTimeout { secs: u64 },

	/// Completion was signaled but no usable code could be retrieved.
	#[error("extraction failed: {0}")]
	Extraction(String),

	/// An underlying browser-operation fault not otherwise classified.
	#[error("driver error: {0}")]
	Driver(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Stable machine-readable kind, used by the HTTP error body.
	pub fn kind(&self) -> &'static str {
		match self {
			Error::Validation(_) => "validation",
			Error::Auth(_) => "auth",
			Error::GenerationFailed(_) => "generation_failed",
			Error::GenerationTimeout { .. } => "timeout",
			Error::Extraction(_) => "extraction",
			Error::Driver(_) => "driver",
			Error::Config(_) | Error::Io(_) | Error::Json(_) => "internal",
		}
	}

	/// Wraps an arbitrary backend fault as a driver error.
	pub fn driver(err: impl std::fmt::Display) -> Self {
		Error::Driver(err.to_string())
	}
}
