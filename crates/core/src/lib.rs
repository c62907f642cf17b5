//! Prompt-to-code bridge over an automated browser session.
//!
//! genbridge drives a third-party UI-generation site through an abstract
//! page-driver capability: submit a prompt, watch the page until the
//! asynchronous generation settles, extract the generated files, and keep
//! the authenticated session warm across runs.

pub mod auth;
pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod poll;
pub mod retry;
pub mod session;

pub use config::Config;
pub use driver::{DriverProvider, ObservableAction, PageDriver};
pub use error::{Error, Result};
pub use extract::GenerationResult;
pub use orchestrator::Orchestrator;
