//! Core library for the `tempmax` prediction client.
//!
//! This crate defines:
//! - The editable prediction form and its typed input
//! - The request orchestrator driving one prediction at a time
//! - The HTTP client for the prediction service
//! - Rendering of results and errors
//! - Configuration handling
//!
//! It is used by `tempmax-cli`, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod form;
pub mod join;
pub mod model;
pub mod orchestrator;
pub mod presenter;
pub mod service;

pub use config::{ClientSettings, Config};
pub use error::{ErrorDetail, FieldError, FormError, RequestError};
pub use form::{Field, FieldValue, PredictionForm};
pub use model::{HealthStatus, PredictionInput, PredictionResult};
pub use orchestrator::{Orchestrator, OrchestratorState, Submission};
pub use presenter::View;
pub use service::{HttpPredictionService, PredictionService};
