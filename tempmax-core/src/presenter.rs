//! Pure projection of [`OrchestratorState`] into what the user sees.

use std::fmt;

use crate::{
    error::RequestError,
    model::PredictionResult,
    orchestrator::OrchestratorState,
    service::http::CONNECTIVITY_MESSAGE,
};

pub const TEMPERATURE_UNIT: &str = "°C";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Data entry; carries the error line of the last failed attempt, if any.
    Form { error: Option<String> },
    Loading,
    Result { temperature: String, model_uri: String },
}

/// `temp_maximo_pred` rounded to one decimal with its unit, e.g. `24.4°C`.
pub fn format_temperature(value: f64) -> String {
    format!("{value:.1}{TEMPERATURE_UNIT}")
}

/// Single human-readable line for a failed attempt.
pub fn error_line(error: &RequestError) -> String {
    match error {
        RequestError::Http { status, detail } => format!("Error {status}: {}", detail.render()),
        RequestError::Network { message } if message.trim().is_empty() => {
            CONNECTIVITY_MESSAGE.to_string()
        }
        RequestError::Network { message } => message.clone(),
    }
}

pub fn result_view(result: &PredictionResult) -> View {
    View::Result {
        temperature: format_temperature(result.temp_maximo_pred),
        model_uri: result.model_uri.clone(),
    }
}

pub fn render(state: &OrchestratorState) -> View {
    match state {
        OrchestratorState::Idle => View::Form { error: None },
        OrchestratorState::Loading => View::Loading,
        OrchestratorState::Success(result) => result_view(result),
        OrchestratorState::Failure(error) => View::Form { error: Some(error_line(error)) },
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Form { error: Some(line) } => f.write_str(line),
            View::Form { error: None } => Ok(()),
            View::Loading => f.write_str("Predicting maximum temperature..."),
            View::Result { temperature, model_uri } => {
                writeln!(f, "{temperature}")?;
                writeln!(f, "Predicted maximum temperature")?;
                write!(f, "Model: {model_uri}")
            }
        }
    }
}
