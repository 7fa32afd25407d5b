use std::process::ExitCode;

use inquire::{Confirm, CustomUserError, InquireError, Text, validator::Validation};
use tempmax_core::{
    ClientSettings, Field, Orchestrator, OrchestratorState, PredictionForm,
    form::{parse_date, parse_field},
    service::service_from_settings,
};

use crate::cli::{print_outcome, submit_and_wait};

/// Unwrap a prompt answer, mapping Esc / Ctrl-C to `None`.
pub fn ask<T>(answer: Result<T, InquireError>) -> anyhow::Result<Option<T>> {
    match answer {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn prompt_label(field: Field) -> String {
    match field.unit() {
        Some(unit) => format!("{} ({unit}):", field.label()),
        None => format!("{} (YYYY-MM-DD):", field.label()),
    }
}

fn check(field: Field, raw: &str) -> Result<(), String> {
    let result = if field.is_date() {
        parse_date(raw).map(|_| ())
    } else {
        parse_field(field, raw).map(|_| ())
    };
    result.map_err(|e| e.to_string())
}

/// Prompt for every field, defaulting to the form's current text. Returns
/// `false` if the user cancelled.
fn fill_form(form: &mut PredictionForm) -> anyhow::Result<bool> {
    for &field in Field::all() {
        let label = prompt_label(field);
        let current = form.raw_value(field);

        let answer = Text::new(&label)
            .with_default(&current)
            .with_help_message(field.as_str())
            .with_validator(move |raw: &str| -> Result<Validation, CustomUserError> {
                Ok(match check(field, raw) {
                    Ok(()) => Validation::Valid,
                    Err(msg) => Validation::Invalid(msg.into()),
                })
            })
            .prompt();

        let Some(raw) = ask(answer)? else {
            return Ok(false);
        };
        form.set_field(field, &raw);
    }

    Ok(true)
}

pub async fn run(settings: &ClientSettings) -> anyhow::Result<ExitCode> {
    let mut form = PredictionForm::initialize();
    let mut orchestrator = Orchestrator::new(service_from_settings(settings)?, settings.min_display);

    loop {
        if !fill_form(&mut form)? {
            return Ok(ExitCode::SUCCESS);
        }

        let input = match form.snapshot() {
            Ok(input) => input,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        let state = submit_and_wait(&mut orchestrator, input).await?;
        let succeeded = matches!(state, OrchestratorState::Success(_));
        let code = print_outcome(state);

        // On failure the form keeps its values so they can be corrected.
        let question = if succeeded { "Make another prediction?" } else { "Edit the values and try again?" };
        if !ask(Confirm::new(question).with_default(true).prompt())?.unwrap_or(false) {
            return Ok(code);
        }

        orchestrator.reset();
    }
}
