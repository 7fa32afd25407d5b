use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use tempmax_core::{
    ClientSettings, Config, Field, HttpPredictionService, Orchestrator, OrchestratorState,
    PredictionForm, Submission, View, presenter, service::service_from_settings,
};
use tracing::debug;

use crate::{interactive, logging::Verbosity};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "tempmax", version, about = "Maximum-temperature prediction client")]
pub struct Cli {
    /// Base URL of the prediction service; overrides API_BASE_URL and the config file.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored log output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Request one prediction; unspecified fields keep their default values.
    Predict(FieldArgs),

    /// Fill in the form interactively and make as many predictions as needed.
    Interactive,

    /// Ask the service whether its model is loaded.
    Health,

    /// Store the prediction service URL in the config file.
    Configure,
}

/// Raw field values. Numbers are passed through the form's coercion, so
/// anything that doesn't parse is reported instead of sent.
#[derive(Debug, Default, Args)]
pub struct FieldArgs {
    /// Observation date, YYYY-MM-DD (default: today).
    #[arg(long)]
    pub fecha_observacion: Option<String>,
    /// Mean temperature, °C.
    #[arg(long, allow_hyphen_values = true)]
    pub temp_media: Option<String>,
    /// Minimum temperature, °C.
    #[arg(long, allow_hyphen_values = true)]
    pub temp_minimo: Option<String>,
    /// Maximum humidity, %.
    #[arg(long, allow_hyphen_values = true)]
    pub hum_maximo: Option<String>,
    /// Mean humidity, %.
    #[arg(long, allow_hyphen_values = true)]
    pub hum_media: Option<String>,
    /// Minimum humidity, %.
    #[arg(long, allow_hyphen_values = true)]
    pub hum_minimo: Option<String>,
    /// Maximum wind speed, m/s.
    #[arg(long, allow_hyphen_values = true)]
    pub wsp_maximo: Option<String>,
    /// Mean wind speed, m/s.
    #[arg(long, allow_hyphen_values = true)]
    pub wsp_media: Option<String>,
    /// Minimum wind speed, m/s.
    #[arg(long, allow_hyphen_values = true)]
    pub wsp_minimo: Option<String>,
    /// Maximum solar radiation, W/m².
    #[arg(long, allow_hyphen_values = true)]
    pub rad_maximo: Option<String>,
    /// Total solar radiation, MJ/m².
    #[arg(long, allow_hyphen_values = true)]
    pub rad_total: Option<String>,
    /// Total rainfall, mm.
    #[arg(long, allow_hyphen_values = true)]
    pub rain_total: Option<String>,
}

impl FieldArgs {
    fn assignments(&self) -> Vec<(Field, &str)> {
        [
            (Field::FechaObservacion, &self.fecha_observacion),
            (Field::TempMedia, &self.temp_media),
            (Field::TempMinimo, &self.temp_minimo),
            (Field::HumMaximo, &self.hum_maximo),
            (Field::HumMedia, &self.hum_media),
            (Field::HumMinimo, &self.hum_minimo),
            (Field::WspMaximo, &self.wsp_maximo),
            (Field::WspMedia, &self.wsp_media),
            (Field::WspMinimo, &self.wsp_minimo),
            (Field::RadMaximo, &self.rad_maximo),
            (Field::RadTotal, &self.rad_total),
            (Field::RainTotal, &self.rain_total),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }

    pub fn apply(&self, form: &mut PredictionForm) {
        for (field, raw) in self.assignments() {
            form.set_field(field, raw);
        }
    }
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let config = Config::load()?;
        let settings = config.resolve_from_env(self.api_url.as_deref());
        debug!(base_url = %settings.base_url, timeout = ?settings.request_timeout, "settings resolved");

        match self.command {
            Command::Predict(args) => predict(&settings, &args).await,
            Command::Interactive => interactive::run(&settings).await,
            Command::Health => health(&settings).await,
            Command::Configure => configure(config),
        }
    }
}

async fn predict(settings: &ClientSettings, args: &FieldArgs) -> anyhow::Result<ExitCode> {
    let mut form = PredictionForm::initialize();
    args.apply(&mut form);

    let input = match form.snapshot() {
        Ok(input) => input,
        Err(err) => {
            for issue in &err.issues {
                eprintln!("{issue}");
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut orchestrator = Orchestrator::new(service_from_settings(settings)?, settings.min_display);
    let state = submit_and_wait(&mut orchestrator, input).await?;

    Ok(print_outcome(state))
}

/// Submit, show the loading line, and wait for the attempt to settle.
pub async fn submit_and_wait(
    orchestrator: &mut Orchestrator,
    input: tempmax_core::PredictionInput,
) -> anyhow::Result<&OrchestratorState> {
    match orchestrator.submit(input) {
        Submission::Started => {}
        Submission::InFlight => return Err(anyhow!("A prediction is already in flight")),
        Submission::Rejected(err) => return Err(err.into()),
    }

    if orchestrator.state().is_loading() {
        eprintln!("{}", presenter::render(orchestrator.state()));
    }

    Ok(orchestrator.settle().await)
}

/// Print the terminal state: the result card on stdout, the error line on stderr.
pub fn print_outcome(state: &OrchestratorState) -> ExitCode {
    match presenter::render(state) {
        view @ View::Result { .. } => {
            println!("{view}");
            ExitCode::SUCCESS
        }
        view => {
            eprintln!("{view}");
            ExitCode::FAILURE
        }
    }
}

async fn health(settings: &ClientSettings) -> anyhow::Result<ExitCode> {
    let service = HttpPredictionService::new(settings)?;
    let health = service
        .health()
        .await
        .with_context(|| format!("Could not reach the prediction service at {}", service.base_url()))?;

    println!("status:    {}", health.status);
    println!("model_uri: {}", health.model_uri);
    if let Some(error) = &health.error {
        println!("error:     {error}");
    }

    Ok(if health.is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn configure(mut config: Config) -> anyhow::Result<ExitCode> {
    let current = config
        .api_base_url
        .clone()
        .unwrap_or_else(|| tempmax_core::config::DEFAULT_API_BASE_URL.to_string());

    let Some(url) = interactive::ask(
        inquire::Text::new("Prediction service URL:")
            .with_default(&current)
            .with_help_message("Base URL without the /predict suffix")
            .prompt(),
    )?
    else {
        return Ok(ExitCode::FAILURE);
    };

    config.set_api_base_url(&url)?;
    config.save()?;

    println!("Saved to {}", Config::config_file_path()?.display());
    Ok(ExitCode::SUCCESS)
}
