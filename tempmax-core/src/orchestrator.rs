//! Request orchestration state machine.
//!
//! One prediction attempt at a time moves through
//! `Idle -> Loading -> Success | Failure -> Idle`. Leaving `Loading` is gated
//! on both the request settling and the minimum-display floor elapsing,
//! measured from the moment [`Orchestrator::submit`] accepted the input.
//!
//! `submit` spawns the attempt on the runtime right away, so the request and
//! the floor timer both start there and run to completion regardless of who
//! is watching. The orchestrator keeps the task handle; [`Orchestrator::settle`]
//! waits for it and applies the outcome. Dropping a `settle` future part way
//! leaves the attempt pending, and the next `settle` picks it up.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

use crate::{
    error::{FieldError, FormError, RequestError},
    join::SettleGate,
    model::{PredictionInput, PredictionResult},
    service::PredictionService,
};

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    Idle,
    Loading,
    Success(PredictionResult),
    Failure(RequestError),
}

impl OrchestratorState {
    pub fn name(&self) -> &'static str {
        match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Loading => "loading",
            OrchestratorState::Success(_) => "success",
            OrchestratorState::Failure(_) => "failure",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, OrchestratorState::Loading)
    }
}

/// What [`Orchestrator::submit`] did with the input.
#[derive(Debug)]
pub enum Submission {
    /// The request is on its way; call [`Orchestrator::settle`] for the outcome.
    Started,
    /// An attempt is already in flight; nothing was started.
    InFlight,
    /// The input holds non-finite numbers and was not sent.
    Rejected(FormError),
}

type Outcome = Result<PredictionResult, RequestError>;

#[derive(Debug)]
struct Settled {
    outcome: Outcome,
    loading_for: Duration,
}

#[derive(Debug)]
struct Pending {
    id: u64,
    handle: JoinHandle<Settled>,
}

/// Issue the request and wait until both it and the display floor are done.
async fn run_attempt(
    id: u64,
    service: Arc<dyn PredictionService>,
    input: PredictionInput,
    started: Instant,
    min_display: Duration,
) -> Settled {
    let mut gate = SettleGate::new();

    let request = service.predict(&input);
    tokio::pin!(request);
    let floor = sleep_until(started + min_display);
    tokio::pin!(floor);

    let outcome = loop {
        tokio::select! {
            outcome = &mut request, if !gate.outcome_seen() => {
                debug!(attempt = id, elapsed_ms = started.elapsed().as_millis() as u64, "request finished");
                gate.record_outcome(outcome);
            }
            () = &mut floor, if !gate.is_floor_elapsed() => {
                gate.record_floor();
            }
        }

        if let Some(outcome) = gate.take_ready() {
            break outcome;
        }
    };

    Settled { outcome, loading_for: started.elapsed() }
}

#[derive(Debug)]
pub struct Orchestrator {
    service: Arc<dyn PredictionService>,
    min_display: Duration,
    state: OrchestratorState,
    next_id: u64,
    pending: Option<Pending>,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn PredictionService>, min_display: Duration) -> Self {
        Self { service, min_display, state: OrchestratorState::Idle, next_id: 0, pending: None }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// Accept an input, start its request and move to `Loading`. Any held
    /// result or error is dropped. While an attempt is in flight this is a
    /// no-op. Must be called from within a tokio runtime.
    pub fn submit(&mut self, input: PredictionInput) -> Submission {
        if let Some(pending) = &self.pending {
            debug!(attempt = pending.id, "submit ignored: a prediction is already in flight");
            return Submission::InFlight;
        }

        let issues: Vec<FieldError> = input
            .numeric_values()
            .into_iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(field, v)| FieldError::NotANumber { field, raw: v.to_string() })
            .collect();
        if !issues.is_empty() {
            warn!(fields = ?input.non_finite_fields(), "submit rejected: non-finite values");
            return Submission::Rejected(FormError { issues });
        }

        self.next_id += 1;
        let id = self.next_id;
        info!(attempt = id, date = %input.fecha_observacion, "prediction submitted");

        let handle = tokio::spawn(run_attempt(
            id,
            Arc::clone(&self.service),
            input,
            Instant::now(),
            self.min_display,
        ));
        self.pending = Some(Pending { id, handle });
        self.state = OrchestratorState::Loading;

        Submission::Started
    }

    /// Wait for the pending attempt, if any, and apply its outcome.
    ///
    /// Cancel-safe: if this future is dropped before the attempt finishes,
    /// the attempt keeps running and a later call collects it.
    pub async fn settle(&mut self) -> &OrchestratorState {
        let Some(pending) = self.pending.as_mut() else {
            return &self.state;
        };

        let joined = (&mut pending.handle).await;
        let id = pending.id;
        self.pending = None;

        let settled = joined.unwrap_or_else(|err| {
            warn!(attempt = id, error = %err, "prediction task did not finish");
            Settled {
                outcome: Err(RequestError::Network { message: format!("Prediction task failed: {err}") }),
                loading_for: Duration::ZERO,
            }
        });

        let loading_ms = settled.loading_for.as_millis() as u64;
        self.state = match settled.outcome {
            Ok(result) => {
                info!(attempt = id, loading_ms, prediction = result.temp_maximo_pred, "prediction succeeded");
                OrchestratorState::Success(result)
            }
            Err(err) => {
                warn!(attempt = id, loading_ms, kind = err.kind(), error = %err, "prediction failed");
                OrchestratorState::Failure(err)
            }
        };

        &self.state
    }

    /// Submit and settle in one call.
    pub async fn run(&mut self, input: PredictionInput) -> Result<&OrchestratorState, FormError> {
        match self.submit(input) {
            Submission::Started => Ok(self.settle().await),
            Submission::InFlight => Ok(&self.state),
            Submission::Rejected(err) => Err(err),
        }
    }

    /// Back to `Idle` from `Success` or `Failure`, discarding what was held.
    /// Does nothing while `Loading`: in-flight requests are not cancelled.
    pub fn reset(&mut self) -> &OrchestratorState {
        match self.state {
            OrchestratorState::Success(_) | OrchestratorState::Failure(_) => {
                debug!(from = self.state.name(), "reset to idle");
                self.state = OrchestratorState::Idle;
            }
            OrchestratorState::Loading => debug!("reset ignored while loading"),
            OrchestratorState::Idle => {}
        }

        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorDetail;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FLOOR: Duration = Duration::from_millis(1_500);

    #[derive(Debug)]
    struct FakeService {
        latency: Duration,
        response: Result<PredictionResult, RequestError>,
        calls: AtomicUsize,
    }

    impl FakeService {
        fn ok(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                latency,
                response: Ok(PredictionResult {
                    temp_maximo_pred: 24.37,
                    model_uri: "models:/tacorth_tempmax/Production".into(),
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(latency: Duration, err: RequestError) -> Arc<Self> {
            Arc::new(Self { latency, response: Err(err), calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PredictionService for FakeService {
        async fn predict(&self, _input: &PredictionInput) -> Result<PredictionResult, RequestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.response.clone()
        }
    }

    fn input() -> PredictionInput {
        PredictionInput {
            fecha_observacion: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            hum_maximo: 85.0,
            hum_media: 70.0,
            hum_minimo: 55.0,
            rad_maximo: 800.0,
            rad_total: 20.0,
            rain_total: 0.0,
            temp_media: 20.0,
            temp_minimo: 15.0,
            wsp_maximo: 10.0,
            wsp_media: 5.0,
            wsp_minimo: 0.0,
        }
    }

    fn assert_started(submission: Submission) {
        assert!(matches!(submission, Submission::Started), "expected a started attempt, got {submission:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn fast_response_is_held_until_floor() {
        let service = FakeService::ok(Duration::from_millis(20));
        let mut orch = Orchestrator::new(service.clone(), FLOOR);
        assert_eq!(orch.state(), &OrchestratorState::Idle);

        let begin = Instant::now();
        assert_started(orch.submit(input()));
        assert!(orch.state().is_loading());

        let state = orch.settle().await;
        assert!(matches!(state, OrchestratorState::Success(r) if r.temp_maximo_pred == 24.37));
        assert!(begin.elapsed() >= FLOOR);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_response_is_not_delayed_further() {
        let latency = Duration::from_millis(3_200);
        let mut orch = Orchestrator::new(FakeService::ok(latency), FLOOR);

        let begin = Instant::now();
        orch.run(input()).await.unwrap();

        let elapsed = begin.elapsed();
        assert!(elapsed >= latency);
        assert!(elapsed < latency + Duration::from_millis(10));
        assert_eq!(orch.state().name(), "success");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_also_waits_for_floor() {
        let err = RequestError::Network { message: "connection refused".into() };
        let mut orch = Orchestrator::new(FakeService::failing(Duration::ZERO, err.clone()), FLOOR);

        let begin = Instant::now();
        let state = orch.run(input()).await.unwrap();

        assert_eq!(state, &OrchestratorState::Failure(err));
        assert!(begin.elapsed() >= FLOOR);
    }

    #[tokio::test(start_paused = true)]
    async fn second_submit_while_loading_is_a_noop() {
        let service = FakeService::ok(Duration::from_millis(100));
        let mut orch = Orchestrator::new(service.clone(), FLOOR);

        assert_started(orch.submit(input()));
        assert!(matches!(orch.submit(input()), Submission::InFlight));
        assert!(orch.state().is_loading());

        orch.settle().await;
        assert_eq!(service.calls(), 1);
        assert_eq!(orch.state().name(), "success");
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_result_and_error() {
        let mut orch = Orchestrator::new(FakeService::ok(Duration::ZERO), FLOOR);
        orch.run(input()).await.unwrap();
        assert_eq!(orch.reset(), &OrchestratorState::Idle);

        let err = RequestError::Http { status: 422, detail: ErrorDetail::Text("invalid date".into()) };
        let mut orch = Orchestrator::new(FakeService::failing(Duration::ZERO, err), FLOOR);
        orch.run(input()).await.unwrap();
        assert_eq!(orch.reset(), &OrchestratorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_loading_does_not_abort() {
        let service = FakeService::ok(Duration::from_millis(10));
        let mut orch = Orchestrator::new(service.clone(), FLOOR);

        assert_started(orch.submit(input()));
        assert!(orch.reset().is_loading());

        orch.settle().await;
        assert_eq!(orch.state().name(), "success");
    }

    #[tokio::test(start_paused = true)]
    async fn new_submit_clears_previous_error() {
        let detail = ErrorDetail::Structured(json!({"field": "temp_media", "msg": "out of range"}));
        let err = RequestError::Http { status: 500, detail };
        let mut orch = Orchestrator::new(FakeService::failing(Duration::ZERO, err), FLOOR);
        orch.run(input()).await.unwrap();
        assert_eq!(orch.state().name(), "failure");

        assert_started(orch.submit(input()));
        assert_eq!(orch.state(), &OrchestratorState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn request_is_issued_at_submit() {
        let service = FakeService::ok(Duration::from_millis(10));
        let mut orch = Orchestrator::new(service.clone(), FLOOR);

        assert_started(orch.submit(input()));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_settle_keeps_the_attempt_running() {
        let service = FakeService::ok(Duration::from_millis(20));
        let mut orch = Orchestrator::new(service.clone(), FLOOR);

        assert_started(orch.submit(input()));
        let waited = tokio::time::timeout(Duration::from_millis(10), orch.settle()).await;
        assert!(waited.is_err());
        assert!(orch.state().is_loading());

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(service.calls(), 1);

        assert_eq!(orch.settle().await.name(), "success");
        orch.reset();
        assert_started(orch.submit(input()));
    }

    #[tokio::test]
    async fn settle_without_pending_attempt_keeps_state() {
        let mut orch = Orchestrator::new(FakeService::ok(Duration::ZERO), FLOOR);
        assert_eq!(orch.settle().await, &OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn non_finite_input_is_rejected_without_a_call() {
        let service = FakeService::ok(Duration::ZERO);
        let mut orch = Orchestrator::new(service.clone(), FLOOR);

        let mut bad = input();
        bad.hum_media = f64::NAN;

        let err = orch.run(bad).await.unwrap_err();
        assert!(err.to_string().contains("hum_media"));
        assert_eq!(orch.state(), &OrchestratorState::Idle);
        assert_eq!(service.calls(), 0);
    }
}
