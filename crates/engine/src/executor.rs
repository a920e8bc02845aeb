//! Alert workflow execution.
//!
//! `AlertWorkflow` drives one [`WorkflowRun`] through its two steps:
//! 1. **build**: name the check, cross-check siblings for healthy events,
//!    decide action and severity, and persist the payload (`Built`).
//! 2. **dispatch**: deliver the persisted payload to the incident backend.
//!
//! Each step has its own [`RetryPolicy`]. Attempt counts and the next attempt
//! time are written to the run store after every failure, so a run resumed
//! after a restart continues its budget. Dispatch retries never re-run the
//! build step.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::checker::HealthSnapshotChecker;
use crate::decision::{compose_payload, decide};
use crate::dispatcher::AlertDispatcher;
use crate::models::{AlertPayload, HealthEvent, HealthStatus, RunState, SnapshotStatus, Step, WorkflowRun};
use crate::retry::RetryPolicy;
use crate::routing::RoutingKey;
use crate::store::RunStore;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Retry budgets for the two steps.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub build: RetryPolicy,
    pub dispatch: RetryPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            build: RetryPolicy::build(),
            dispatch: RetryPolicy::dispatch(),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertWorkflow
// ---------------------------------------------------------------------------

/// Shared, stateless orchestrator. All per-run state lives in the store.
pub struct AlertWorkflow {
    checker: HealthSnapshotChecker,
    dispatcher: AlertDispatcher,
    store: Arc<dyn RunStore>,
    config: WorkflowConfig,
}

impl AlertWorkflow {
    pub fn new(
        checker: HealthSnapshotChecker,
        dispatcher: AlertDispatcher,
        store: Arc<dyn RunStore>,
        config: WorkflowConfig,
    ) -> Self {
        Self { checker, dispatcher, store, config }
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Persist a new run in `Received`. Does not execute it.
    pub async fn start(&self, event: HealthEvent, routing_key: RoutingKey) -> Result<WorkflowRun, EngineError> {
        let run = WorkflowRun::new(event, routing_key);
        self.store.create(&run).await?;
        info!(run_id = %run.id, check = %run.event.check_name, "workflow run created");
        Ok(run)
    }

    /// Persist a new run and drive it on a background task.
    pub async fn submit(self: &Arc<Self>, event: HealthEvent, routing_key: RoutingKey) -> Result<Uuid, EngineError> {
        let run = self.start(event, routing_key).await?;
        self.spawn(run.id);
        Ok(run.id)
    }

    /// Drive `run_id` to a terminal state on its own task.
    pub fn spawn(self: &Arc<Self>, run_id: Uuid) -> JoinHandle<()> {
        let workflow = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = workflow.drive(run_id).await {
                error!(%run_id, "workflow run could not be driven: {e}");
            }
        })
    }

    /// Re-spawn every run a previous process left unfinished.
    pub async fn resume_unfinished(self: &Arc<Self>) -> Result<usize, EngineError> {
        let runs = self.store.unfinished().await?;
        for run in &runs {
            info!(run_id = %run.id, state = %run.state, "resuming workflow run");
            self.spawn(run.id);
        }
        Ok(runs.len())
    }

    /// Build the alert for an event. Deterministic for a given cross-check
    /// outcome; the cross-check itself never fails.
    pub async fn build(&self, event: &HealthEvent, routing_key: &RoutingKey) -> AlertPayload {
        let snapshot = match event.status {
            HealthStatus::Healthy => {
                self.checker
                    .all_others_healthy(&event.service_name, &event.check_name)
                    .await
            }
            HealthStatus::Unhealthy => SnapshotStatus::Unknown,
        };

        let (action, severity) = decide(event, snapshot);
        info!(
            check = %event.check_name,
            ?snapshot,
            %action,
            %severity,
            "alert decided"
        );
        compose_payload(event, routing_key, action, severity)
    }

    /// Run the workflow until it completes or fails.
    ///
    /// Returns the final run. A run that ends `Failed` is still `Ok`; `Err`
    /// means the run could not be loaded or persisted, in which case it is
    /// left unfinished in the store for a later resume.
    #[instrument(skip_all, fields(run_id = %run_id))]
    pub async fn drive(&self, run_id: Uuid) -> Result<WorkflowRun, EngineError> {
        let mut run = self.store.load(run_id).await?;
        if run.state.is_terminal() {
            return Ok(run);
        }

        // ------------------------------------------------------------------
        // Step 1: build (skipped when a previous drive already persisted it).
        // ------------------------------------------------------------------
        let payload = match run.payload.clone() {
            Some(payload) => payload,
            None => {
                run.transition(RunState::Building);
                self.store.save(&run).await?;

                let event = run.event.clone();
                let routing_key = run.routing_key.clone();
                let (event, routing_key) = (&event, &routing_key);
                let policy = self.config.build.clone();
                let built = self
                    .run_step(&mut run, Step::Build, &policy, move || async move {
                        Ok::<_, Infallible>(self.build(event, routing_key).await)
                    })
                    .await;

                match built {
                    Ok(payload) => {
                        run.payload = Some(payload.clone());
                        run.next_attempt_at = None;
                        run.last_error = None;
                        run.transition(RunState::Built);
                        self.store.save(&run).await?;
                        payload
                    }
                    Err(e) if e.is_step_failure() => return self.fail(run, e).await,
                    Err(e) => return Err(e),
                }
            }
        };

        // ------------------------------------------------------------------
        // Step 2: dispatch the persisted payload.
        // ------------------------------------------------------------------
        run.transition(RunState::Dispatching);
        self.store.save(&run).await?;

        let policy = self.config.dispatch.clone();
        let alert = &payload;
        let sent = self
            .run_step(&mut run, Step::Dispatch, &policy, move || self.dispatcher.send(alert))
            .await;

        match sent {
            Ok(()) => {
                run.next_attempt_at = None;
                run.transition(RunState::Completed);
                self.store.save(&run).await?;
                info!(
                    action = %payload.event_action,
                    dedup_key = %payload.dedup_key,
                    attempts = run.dispatch_attempts,
                    "alert dispatched"
                );
                Ok(run)
            }
            Err(e) if e.is_step_failure() => self.fail(run, e).await,
            Err(e) => Err(e),
        }
    }

    // -----------------------------------------------------------------------
    // Internal: step execution with persisted retry state.
    // -----------------------------------------------------------------------

    async fn run_step<T, E, F, Fut>(
        &self,
        run: &mut WorkflowRun,
        step: Step,
        policy: &RetryPolicy,
        op: F,
    ) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let outcome = tokio::time::timeout(policy.timeout, self.attempt_loop(run, step, policy, op)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(EngineError::StepTimedOut {
                step,
                attempts: run.attempts(step),
            }),
        }
    }

    async fn attempt_loop<T, E, F, Fut>(
        &self,
        run: &mut WorkflowRun,
        step: Step,
        policy: &RetryPolicy,
        mut op: F,
    ) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let limit = policy.attempt_limit();

        // Honour a backoff that was pending when the previous process stopped.
        if let Some(due) = run.next_attempt_at {
            if let Ok(wait) = (due - Utc::now()).to_std() {
                tokio::time::sleep(wait).await;
            }
        }

        loop {
            if run.attempts(step) >= limit {
                return Err(EngineError::StepExhausted {
                    step,
                    attempts: run.attempts(step),
                    message: run.last_error.clone().unwrap_or_else(|| "attempt budget spent".into()),
                });
            }

            // Counted before the call so a crash mid-attempt still spends it.
            let attempt = run.record_attempt(step);
            run.updated_at = Utc::now();
            self.store.save(run).await?;

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err.to_string(),
            };

            run.last_error = Some(err.clone());
            if attempt >= limit {
                run.next_attempt_at = None;
                self.store.save(run).await?;
                return Err(EngineError::StepExhausted { step, attempts: attempt, message: err });
            }

            let delay = policy.delay_after(attempt);
            run.next_attempt_at = chrono::Duration::from_std(delay).ok().map(|d| Utc::now() + d);
            run.updated_at = Utc::now();
            self.store.save(run).await?;

            warn!(
                "step '{}' failed (attempt {}/{}), retrying in {:?}: {}",
                step, attempt, limit, delay, err
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn fail(&self, mut run: WorkflowRun, err: EngineError) -> Result<WorkflowRun, EngineError> {
        error!("workflow run failed: {err}");
        run.last_error = Some(err.to_string());
        run.next_attempt_at = None;
        run.transition(RunState::Failed);
        self.store.save(&run).await?;
        Ok(run)
    }
}
