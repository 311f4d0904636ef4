use std::future::Future;
use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, warn};

use super::controller::{
    FormController, FormError, FormResult, FormState, SubmitState, read_lock,
    transition_submit_state, write_lock,
};
use super::errors::ValidationError;
use super::settings::ApiMessages;
use super::validation::FormModel;

/// Shape of a failed submit, as far as the `api` message is concerned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FailureKind<'a> {
    /// The server answered; `body` is its decoded payload, if any.
    Response { status: u16, body: Option<&'a Value> },
    /// The request went out but nothing came back.
    NoResponse,
    Other,
}

pub trait SubmitFailure {
    fn kind(&self) -> FailureKind<'_>;
}

/// Failure taxonomy of a JSON-over-HTTP client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpFailure {
    #[error("request failed with status code {status}")]
    Response { status: u16, body: Option<Value> },
    #[error("no response received: {0}")]
    NoResponse(String),
    #[error("{0}")]
    Other(String),
}

impl HttpFailure {
    pub fn response(status: u16, body: Value) -> Self {
        Self::Response {
            status,
            body: Some(body),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::Response { status, body: None }
    }
}

impl SubmitFailure for HttpFailure {
    fn kind(&self) -> FailureKind<'_> {
        match self {
            HttpFailure::Response { status, body } => FailureKind::Response {
                status: *status,
                body: body.as_ref(),
            },
            HttpFailure::NoResponse(_) => FailureKind::NoResponse,
            HttpFailure::Other(_) => FailureKind::Other,
        }
    }
}

/// Folds any failure into exactly one `api` message.
pub fn api_error_message<F>(failure: &F, messages: &ApiMessages) -> String
where
    F: SubmitFailure + ?Sized,
{
    match failure.kind() {
        FailureKind::Response { status, body } => body
            .and_then(body_error)
            .map(str::to_owned)
            .unwrap_or_else(|| messages.request_failed(status)),
        FailureKind::NoResponse => messages.network.clone(),
        FailureKind::Other => messages.fallback.clone(),
    }
}

fn body_error(body: &Value) -> Option<&str> {
    body.get("error")?
        .as_str()
        .filter(|message| !message.trim().is_empty())
}

pub trait SubmitAction<T> {
    type Error: SubmitFailure;
    type Fut: Future<Output = Result<(), Self::Error>>;

    fn submit(&self, model: T) -> Self::Fut;
}

impl<T, F, Fut, Err> SubmitAction<T> for F
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), Err>>,
    Err: SubmitFailure,
{
    type Error = Err;
    type Fut = Fut;

    fn submit(&self, model: T) -> Self::Fut {
        (self)(model)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// Validation failed; the action was not called.
    Invalid,
    Submitted,
    Rejected { message: String },
    /// The form was reset or disposed while the action ran, or was already
    /// disposed when submit was called. The action result, if any, was dropped.
    Abandoned,
}

impl<T, E> FormController<T, E>
where
    T: FormModel,
    E: ValidationError,
{
    /// Validates everything synchronously and, when clean, hands the current
    /// values to `action`. Failures of the action end up in the `api` slot.
    pub async fn submit<A>(&self, action: &A) -> FormResult<SubmitOutcome>
    where
        A: SubmitAction<T>,
    {
        let epoch = {
            let mut state = write_lock(&self.state, "preparing submit")?;
            if !state.active {
                debug!(form = %state.id, "submit on disposed form ignored");
                return Ok(SubmitOutcome::Abandoned);
            }
            if state.submit_state != SubmitState::Idle {
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state, SubmitState::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
            if state.debounce.cancel() {
                debug!(form = %state.id, "pending cross-field check superseded by submit");
            }
            state.epoch
        };
        let _in_flight = InFlight(self.state.as_ref());

        let is_valid = self.validate_all()?;
        if !is_valid {
            let mut state = write_lock(&self.state, "handling submit validation failure")?;
            transition_submit_state(&mut state, SubmitState::Idle)?;
            debug!(form = %state.id, "submit blocked by validation errors");
            return Ok(SubmitOutcome::Invalid);
        }

        let model = {
            let mut state = write_lock(&self.state, "moving submit state to submitting")?;
            transition_submit_state(&mut state, SubmitState::Submitting)?;
            debug!(form = %state.id, attempt = state.submit_count, "submitting form");
            state.model.clone()
        };
        let result = action.submit(model).await;

        let mut state = write_lock(&self.state, "completing submit")?;
        transition_submit_state(&mut state, SubmitState::Idle)?;
        if !state.active || state.epoch != epoch {
            debug!(form = %state.id, "submit resolved after reset or teardown; ignored");
            return Ok(SubmitOutcome::Abandoned);
        }

        match result {
            Ok(()) => {
                debug!(form = %state.id, "submit succeeded");
                Ok(SubmitOutcome::Submitted)
            }
            Err(failure) => {
                let message = api_error_message(&failure, &self.options.messages);
                warn!(form = %state.id, api_error = %message, "submit rejected");
                state.errors.set_api(message.clone());
                Ok(SubmitOutcome::Rejected { message })
            }
        }
    }

    pub fn is_submitting(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state != SubmitState::Idle)
    }
}

/// Returns the submit state to `Idle` on every exit path, including an
/// error bubbling out of validation or the submit future being dropped.
struct InFlight<'a, T, E>(&'a RwLock<FormState<T, E>>);

impl<T, E> Drop for InFlight<'_, T, E> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.write() {
            state.submit_state = SubmitState::Idle;
        }
    }
}
