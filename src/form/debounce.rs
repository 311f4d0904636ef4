use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock, Weak};
use std::thread;

use futures::FutureExt;
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use futures::task::{FutureObj, Spawn, SpawnError, SpawnExt};
use futures_timer::Delay;
use tracing::{debug, trace};

use super::controller::{
    FieldKey, FormController, FormError, FormResult, FormState, SyncFormValidatorFn, read_lock,
    write_lock,
};
use super::errors::ValidationError;
use super::validation::{FormModel, run_form_validators};

pub(super) type PendingCheck = Abortable<Pin<Box<dyn Future<Output = ()> + Send + 'static>>>;

/// Owns the single pending cross-field check of a form.
#[derive(Debug, Default)]
pub(super) struct DebounceTimer {
    generation: u64,
    pending: Option<AbortHandle>,
}

impl DebounceTimer {
    /// Supersedes whatever is pending and hands out a fresh generation.
    pub(super) fn arm(&mut self) -> (u64, AbortRegistration) {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        let (handle, registration) = AbortHandle::new_pair();
        self.pending = Some(handle);
        (self.generation, registration)
    }

    pub(super) fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claims the firing slot. Only the latest armed generation succeeds.
    pub(super) fn complete(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && self.generation == generation {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub(super) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Runs each spawned future to completion on its own short-lived thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSpawner;

impl Spawn for ThreadSpawner {
    fn spawn_obj(&self, future: FutureObj<'static, ()>) -> Result<(), SpawnError> {
        thread::Builder::new()
            .name("calmform-debounce".into())
            .spawn(move || futures::executor::block_on(future))
            .map(|_| ())
            .map_err(|_| SpawnError::shutdown())
    }
}

impl<T, E> FormController<T, E>
where
    T: FormModel,
    E: ValidationError,
{
    pub fn has_pending_check(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading debounce timer")?
            .debounce
            .is_pending())
    }

    pub(super) fn is_trigger_field(&self, key: FieldKey) -> bool {
        self.options.trigger_fields.contains(&key)
    }

    /// Arms the debounce timer for an edit of `key` and returns the check,
    /// or `None` when the edit does not call for one.
    pub(super) fn arm_cross_field_check(
        &self,
        key: FieldKey,
    ) -> FormResult<Option<PendingCheck>> {
        if !self.is_trigger_field(key) {
            return Ok(None);
        }
        let validators =
            read_lock(&self.form_validators, "reading form validators for debounce")?.clone();
        if validators.is_empty() {
            return Ok(None);
        }

        let (form, generation, registration) = {
            let mut state = write_lock(&self.state, "arming debounce timer")?;
            let (generation, registration) = state.debounce.arm();
            (state.id, generation, registration)
        };
        trace!(form = %form, field = %key, generation, "cross-field check armed");

        let weak = Arc::downgrade(&self.state);
        let delay = self.options.debounce_delay;
        let check: Pin<Box<dyn Future<Output = ()> + Send + 'static>> = Box::pin(async move {
            Delay::new(delay).await;
            fire_cross_field_check(&weak, &validators, generation);
        });
        Ok(Some(Abortable::new(check, registration)))
    }

    pub(super) fn schedule_cross_field_check(&self, key: FieldKey) -> FormResult<()> {
        let Some(check) = self.arm_cross_field_check(key)? else {
            return Ok(());
        };
        if let Err(error) = self.spawner.spawn(check.map(drop)) {
            write_lock(&self.state, "cancelling unscheduled check")?
                .debounce
                .cancel();
            return Err(FormError::SpawnFailed(error.to_string()));
        }
        Ok(())
    }
}

fn fire_cross_field_check<T, E>(
    weak: &Weak<RwLock<FormState<T, E>>>,
    validators: &[SyncFormValidatorFn<T, E>],
    generation: u64,
) where
    E: ValidationError,
{
    let Some(shared) = weak.upgrade() else {
        trace!(generation, "cross-field check fired after form was dropped");
        return;
    };
    let Ok(mut state) = shared.write() else {
        return;
    };
    if !state.active || !state.debounce.complete(generation) {
        trace!(form = %state.id, generation, "stale cross-field check skipped");
        return;
    }

    // Live model: edits made during the delay count.
    let report = run_form_validators(&state.model, validators);
    debug!(
        form = %state.id,
        generation,
        errors = report.has_errors(),
        "debounced cross-field check ran"
    );
    state.errors.merge(report);
}
