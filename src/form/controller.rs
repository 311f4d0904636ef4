use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::task::Spawn;
use tracing::debug;

use super::debounce::{DebounceTimer, ThreadSpawner};
use super::errors::{CrossFieldReport, ErrorSource, FormErrors, ValidationError};
use super::settings::ApiMessages;
use super::validation::{FieldLens, FormModel};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }

    /// Resolves a runtime field name against the declared fields of `T`.
    pub fn parse<T: FormModel>(name: &str) -> Option<Self> {
        T::field_keys()
            .iter()
            .copied()
            .find(|key| key.as_str() == name)
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub debounce_delay: Duration,
    pub trigger_fields: BTreeSet<FieldKey>,
    pub messages: ApiMessages,
}

impl FormOptions {
    pub fn debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn trigger_field(mut self, key: FieldKey) -> Self {
        self.trigger_fields.insert(key);
        self
    }

    pub fn trigger_fields(mut self, keys: impl IntoIterator<Item = FieldKey>) -> Self {
        self.trigger_fields.extend(keys);
        self
    }

    pub fn messages(mut self, messages: ApiMessages) -> Self {
        self.messages = messages;
        self
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
            trigger_fields: BTreeSet::new(),
            messages: ApiMessages::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T, E> {
    pub model: T,
    pub errors: FormErrors<E>,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub is_dirty: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("invalid submit state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form submit is already in progress")]
    AlreadySubmitting,
    #[error("unknown form field `{0}`")]
    UnknownField(String),
    #[error("failed to schedule cross-field check: {0}")]
    SpawnFailed(String),
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SyncFieldValidatorFn<T, E> = Arc<dyn Fn(&T) -> Result<(), E> + Send + Sync>;
pub(super) type SyncFormValidatorFn<T, E> =
    Arc<dyn Fn(&T) -> CrossFieldReport<E> + Send + Sync>;

pub(super) struct FormState<T, E> {
    pub(super) id: FormId,
    pub(super) initial_model: T,
    pub(super) model: T,
    pub(super) errors: FormErrors<E>,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) dirty_fields: BTreeSet<FieldKey>,
    pub(super) active: bool,
    /// Bumped by `reset`; a submit that started in an older epoch is stale.
    pub(super) epoch: u64,
    pub(super) debounce: DebounceTimer,
}

#[derive(Clone)]
pub struct FormController<T, E>
where
    T: FormModel,
    E: ValidationError,
{
    pub(super) options: Arc<FormOptions>,
    pub(super) state: Arc<RwLock<FormState<T, E>>>,
    pub(super) sync_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<SyncFieldValidatorFn<T, E>>>>>,
    pub(super) form_validators: Arc<RwLock<Vec<SyncFormValidatorFn<T, E>>>>,
    pub(super) spawner: Arc<dyn Spawn + Send + Sync>,
}

impl<T, E> FormController<T, E>
where
    T: FormModel,
    E: ValidationError,
{
    pub fn new(initial: T, options: FormOptions) -> Self {
        let id = FormId::next();
        debug!(form = %id, fields = T::field_keys().len(), "form controller created");
        Self {
            options: Arc::new(options),
            state: Arc::new(RwLock::new(FormState {
                id,
                initial_model: initial.clone(),
                model: initial,
                errors: FormErrors::default(),
                submit_state: SubmitState::Idle,
                submit_count: 0,
                dirty_fields: BTreeSet::new(),
                active: true,
                epoch: 0,
                debounce: DebounceTimer::default(),
            })),
            sync_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            form_validators: Arc::new(RwLock::new(Vec::new())),
            spawner: Arc::new(ThreadSpawner),
        }
    }

    /// Replaces the executor that runs debounced cross-field checks.
    pub fn with_spawner(mut self, spawner: impl Spawn + Send + Sync + 'static) -> Self {
        self.spawner = Arc::new(spawner);
        self
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    pub fn values(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading form values")?.model.clone())
    }

    pub fn errors(&self) -> FormResult<FormErrors<E>> {
        Ok(read_lock(&self.state, "reading form errors")?.errors.clone())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T, E>> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            model: state.model.clone(),
            errors: state.errors.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            is_dirty: !state.dirty_fields.is_empty(),
        })
    }

    pub fn is_dirty(&self) -> FormResult<bool> {
        Ok(!read_lock(&self.state, "reading dirty fields")?
            .dirty_fields
            .is_empty())
    }

    pub fn is_active(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading form activity")?.active)
    }

    /// Plain field write: no validation, no error bookkeeping.
    pub fn set<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state, "writing form model")?;
        lens.set(&mut state.model, value);
        let is_dirty = lens.get(&state.model) != lens.get(&state.initial_model);
        mark_dirty(&mut state, key, is_dirty);
        Ok(())
    }

    pub fn set_named(&self, name: &str, value: impl Into<String>) -> FormResult<FieldKey> {
        let key = resolve_field::<T>(name)?;
        let mut state = write_lock(&self.state, "writing named form field")?;
        state.model.set_value(key, value.into());
        let is_dirty = state.model.value(key) != state.initial_model.value(key);
        mark_dirty(&mut state, key, is_dirty);
        Ok(key)
    }

    pub fn set_field_error<L>(&self, lens: L, error: Option<E>) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let mut state = write_lock(&self.state, "setting field error")?;
        state.errors.set_field(lens.key(), error, ErrorSource::Manual);
        Ok(())
    }

    pub fn set_api_error(&self, message: impl Into<String>) -> FormResult<()> {
        let mut state = write_lock(&self.state, "setting api error")?;
        state.errors.set_api(message);
        Ok(())
    }

    pub fn clear_api_error(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing api error")?;
        state.errors.clear_api();
        Ok(())
    }

    /// Caller-side bulk update: `Some` sets, `None` clears, unlisted fields stay.
    pub fn merge_errors(&self, report: CrossFieldReport<E>) -> FormResult<()> {
        let mut state = write_lock(&self.state, "merging errors")?;
        state.errors.overwrite(report, ErrorSource::Manual);
        Ok(())
    }

    /// Restores the initial snapshot, clears every error including `api` and
    /// cancels any pending cross-field check.
    pub fn reset(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting form")?;
        if state.debounce.cancel() {
            debug!(form = %state.id, "pending cross-field check cancelled by reset");
        }
        state.model = state.initial_model.clone();
        state.errors.clear();
        state.dirty_fields.clear();
        state.epoch = state.epoch.wrapping_add(1);
        Ok(())
    }

    /// Tears the instance down. Pending checks and late submit results
    /// become no-ops.
    pub fn dispose(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "disposing form")?;
        state.debounce.cancel();
        state.active = false;
        debug!(form = %state.id, "form controller disposed");
        Ok(())
    }
}

fn mark_dirty<T, E>(state: &mut FormState<T, E>, key: FieldKey, is_dirty: bool) {
    if is_dirty {
        state.dirty_fields.insert(key);
    } else {
        state.dirty_fields.remove(&key);
    }
}

pub(super) fn resolve_field<T: FormModel>(name: &str) -> FormResult<FieldKey> {
    FieldKey::parse::<T>(name).ok_or_else(|| FormError::UnknownField(name.to_owned()))
}

pub(super) fn transition_submit_state<T, E>(
    state: &mut FormState<T, E>,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
