use tracing::{debug, trace};

use super::controller::{
    FieldKey, FormController, FormResult, SyncFieldValidatorFn, SyncFormValidatorFn,
    read_lock, resolve_field, write_lock,
};
use super::errors::{CrossFieldReport, ErrorSource, FormErrors, ValidationError};

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

/// A record of string fields whose shape is fixed at compile time.
///
/// Usually derived with `#[derive(FormModel)]`.
pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;
    fn field_keys() -> &'static [FieldKey];
    fn value(&self, key: FieldKey) -> Option<&str>;
    fn set_value(&mut self, key: FieldKey, value: String) -> bool;
}

pub trait FieldValidator<T, L, E>: Send + Sync
where
    L: FieldLens<T>,
    E: ValidationError,
{
    fn validate(&self, model: &T, value: &L::Value) -> Result<(), E>;
}

impl<T, L, E, F> FieldValidator<T, L, E> for F
where
    L: FieldLens<T>,
    E: ValidationError,
    F: for<'a> Fn(&'a T, &'a L::Value) -> Result<(), E> + Send + Sync,
{
    fn validate(&self, model: &T, value: &L::Value) -> Result<(), E> {
        (self)(model, value)
    }
}

pub trait FormValidator<T, E>: Send + Sync
where
    E: ValidationError,
{
    fn validate(&self, model: &T) -> CrossFieldReport<E>;
}

impl<T, E, F> FormValidator<T, E> for F
where
    E: ValidationError,
    F: Fn(&T) -> CrossFieldReport<E> + Send + Sync,
{
    fn validate(&self, model: &T) -> CrossFieldReport<E> {
        (self)(model)
    }
}

impl<T, E> FormController<T, E>
where
    T: FormModel,
    E: ValidationError,
{
    pub fn register_field_validator<L, V>(&self, lens: L, validator: V) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: FieldValidator<T, L, E> + 'static,
    {
        let key = lens.key();
        let validator = std::sync::Arc::new(validator);
        let wrapped: SyncFieldValidatorFn<T, E> =
            std::sync::Arc::new(move |model: &T| validator.validate(model, lens.get(model)));
        let mut validators =
            write_lock(&self.sync_field_validators, "registering field validator")?;
        validators.entry(key).or_default().push(wrapped);
        Ok(())
    }

    pub fn register_form_validator<V>(&self, validator: V) -> FormResult<()>
    where
        V: FormValidator<T, E> + 'static,
    {
        let validator = std::sync::Arc::new(validator);
        let wrapped: SyncFormValidatorFn<T, E> =
            std::sync::Arc::new(move |model: &T| validator.validate(model));
        let mut validators = write_lock(&self.form_validators, "registering form validator")?;
        validators.push(wrapped);
        Ok(())
    }

    /// Advisory tier: writes the value, drops the stale error of the edited
    /// field and the `api` error, and for trigger fields schedules a debounced
    /// cross-field check on the spawner.
    pub fn change<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.set(lens, value)?;
        self.clear_for_edit(key)?;
        self.schedule_cross_field_check(key)
    }

    pub fn change_named(&self, name: &str, value: impl Into<String>) -> FormResult<()> {
        let key = self.set_named(name, value)?;
        self.clear_for_edit(key)?;
        self.schedule_cross_field_check(key)
    }

    /// Same as [`FormController::change`] but awaits the debounced check
    /// in place instead of spawning it. Resolves to `true` when the check
    /// ran, `false` when none was due or a later edit superseded it.
    pub async fn change_async<L>(&self, lens: L, value: L::Value) -> FormResult<bool>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.set(lens, value)?;
        self.clear_for_edit(key)?;
        match self.arm_cross_field_check(key)? {
            Some(check) => Ok(check.await.is_ok()),
            None => Ok(false),
        }
    }

    /// Authoritative single-field check followed by an immediate cross-field pass.
    pub fn blur<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        self.blur_by_key(lens.key())
    }

    pub fn blur_named(&self, name: &str) -> FormResult<()> {
        self.blur_by_key(resolve_field::<T>(name)?)
    }

    /// Runs every field validator and the cross-field validators, replaces the
    /// error set with the result and reports whether it is empty.
    pub fn validate_all(&self) -> FormResult<bool> {
        let model = self.values()?;
        let errors = self.collect_errors(&model)?;
        let is_valid = errors.is_empty();

        let mut state = write_lock(&self.state, "applying form validation result")?;
        debug!(
            form = %state.id,
            valid = is_valid,
            first_error = ?errors.first_error_key(),
            "form validated"
        );
        state.errors = errors;
        Ok(is_valid)
    }

    /// Non-mutating validity used to gate submit affordances.
    ///
    /// Blank fields are always invalid, and errors are recomputed instead of
    /// read from the error store.
    pub fn is_form_valid(&self) -> FormResult<bool> {
        let model = self.values()?;
        let has_blank = T::field_keys()
            .iter()
            .any(|key| model.value(*key).is_none_or(|value| value.trim().is_empty()));
        if has_blank {
            return Ok(false);
        }
        Ok(self.collect_errors(&model)?.is_empty())
    }

    fn clear_for_edit(&self, key: FieldKey) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing errors for edit")?;
        let cleared_field = state.errors.clear_field(key);
        let cleared_api = state.errors.clear_api();
        if cleared_field || cleared_api {
            trace!(form = %state.id, field = %key, cleared_api, "stale errors cleared");
        }
        Ok(())
    }

    fn blur_by_key(&self, key: FieldKey) -> FormResult<()> {
        let model = self.values()?;
        let field_validators = self.field_validators_for(key)?;
        let form_validators = self.cross_field_validators()?;

        let field_error = first_failure(&model, &field_validators);
        let report = (!form_validators.is_empty())
            .then(|| run_form_validators(&model, &form_validators));

        let mut state = write_lock(&self.state, "writing blur validation result")?;
        state.errors.set_field(key, field_error, ErrorSource::Field);
        if let Some(report) = report {
            state.errors.merge(report);
        }
        trace!(form = %state.id, field = %key, "field blurred");
        Ok(())
    }

    fn collect_errors(&self, model: &T) -> FormResult<FormErrors<E>> {
        let field_validators = read_lock(
            &self.sync_field_validators,
            "reading field validators for form validation",
        )?
        .clone();
        let form_validators = self.cross_field_validators()?;

        let mut errors = FormErrors::default();
        for (key, validators) in field_validators {
            errors.set_field(key, first_failure(model, &validators), ErrorSource::Field);
        }
        errors.merge(run_form_validators(model, &form_validators));
        Ok(errors)
    }

    fn field_validators_for(
        &self,
        key: FieldKey,
    ) -> FormResult<Vec<SyncFieldValidatorFn<T, E>>> {
        Ok(read_lock(
            &self.sync_field_validators,
            "reading field validators for key validation",
        )?
        .get(&key)
        .cloned()
        .unwrap_or_default())
    }

    fn cross_field_validators(&self) -> FormResult<Vec<SyncFormValidatorFn<T, E>>> {
        Ok(read_lock(&self.form_validators, "reading form validators")?.clone())
    }
}

/// First validator that reports a non-blank message.
fn first_failure<T, E>(model: &T, validators: &[SyncFieldValidatorFn<T, E>]) -> Option<E>
where
    E: ValidationError,
{
    validators.iter().find_map(|validator| {
        validator(model)
            .err()
            .filter(|error| !error.message().trim().is_empty())
    })
}

pub(super) fn run_form_validators<T, E>(
    model: &T,
    validators: &[SyncFormValidatorFn<T, E>],
) -> CrossFieldReport<E> {
    let mut report = CrossFieldReport::new();
    for validator in validators {
        report.extend(validator(model));
    }
    report
}
