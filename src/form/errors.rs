use std::borrow::Cow;
use std::collections::BTreeMap;

use super::controller::FieldKey;

pub trait ValidationError: Clone + Send + Sync + 'static {
    fn message(&self) -> Cow<'_, str>;
}

impl ValidationError for String {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl ValidationError for &'static str {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl ValidationError for Cow<'static, str> {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_ref())
    }
}

/// Which pass produced a field error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorSource {
    Field,
    CrossField,
    Manual,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldError<E> {
    pub error: E,
    pub source: ErrorSource,
}

/// Verdict of a cross-field validator.
///
/// Only the listed keys are touched when the report is merged: `Some` sets a
/// message, `None` withdraws an earlier cross-field message for that key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrossFieldReport<E> {
    entries: BTreeMap<FieldKey, Option<E>>,
}

impl<E> CrossFieldReport<E> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn error(mut self, key: FieldKey, error: E) -> Self {
        self.entries.insert(key, Some(error));
        self
    }

    pub fn clear(mut self, key: FieldKey) -> Self {
        self.entries.insert(key, None);
        self
    }

    pub fn insert(&mut self, key: FieldKey, verdict: Option<E>) {
        self.entries.insert(key, verdict);
    }

    /// Folds another report in; later verdicts for the same key win.
    pub fn extend(&mut self, other: CrossFieldReport<E>) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, key: FieldKey) -> Option<&Option<E>> {
        self.entries.get(&key)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.values().any(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, Option<&E>)> {
        self.entries.iter().map(|(key, verdict)| (*key, verdict.as_ref()))
    }
}

impl<E> Default for CrossFieldReport<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FromIterator<(FieldKey, E)> for CrossFieldReport<E> {
    fn from_iter<I: IntoIterator<Item = (FieldKey, E)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, error)| (key, Some(error)))
                .collect(),
        }
    }
}

/// Current error set of a form: one entry per field plus the `api` slot for
/// failures that do not belong to a single field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormErrors<E> {
    fields: BTreeMap<FieldKey, FieldError<E>>,
    api: Option<String>,
}

impl<E> Default for FormErrors<E> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            api: None,
        }
    }
}

impl<E> FormErrors<E>
where
    E: ValidationError,
{
    pub fn get(&self, key: FieldKey) -> Option<&E> {
        self.fields.get(&key).map(|entry| &entry.error)
    }

    pub fn entry(&self, key: FieldKey) -> Option<&FieldError<E>> {
        self.fields.get(&key)
    }

    pub fn message(&self, key: FieldKey) -> Option<String> {
        self.get(key).map(|error| error.message().into_owned())
    }

    pub fn api(&self) -> Option<&str> {
        self.api.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.api.is_none()
    }

    pub fn has_field_errors(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len() + usize::from(self.api.is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &E)> {
        self.fields.iter().map(|(key, entry)| (*key, &entry.error))
    }

    pub fn first_error_key(&self) -> Option<FieldKey> {
        self.fields.keys().next().copied()
    }

    /// Writes or clears a field entry. A blank message counts as cleared.
    pub fn set_field(&mut self, key: FieldKey, error: Option<E>, source: ErrorSource) {
        match error.filter(|error| !error.message().trim().is_empty()) {
            Some(error) => {
                self.fields.insert(key, FieldError { error, source });
            }
            None => {
                self.fields.remove(&key);
            }
        }
    }

    pub fn clear_field(&mut self, key: FieldKey) -> bool {
        self.fields.remove(&key).is_some()
    }

    pub fn set_api(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.api = (!message.trim().is_empty()).then_some(message);
    }

    pub fn clear_api(&mut self) -> bool {
        self.api.take().is_some()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.api = None;
    }

    /// Applies every listed verdict as written, whoever produced the current
    /// entry. Unlisted keys are left alone.
    pub fn overwrite(&mut self, report: CrossFieldReport<E>, source: ErrorSource) {
        for (key, verdict) in report.entries {
            self.set_field(key, verdict, source);
        }
    }

    /// Applies a cross-field verdict without disturbing unlisted keys.
    ///
    /// A per-field verdict already present for a key outranks a cross-field
    /// error, and a withdrawal only removes messages the cross-field pass owns.
    pub fn merge(&mut self, report: CrossFieldReport<E>) {
        for (key, verdict) in report.entries {
            let current = self.fields.get(&key).map(|entry| entry.source);
            match verdict {
                Some(error) => {
                    if matches!(current, None | Some(ErrorSource::CrossField)) {
                        self.set_field(key, Some(error), ErrorSource::CrossField);
                    }
                }
                None => {
                    if current == Some(ErrorSource::CrossField) {
                        self.fields.remove(&key);
                    }
                }
            }
        }
    }
}
