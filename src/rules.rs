//! Stock validators for account forms.
//!
//! The `check_*` functions are plain predicates; the types below wrap them
//! into validators that can be registered on a [`FormController`].
//!
//! [`FormController`]: crate::form::FormController

use std::sync::LazyLock;

use regex::Regex;

use crate::form::{CrossFieldReport, FieldLens, FieldValidator, FormValidator};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 64;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile")
});

pub fn check_presence(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{label} is required"))
    } else {
        Ok(())
    }
}

pub fn check_email(value: &str) -> Result<(), String> {
    check_presence(value, "Email")?;
    if EMAIL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err("Invalid email format".to_owned())
    }
}

pub fn check_password(value: &str) -> Result<(), String> {
    check_presence(value, "Password")?;
    // UTF-16 code units, the way browser clients measure length.
    let length = value.encode_utf16().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be no more than {MAX_PASSWORD_LENGTH} characters long"
        ));
    }
    Ok(())
}

/// Rejects blank values with `"{label} is required"`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Presence(pub &'static str);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Email;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Password;

pub const fn presence(label: &'static str) -> Presence {
    Presence(label)
}

pub const fn email() -> Email {
    Email
}

pub const fn password() -> Password {
    Password
}

impl<T, L> FieldValidator<T, L, String> for Presence
where
    L: FieldLens<T, Value = String>,
{
    fn validate(&self, _model: &T, value: &String) -> Result<(), String> {
        check_presence(value, self.0)
    }
}

impl<T, L> FieldValidator<T, L, String> for Email
where
    L: FieldLens<T, Value = String>,
{
    fn validate(&self, _model: &T, value: &String) -> Result<(), String> {
        check_email(value)
    }
}

impl<T, L> FieldValidator<T, L, String> for Password
where
    L: FieldLens<T, Value = String>,
{
    fn validate(&self, _model: &T, value: &String) -> Result<(), String> {
        check_password(value)
    }
}

/// Flags `second` when it equals `first`. Silent while either is empty.
#[derive(Clone, Copy, Debug)]
pub struct MustDiffer<A, B> {
    first: A,
    second: B,
    message: &'static str,
}

/// Flags `confirm` when it differs from `source`. Silent while either is empty.
#[derive(Clone, Copy, Debug)]
pub struct MustMatch<A, B> {
    source: A,
    confirm: B,
    message: &'static str,
}

pub const fn must_differ<A, B>(first: A, second: B, message: &'static str) -> MustDiffer<A, B> {
    MustDiffer {
        first,
        second,
        message,
    }
}

pub const fn must_match<A, B>(source: A, confirm: B, message: &'static str) -> MustMatch<A, B> {
    MustMatch {
        source,
        confirm,
        message,
    }
}

impl<T, A, B> FormValidator<T, String> for MustDiffer<A, B>
where
    A: FieldLens<T, Value = String>,
    B: FieldLens<T, Value = String>,
{
    fn validate(&self, model: &T) -> CrossFieldReport<String> {
        let (first, second) = (self.first.get(model), self.second.get(model));
        let report = CrossFieldReport::new();
        if !first.is_empty() && !second.is_empty() && first == second {
            report.error(self.second.key(), self.message.to_owned())
        } else {
            report.clear(self.second.key())
        }
    }
}

impl<T, A, B> FormValidator<T, String> for MustMatch<A, B>
where
    A: FieldLens<T, Value = String>,
    B: FieldLens<T, Value = String>,
{
    fn validate(&self, model: &T) -> CrossFieldReport<String> {
        let (source, confirm) = (self.source.get(model), self.confirm.get(model));
        let report = CrossFieldReport::new();
        if !source.is_empty() && !confirm.is_empty() && source != confirm {
            report.error(self.confirm.key(), self.message.to_owned())
        } else {
            report.clear(self.confirm.key())
        }
    }
}
