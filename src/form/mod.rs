mod controller;
mod debounce;
mod errors;
mod settings;
mod submit;
mod validation;


pub use calmform_derive::FormModel;
pub use controller::{
    DEFAULT_DEBOUNCE_DELAY, FieldKey, FormController, FormError, FormId, FormOptions, FormResult,
    FormSnapshot, SubmitState,
};
pub use debounce::ThreadSpawner;
pub use errors::{CrossFieldReport, ErrorSource, FieldError, FormErrors, ValidationError};
pub use settings::{ApiMessages, FormSettings};
pub use submit::{
    FailureKind, HttpFailure, SubmitAction, SubmitFailure, SubmitOutcome, api_error_message,
};
pub use validation::{FieldLens, FieldValidator, FormModel, FormValidator};
