pub use crate::form::{
    CrossFieldReport, FieldKey, FieldLens, FormController, FormError, FormErrors, FormModel,
    FormOptions, FormResult, FormSettings, HttpFailure, SubmitFailure, SubmitOutcome,
    ValidationError,
};
pub use crate::rules::{email, must_differ, must_match, password, presence};
