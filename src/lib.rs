extern crate self as calmform;

pub mod form;
pub mod prelude;
pub mod rules;

pub use form::{FormController, FormOptions};
