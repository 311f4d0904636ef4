use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::controller::{DEFAULT_DEBOUNCE_DELAY, FormOptions};

const STATUS_PLACEHOLDER: &str = "{status}";

/// Messages written to the `api` slot when a submit action fails without a
/// usable server message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiMessages {
    /// Template for a response without an `error` member; `{status}` is
    /// replaced with the status code.
    pub request_failed: String,
    pub network: String,
    pub fallback: String,
}

impl ApiMessages {
    pub fn request_failed(&self, status: u16) -> String {
        self.request_failed
            .replace(STATUS_PLACEHOLDER, &status.to_string())
    }
}

impl Default for ApiMessages {
    fn default() -> Self {
        Self {
            request_failed: "Request failed with status code {status}".to_owned(),
            network: "Unable to reach the server. Check your connection and try again".to_owned(),
            fallback: "Something went wrong. Please try again".to_owned(),
        }
    }
}

/// Serializable subset of [`FormOptions`]. Trigger fields are typed keys and
/// are attached in code.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    pub debounce_delay_ms: u64,
    pub messages: ApiMessages,
}

impl FormSettings {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            debounce_delay_ms: DEFAULT_DEBOUNCE_DELAY.as_millis() as u64,
            messages: ApiMessages::default(),
        }
    }
}

impl From<FormSettings> for FormOptions {
    fn from(settings: FormSettings) -> Self {
        FormOptions::default()
            .debounce_delay(Duration::from_millis(settings.debounce_delay_ms))
            .messages(settings.messages)
    }
}
