//! The uniform response envelope returned by every API call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Version marker written into every envelope.
pub const API_VERSION: &str = "2.0";

/// Alert text the login endpoint answers with on success.
pub const LOGIN_SUCCESS_TEXT: &str = "Successfully logged in.";

/// Severity of an [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A single human-readable diagnostic attached to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub text: String,
}

impl Alert {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Error,
            text: text.into(),
        }
    }
}

/// Bare alert list, the body of login/logout responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl Alerts {
    pub fn single(alert: Alert) -> Self {
        Self {
            alerts: vec![alert],
        }
    }

    /// Whether an alert with exactly this level and text is present.
    pub fn contains(&self, level: AlertLevel, text: &str) -> bool {
        self.alerts
            .iter()
            .any(|a| a.level == level && a.text == text)
    }

    pub fn has_errors(&self) -> bool {
        self.alerts.iter().any(|a| a.level == AlertLevel::Error)
    }
}

/// What a handler produced, tagged so the envelope wording never needs
/// runtime type inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput<T = Value> {
    /// A read returning zero or more records.
    Collection(Vec<T>),
    /// A create/update/delete, optionally echoing the affected record.
    Mutation { rows_affected: u64, record: Option<T> },
}

impl<T: Serialize> HandlerOutput<T> {
    /// Erase the record type for the wire.
    pub fn into_json(self) -> Result<HandlerOutput<Value>, serde_json::Error> {
        Ok(match self {
            Self::Collection(items) => HandlerOutput::Collection(
                items
                    .into_iter()
                    .map(serde_json::to_value)
                    .collect::<Result<_, _>>()?,
            ),
            Self::Mutation {
                rows_affected,
                record,
            } => HandlerOutput::Mutation {
                rows_affected,
                record: record.map(serde_json::to_value).transpose()?,
            },
        })
    }
}

impl HandlerOutput<Value> {
    /// Wrap a successful result, appending the row count alert.
    pub fn into_envelope(self) -> ApiEnvelope<Value> {
        match self {
            Self::Collection(items) => {
                let text = format!("{} rows returned", items.len());
                ApiEnvelope::success(Value::Array(items), Alert::success(text))
            }
            Self::Mutation {
                rows_affected,
                record,
            } => {
                let text = format!("{} rows affected", rows_affected);
                ApiEnvelope {
                    response: record,
                    alerts: vec![Alert::success(text)],
                    version: API_VERSION.to_string(),
                    error: None,
                }
            }
        }
    }
}

/// The JSON wrapper around every API response.
///
/// On failure `response` is absent and at least one `error` alert is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T = Value> {
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(response: T, alert: Alert) -> Self {
        Self {
            response: Some(response),
            alerts: vec![alert],
            version: API_VERSION.to_string(),
            error: None,
        }
    }

    pub fn failure(err: &Error) -> Self {
        let text = err.to_string();
        Self {
            response: None,
            alerts: vec![Alert::error(text.clone())],
            version: API_VERSION.to_string(),
            error: Some(text),
        }
    }

    /// The alerts of this envelope as a standalone list.
    pub fn alerts(&self) -> Alerts {
        Alerts {
            alerts: self.alerts.clone(),
        }
    }
}
