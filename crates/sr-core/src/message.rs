//! Inter-context messages
//!
//! The options page and popup tell the background about rule edits with
//! `{ "action": "updateRules" }`; `{ "action": "getRules" }` asks for the
//! background's cached rule list.

use std::sync::mpsc::Sender;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::NotifyError;
use crate::rule::Rule;

pub const ACTION_UPDATE_RULES: &str = "updateRules";
pub const ACTION_GET_RULES: &str = "getRules";

/// A message addressed to the background context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Rules were persisted; reload the cache
    UpdateRules,
    /// Return the cached rules
    GetRules,
    /// Any other action; ignored
    Unknown(String),
}

impl Message {
    /// Interpret a `{ action: ... }` object.
    pub fn from_json(value: &Value) -> Self {
        match value.get("action").and_then(Value::as_str) {
            Some(ACTION_UPDATE_RULES) => Self::UpdateRules,
            Some(ACTION_GET_RULES) => Self::GetRules,
            Some(other) => Self::Unknown(other.to_string()),
            None => Self::Unknown(String::new()),
        }
    }

    pub fn action(&self) -> &str {
        match self {
            Self::UpdateRules => ACTION_UPDATE_RULES,
            Self::GetRules => ACTION_GET_RULES,
            Self::Unknown(action) => action,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "action": self.action() })
    }
}

/// Reply from the background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// `{ "success": true }`
    Success { success: bool },
    /// `{ "rules": [...] }`
    Rules { rules: Vec<Rule> },
}

impl Response {
    pub fn success() -> Self {
        Self::Success { success: true }
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// Sends messages to the background context.
pub trait Notifier {
    fn notify(&self, message: Message) -> Result<(), NotifyError>;
}

impl<F> Notifier for F
where
    F: Fn(Message) -> Result<(), NotifyError>,
{
    fn notify(&self, message: Message) -> Result<(), NotifyError> {
        self(message)
    }
}

/// Channel into a [`Background`](crate::background::Background) inbox.
#[derive(Debug, Clone)]
pub struct Messenger {
    tx: Sender<Message>,
}

impl Messenger {
    pub(crate) fn new(tx: Sender<Message>) -> Self {
        Self { tx }
    }
}

impl Notifier for Messenger {
    fn notify(&self, message: Message) -> Result<(), NotifyError> {
        let action = message.action().to_string();
        self.tx
            .send(message)
            .map_err(|_| NotifyError(format!("background is gone, dropped '{}'", action)))
    }
}
