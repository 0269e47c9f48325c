//! Events emitted by the automate endpoint.

use crate::error::{Error, Result};
use crate::sse::Frame;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Event type names the automate service emits.
///
/// Types the SDK does not know about are kept as [`EventType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// `start`
    Start,
    /// `task:setup`
    TaskSetup,
    /// `task:started`
    TaskStarted,
    /// `task:completed`
    TaskCompleted,
    /// `task:aborted`
    TaskAborted,
    /// `task:validated`
    TaskValidated,
    /// `task:validation_error`
    TaskValidationError,
    /// `agent:processing`
    AgentProcessing,
    /// `agent:status`
    AgentStatus,
    /// `agent:step`
    AgentStep,
    /// `agent:action`
    AgentAction,
    /// `agent:reasoned`
    AgentReasoned,
    /// `agent:extracted`
    AgentExtracted,
    /// `agent:waiting`
    AgentWaiting,
    /// `browser:navigated`
    BrowserNavigated,
    /// `browser:action_started`
    BrowserActionStarted,
    /// `browser:action_completed`
    BrowserActionCompleted,
    /// `browser:screenshot_captured`
    BrowserScreenshotCaptured,
    /// `system:debug_compression`
    SystemDebugCompression,
    /// `system:debug_message`
    SystemDebugMessage,
    /// `complete`
    Complete,
    /// `done`
    Done,
    /// `error`
    Error,
    /// Any other type name.
    Other(String),
}

impl EventType {
    /// The wire name of this event type.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Start => "start",
            EventType::TaskSetup => "task:setup",
            EventType::TaskStarted => "task:started",
            EventType::TaskCompleted => "task:completed",
            EventType::TaskAborted => "task:aborted",
            EventType::TaskValidated => "task:validated",
            EventType::TaskValidationError => "task:validation_error",
            EventType::AgentProcessing => "agent:processing",
            EventType::AgentStatus => "agent:status",
            EventType::AgentStep => "agent:step",
            EventType::AgentAction => "agent:action",
            EventType::AgentReasoned => "agent:reasoned",
            EventType::AgentExtracted => "agent:extracted",
            EventType::AgentWaiting => "agent:waiting",
            EventType::BrowserNavigated => "browser:navigated",
            EventType::BrowserActionStarted => "browser:action_started",
            EventType::BrowserActionCompleted => "browser:action_completed",
            EventType::BrowserScreenshotCaptured => "browser:screenshot_captured",
            EventType::SystemDebugCompression => "system:debug_compression",
            EventType::SystemDebugMessage => "system:debug_message",
            EventType::Complete => "complete",
            EventType::Done => "done",
            EventType::Error => "error",
            EventType::Other(name) => name.as_str(),
        }
    }

    /// Whether this is one of the types the SDK knows about.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            "start" => EventType::Start,
            "task:setup" => EventType::TaskSetup,
            "task:started" => EventType::TaskStarted,
            "task:completed" => EventType::TaskCompleted,
            "task:aborted" => EventType::TaskAborted,
            "task:validated" => EventType::TaskValidated,
            "task:validation_error" => EventType::TaskValidationError,
            "agent:processing" => EventType::AgentProcessing,
            "agent:status" => EventType::AgentStatus,
            "agent:step" => EventType::AgentStep,
            "agent:action" => EventType::AgentAction,
            "agent:reasoned" => EventType::AgentReasoned,
            "agent:extracted" => EventType::AgentExtracted,
            "agent:waiting" => EventType::AgentWaiting,
            "browser:navigated" => EventType::BrowserNavigated,
            "browser:action_started" => EventType::BrowserActionStarted,
            "browser:action_completed" => EventType::BrowserActionCompleted,
            "browser:screenshot_captured" => EventType::BrowserScreenshotCaptured,
            "system:debug_compression" => EventType::SystemDebugCompression,
            "system:debug_message" => EventType::SystemDebugMessage,
            "complete" => EventType::Complete,
            "done" => EventType::Done,
            "error" => EventType::Error,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped event payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventData(Value);

impl EventData {
    /// Look up a key. A snake_case key also matches its camelCase form, so
    /// `extracted_data` finds `extractedData`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let map = self.0.as_object()?;
        map.get(key).or_else(|| map.get(&to_camel_case(key)))
    }

    /// Look up a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The raw payload.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the raw payload.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Deserialize the payload into a caller-defined type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}

impl From<Value> for EventData {
    fn from(value: Value) -> Self {
        EventData(value)
    }
}

fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Payload of `task:completed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompleted {
    /// The agent's final answer.
    #[serde(default, alias = "final_answer")]
    pub final_answer: Option<Value>,
    /// Whether the task succeeded.
    #[serde(default)]
    pub success: Option<bool>,
}

impl TaskCompleted {
    /// The final answer when it is plain text.
    pub fn final_answer_text(&self) -> Option<&str> {
        self.final_answer.as_ref().and_then(Value::as_str)
    }
}

/// Payload of `agent:extracted`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentExtracted {
    /// Data extracted from the page.
    #[serde(default, alias = "extracted_data")]
    pub extracted_data: Value,
}

/// Payload of `agent:action`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentAction {
    /// Action name, e.g. `click`.
    #[serde(default)]
    pub action: Option<String>,
    /// Remaining action parameters.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Payload of `browser:navigated`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowserNavigated {
    /// URL navigated to.
    #[serde(default)]
    pub url: Option<String>,
    /// Page title.
    #[serde(default)]
    pub title: Option<String>,
}

/// Payload of `error`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorDetails {
    /// Error value as sent by the service.
    #[serde(default)]
    pub error: Option<Value>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorDetails {
    /// Best-effort description of the error.
    pub fn text(&self) -> Option<String> {
        match (&self.error, &self.message) {
            (Some(Value::String(s)), _) => Some(s.clone()),
            (_, Some(m)) => Some(m.clone()),
            (Some(other), None) => Some(other.to_string()),
            (None, None) => None,
        }
    }
}

/// Typed view of an event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// `task:completed`
    TaskCompleted(TaskCompleted),
    /// `agent:extracted`
    AgentExtracted(AgentExtracted),
    /// `agent:action`
    AgentAction(AgentAction),
    /// `browser:navigated`
    BrowserNavigated(BrowserNavigated),
    /// `error`
    Error(ErrorDetails),
    /// Every other event type, known or not.
    Other(EventData),
}

/// One event from the automate stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomateEvent {
    /// Event type.
    pub event_type: EventType,
    /// Raw payload.
    pub data: EventData,
    /// Typed payload.
    pub payload: EventPayload,
}

impl AutomateEvent {
    /// Decode a dispatched SSE frame.
    ///
    /// The event type is the `type` key of the JSON data, falling back to the
    /// frame's `event` field. When the data is an envelope of the form
    /// `{"type": "...", "data": {...}}` the inner `data` is the payload.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let json: Value = serde_json::from_str(&frame.data).map_err(|e| {
            Error::stream_decode(format!("data is not valid JSON: {}", e), &frame.raw)
        })?;

        let json_type = json.get("type").and_then(Value::as_str).map(str::to_string);
        let type_name = json_type
            .or_else(|| frame.event.clone())
            .ok_or_else(|| Error::stream_decode("event has no type", &frame.raw))?;

        let payload_value = match json {
            Value::Object(mut map)
                if map.get("type").is_some_and(Value::is_string)
                    && map.get("data").is_some_and(Value::is_object) =>
            {
                map.remove("data").unwrap_or_default()
            }
            other => other,
        };

        let event_type = EventType::from(type_name.as_str());
        let data = EventData::from(payload_value);
        let payload = typed_payload(&event_type, &data)
            .map_err(|e| {
                Error::stream_decode(
                    format!("payload for '{}' has an unexpected shape: {}", event_type, e),
                    &frame.raw,
                )
            })?;

        Ok(AutomateEvent {
            event_type,
            data,
            payload,
        })
    }
}

fn typed_payload(
    event_type: &EventType,
    data: &EventData,
) -> std::result::Result<EventPayload, serde_json::Error> {
    fn typed<T: DeserializeOwned>(data: &EventData) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_value(data.as_value().clone())
    }

    Ok(match event_type {
        EventType::TaskCompleted => EventPayload::TaskCompleted(typed(data)?),
        EventType::AgentExtracted => EventPayload::AgentExtracted(typed(data)?),
        EventType::AgentAction => EventPayload::AgentAction(typed(data)?),
        EventType::BrowserNavigated => EventPayload::BrowserNavigated(typed(data)?),
        EventType::Error => EventPayload::Error(typed(data)?),
        _ => EventPayload::Other(data.clone()),
    })
}
