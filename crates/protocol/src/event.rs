//! Event payloads carried by `[8, channel, event]` frames.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of state change reported by the local client API.
///
/// The service only documents `Create`, `Update` and `Delete`. Any other
/// string is preserved in [`EventType::Other`] so that newer clients do not
/// break decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
	/// A resource appeared.
	Create,
	/// A resource changed.
	Update,
	/// A resource went away.
	Delete,
	/// Unrecognised type string, kept verbatim.
	Other(String),
}

impl EventType {
	/// The three types a subscription filter may name.
	pub const FILTERABLE: [EventType; 3] = [EventType::Create, EventType::Update, EventType::Delete];

	pub fn as_str(&self) -> &str {
		match self {
			EventType::Create => "Create",
			EventType::Update => "Update",
			EventType::Delete => "Delete",
			EventType::Other(raw) => raw,
		}
	}

	/// Returns `true` for `Create`, `Update` and `Delete`.
	pub fn is_filterable(&self) -> bool {
		!matches!(self, EventType::Other(_))
	}
}

impl From<String> for EventType {
	fn from(raw: String) -> Self {
		match raw.as_str() {
			"Create" => EventType::Create,
			"Update" => EventType::Update,
			"Delete" => EventType::Delete,
			_ => EventType::Other(raw),
		}
	}
}

impl From<&str> for EventType {
	fn from(raw: &str) -> Self {
		EventType::from(raw.to_string())
	}
}

impl From<EventType> for String {
	fn from(event_type: EventType) -> Self {
		match event_type {
			EventType::Other(raw) => raw,
			known => known.as_str().to_string(),
		}
	}
}

impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Envelope of a single pub/sub event.
///
/// `uri` names the endpoint whose state changed; `data` is the new state and
/// is deliberately left untyped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	#[serde(rename = "eventType")]
	pub event_type: EventType,
	pub uri: String,
	#[serde(default)]
	pub data: Value,
}

impl Event {
	pub fn new(event_type: EventType, uri: impl Into<String>, data: Value) -> Self {
		Self {
			event_type,
			uri: uri.into(),
			data,
		}
	}
}
