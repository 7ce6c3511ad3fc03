//! Array-framed pub/sub messages.
//!
//! ```text
//! [5, "<topic>"]                          subscribe
//! [6, "<topic>"]                          unsubscribe
//! [8, "<channel>", {eventType, uri, data}] event
//! ```
//!
//! Any other opcode is decoded as [`Frame::Other`] and ignored by the router.

use serde_json::{Value, json};
use thiserror::Error;

use crate::event::Event;

/// WebSocket sub-protocol token negotiated at handshake time.
pub const SUBPROTOCOL: &str = "wamp";

/// Opcode of a subscribe request.
pub const OP_SUBSCRIBE: u64 = 5;

/// Opcode of an unsubscribe request.
pub const OP_UNSUBSCRIBE: u64 = 6;

/// Opcode of an inbound event.
pub const OP_EVENT: u64 = 8;

/// Channel that aggregates every JSON API event.
pub const CATCH_ALL_CHANNEL: &str = "OnJsonApiEvent";

/// Topic whose handlers see every event delivered on [`CATCH_ALL_CHANNEL`].
pub const ROOT_TOPIC: &str = "/";

/// Outbound control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Subscribe(String),
	Unsubscribe(String),
}

impl Command {
	pub fn opcode(&self) -> u64 {
		match self {
			Command::Subscribe(_) => OP_SUBSCRIBE,
			Command::Unsubscribe(_) => OP_UNSUBSCRIBE,
		}
	}

	pub fn topic(&self) -> &str {
		match self {
			Command::Subscribe(topic) | Command::Unsubscribe(topic) => topic,
		}
	}

	pub fn to_value(&self) -> Value {
		json!([self.opcode(), self.topic()])
	}

	/// Serializes the command to the JSON text sent on the socket.
	pub fn encode(&self) -> String {
		self.to_value().to_string()
	}
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
	/// `[8, channel, event]`
	Event { channel: String, event: Event },
	/// Well-formed array with an opcode the router does not handle.
	Other { opcode: Option<u64> },
}

/// Inbound frame that could not be decoded.
///
/// These are never fatal: the listener logs and drops the frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
	#[error("frame is not valid JSON: {0}")]
	InvalidJson(String),

	#[error("frame is not a JSON array")]
	NotAnArray,

	#[error("event frame has {0} elements, expected at least 3")]
	TooShort(usize),

	#[error("event channel is not a string")]
	ChannelNotString,

	#[error("event payload is not an object")]
	PayloadNotObject,

	#[error("event payload is malformed: {0}")]
	InvalidPayload(String),
}

/// Parses socket text into the raw frame array.
pub fn parse_frame(text: &str) -> Result<Vec<Value>, ProtocolError> {
	let value: Value = serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
	match value {
		Value::Array(elements) => Ok(elements),
		_ => Err(ProtocolError::NotAnArray),
	}
}

/// Classifies a raw frame array.
pub fn decode_frame(elements: &[Value]) -> Result<Frame, ProtocolError> {
	let opcode = elements.first().and_then(Value::as_u64);
	if opcode != Some(OP_EVENT) {
		return Ok(Frame::Other { opcode });
	}

	if elements.len() < 3 {
		return Err(ProtocolError::TooShort(elements.len()));
	}

	let channel = elements[1].as_str().ok_or(ProtocolError::ChannelNotString)?;
	if !elements[2].is_object() {
		return Err(ProtocolError::PayloadNotObject);
	}

	let event: Event =
		serde_json::from_value(elements[2].clone()).map_err(|e| ProtocolError::InvalidPayload(e.to_string()))?;

	Ok(Frame::Event {
		channel: channel.to_string(),
		event,
	})
}

/// Parses and classifies socket text in one step.
pub fn decode(text: &str) -> Result<Frame, ProtocolError> {
	decode_frame(&parse_frame(text)?)
}
