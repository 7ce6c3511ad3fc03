//! Error types for the local client API runtime.

use lcu_protocol::ProtocolError;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the local client API.
#[derive(Debug, Error)]
pub enum Error {
	/// No discovery strategy produced usable credentials.
	#[error("Credentials not found: {0}")]
	Discovery(String),

	/// HTTP health check or WebSocket handshake failed.
	#[error("Failed to connect to the local client API: {0}")]
	Connection(String),

	/// Inbound frame could not be decoded.
	#[error("Protocol error: {0}")]
	Protocol(#[from] ProtocolError),

	/// Subscription request was rejected before touching the registry.
	#[error("Invalid subscription: {0}")]
	Subscription(String),

	/// HTTPS request or socket read/write failed.
	#[error("Transport error: {0}")]
	Transport(String),

	/// Endpoint answered with a non-success status.
	#[error("{path} returned HTTP {status}")]
	Status { path: String, status: u16 },

	/// Operation needs a live session.
	#[error("Not connected")]
	NotConnected,

	/// Connect was called on a live session.
	#[error("Already connected")]
	AlreadyConnected,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if credential discovery failed.
	pub fn is_discovery(&self) -> bool {
		matches!(self, Error::Discovery(_))
	}

	/// Returns true if the failure happened on the wire rather than in local state.
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::Transport(_) | Error::Connection(_))
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Error::Transport(err.to_string())
	}
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		Error::Transport(err.to_string())
	}
}
