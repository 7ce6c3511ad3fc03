use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use lcu_runtime::{
	ClientConfig, ConnectionManager, ConnectionState, Credentials, EndpointLogger, Error, Event, EventRouter, EventType,
	ListenerExit, Logger, Method, RequestGateway, Response, Result, TracingLogger,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// High-level handle to the local client API.
///
/// Wraps a [`ConnectionManager`] and adds HTTP verb shorthands. Cloning is
/// not supported; share it behind an `Arc` when several tasks need it.
pub struct Client {
	manager: ConnectionManager,
	logger: Arc<dyn Logger>,
}

impl Client {
	/// Builds a client with the default logger.
	///
	/// When `debug` is set or a `log_dir` is configured, per-endpoint log
	/// files are written under that directory (`logs` by default).
	pub fn new(config: ClientConfig) -> Result<Self> {
		let logger: Arc<dyn Logger> = match config.effective_log_dir() {
			Some(dir) => {
				debug!(target: "lcu", dir = %dir.display(), "writing endpoint logs");
				Arc::new(EndpointLogger::new(dir, config.debug)?)
			}
			None => Arc::new(TracingLogger::new(config.debug)),
		};
		Self::with_logger(config, logger)
	}

	/// Builds a client that writes through `logger` instead of the default.
	pub fn with_logger(config: ClientConfig, logger: Arc<dyn Logger>) -> Result<Self> {
		let manager = ConnectionManager::new(config, Arc::clone(&logger))?;
		Ok(Self { manager, logger })
	}

	/// Builds a client from `LCU_*` environment variables.
	pub fn from_env() -> Result<Self> {
		Self::new(ClientConfig::from_env())
	}

	pub async fn connect(&self) -> Result<()> {
		self.manager.connect().await
	}

	pub async fn disconnect(&self) -> Result<()> {
		self.manager.disconnect().await
	}

	pub fn state(&self) -> ConnectionState {
		self.manager.state()
	}

	pub fn is_connected(&self) -> bool {
		self.manager.is_connected()
	}

	pub fn credentials(&self) -> Option<Credentials> {
		self.manager.credentials()
	}

	pub fn config(&self) -> &ClientConfig {
		self.manager.config()
	}

	pub fn logger(&self) -> &Arc<dyn Logger> {
		&self.logger
	}

	pub fn manager(&self) -> &ConnectionManager {
		&self.manager
	}

	pub fn router(&self) -> &Arc<EventRouter> {
		self.manager.router()
	}

	pub fn gateway(&self) -> Result<Arc<RequestGateway>> {
		self.manager.gateway()
	}

	/// Waits for the socket listener of the current session to stop.
	pub async fn listener_exit(&self) -> Option<ListenerExit> {
		self.manager.listener_exit().await
	}

	pub async fn request(&self, method: Method, path: &str, body: Option<Bytes>) -> Result<Response> {
		self.manager.request(method, path, body).await
	}

	pub async fn get(&self, path: &str) -> Result<Response> {
		self.request(Method::GET, path, None).await
	}

	pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
		self.request(Method::POST, path, Some(encode(body)?)).await
	}

	pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
		self.request(Method::PUT, path, Some(encode(body)?)).await
	}

	pub async fn delete(&self, path: &str) -> Result<Response> {
		self.request(Method::DELETE, path, None).await
	}

	/// GETs `path` and decodes a successful JSON body.
	pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
		decode(path, self.get(path).await?)
	}

	pub fn subscribe<F, Fut>(&self, topic: &str, types: &[EventType], handler: F) -> Result<()>
	where
		F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		self.router().subscribe(topic, types, handler)
	}

	pub fn subscribe_to_all<F, Fut>(&self, handler: F) -> Result<()>
	where
		F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		self.router().subscribe_to_all(handler)
	}

	pub fn unsubscribe(&self, topic: &str) -> Result<()> {
		self.router().unsubscribe(topic)
	}
}

impl std::fmt::Debug for Client {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Client").field("manager", &self.manager).finish_non_exhaustive()
	}
}

fn encode<T: Serialize + ?Sized>(body: &T) -> Result<Bytes> {
	Ok(Bytes::from(serde_json::to_vec(body)?))
}

/// Maps non-2xx responses to [`Error::Status`] and decodes the rest.
pub(crate) fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
	if !response.is_success() {
		return Err(Error::Status {
			path: path.to_string(),
			status: response.status.as_u16(),
		});
	}
	response.json()
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use bytes::Bytes;
	use lcu_runtime::StatusCode;
	use lcu_runtime::header::HeaderMap;
	use serde_json::{Value, json};

	use super::*;

	fn response(status: StatusCode, body: &'static str) -> Response {
		Response {
			status,
			headers: HeaderMap::new(),
			body: Bytes::from_static(body.as_bytes()),
		}
	}

	#[test]
	fn decode_maps_failure_status() {
		let err = decode::<Value>("/lol-lobby/v2/lobby", response(StatusCode::NOT_FOUND, "{}")).unwrap_err();
		match err {
			Error::Status { path, status } => {
				assert_eq!(path, "/lol-lobby/v2/lobby");
				assert_eq!(status, 404);
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn decode_parses_success_body() {
		let value: Value = decode("/x", response(StatusCode::OK, r#"{"phase":"Lobby"}"#)).unwrap();
		assert_eq!(value, json!({"phase": "Lobby"}));
	}

	#[test]
	fn encode_serialises_json() {
		assert_eq!(encode(&json!({"queueId": 420})).unwrap(), Bytes::from_static(br#"{"queueId":420}"#));
	}

	#[tokio::test]
	async fn requests_need_a_session() {
		let client = Client::new(ClientConfig::default()).unwrap();
		assert_eq!(client.state(), ConnectionState::Disconnected);
		assert!(matches!(client.get("/lol-chat/v1/friends").await, Err(Error::NotConnected)));
		assert!(matches!(client.gateway(), Err(Error::NotConnected)));
		client.disconnect().await.unwrap();
	}

	#[tokio::test]
	async fn default_logger_is_plain_tracing() {
		let client = Client::new(ClientConfig::default()).unwrap();
		assert!(client.logger().closer().is_none());
	}

	#[tokio::test]
	async fn debug_mode_writes_endpoint_logs() {
		let dir = tempfile::tempdir().unwrap();
		let config = ClientConfig {
			debug: true,
			log_dir: Some(dir.path().join("logs")),
			timeout: Duration::from_secs(1),
			..ClientConfig::default()
		};
		let client = Client::new(config).unwrap();

		assert!(client.logger().closer().is_some());
		client.logger().info("/lol-gameflow/v1/session", format_args!("phase changed"));
		assert!(dir.path().join("logs").join("_lol-gameflow_v1_session.log").exists());
	}

	#[tokio::test]
	async fn subscription_without_session_still_registers() {
		let client = Client::new(ClientConfig::default()).unwrap();
		let result = client.subscribe("/lol-lobby/v2/lobby", &[EventType::Create], |_event| async { anyhow::Ok(()) });

		assert!(matches!(result, Err(Error::NotConnected)));
		assert_eq!(client.router().handler_count("/lol-lobby/v2/lobby"), 1);
	}
}
