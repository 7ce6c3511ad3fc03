//! Connection lifecycle for one HTTPS client and one pub/sub socket.
//!
//! ```text
//! Disconnected -> Connecting -> (resolve, health check, handshake) -> Connected -> Closing -> Disconnected
//! ```
//!
//! Connect and disconnect are serialised by an async lifecycle lock. A failed
//! connect returns to `Disconnected` and keeps nothing. Subscriptions live in
//! the [`EventRouter`] and survive reconnects, but are not re-sent.

mod websocket;


use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use parking_lot::RwLock;
use reqwest::{Method, StatusCode};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::Connector;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::credentials::{CredentialResolver, Credentials};
use crate::error::{Error, Result};
use crate::gateway::{RequestGateway, Response};
use crate::logging::Logger;
use crate::router::{EventRouter, ListenerExit, listen};
use crate::tls::{http_client, websocket_connector};

/// How long disconnect waits for the writer to flush the close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
	Closing,
}

struct Session {
	outbound: mpsc::UnboundedSender<Message>,
	cancel: CancellationToken,
	listener: JoinHandle<()>,
	writer: JoinHandle<()>,
}

/// Owns the HTTPS client and the pub/sub socket.
pub struct ConnectionManager {
	config: ClientConfig,
	logger: Arc<dyn Logger>,
	http: reqwest::Client,
	connector: Option<Connector>,
	resolver: CredentialResolver,
	router: Arc<EventRouter>,
	state: RwLock<ConnectionState>,
	session: Mutex<Option<Session>>,
	current: RwLock<Option<(Credentials, Arc<RequestGateway>)>>,
	exit: Arc<watch::Sender<Option<ListenerExit>>>,
}

impl ConnectionManager {
	pub fn new(config: ClientConfig, logger: Arc<dyn Logger>) -> Result<Self> {
		let http = http_client(config.timeout)?;
		let resolver = CredentialResolver::new(config.clone(), http.clone(), Arc::clone(&logger));
		let (exit, _) = watch::channel(None);

		Ok(Self {
			router: Arc::new(EventRouter::new(Arc::clone(&logger))),
			connector: Some(websocket_connector()?),
			config,
			logger,
			http,
			resolver,
			state: RwLock::new(ConnectionState::Disconnected),
			session: Mutex::new(None),
			current: RwLock::new(None),
			exit: Arc::new(exit),
		})
	}

	/// Replaces the credential resolver.
	pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
		self.resolver = resolver;
		self
	}

	pub fn state(&self) -> ConnectionState {
		*self.state.read()
	}

	pub fn is_connected(&self) -> bool {
		self.state() == ConnectionState::Connected
	}

	/// Credentials of the live session.
	pub fn credentials(&self) -> Option<Credentials> {
		self.current.read().as_ref().map(|(creds, _)| creds.clone())
	}

	pub fn router(&self) -> &Arc<EventRouter> {
		&self.router
	}

	pub fn resolver(&self) -> &CredentialResolver {
		&self.resolver
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Request gateway of the live session.
	pub fn gateway(&self) -> Result<Arc<RequestGateway>> {
		self.current
			.read()
			.as_ref()
			.map(|(_, gateway)| Arc::clone(gateway))
			.ok_or(Error::NotConnected)
	}

	pub async fn request(&self, method: Method, path: &str, body: Option<Bytes>) -> Result<Response> {
		self.gateway()?.request(method, path, body).await
	}

	/// Resolves credentials, checks HTTPS health, opens the socket, and starts the listener.
	///
	/// A session whose listener already stopped (peer close or read error) is
	/// torn down first, so calling this again is how callers recover.
	pub async fn connect(&self) -> Result<()> {
		let mut slot = self.session.lock().await;
		if let Some(session) = slot.take() {
			if !self.listener_stopped(&session) {
				*slot = Some(session);
				return Err(Error::AlreadyConnected);
			}
			self.logger
				.debug("connection", format_args!("replacing a session whose listener has stopped"));
			self.teardown(session).await;
		}

		self.set_state(ConnectionState::Connecting);
		match self.establish().await {
			Ok(session) => {
				*slot = Some(session);
				Ok(())
			}
			Err(err) => {
				self.logger.error("connection", format_args!("connect failed: {err}"));
				self.set_state(ConnectionState::Disconnected);
				Err(err)
			}
		}
	}

	async fn establish(&self) -> Result<Session> {
		let credentials = self.resolver.resolve().await?;
		let gateway = Arc::new(RequestGateway::new(
			self.http.clone(),
			&credentials,
			self.config.debug,
			Arc::clone(&self.logger),
		)?);

		match gateway.check_health().await {
			Ok(StatusCode::OK) => {}
			Ok(status) => return Err(Error::Connection(format!("HTTP health check returned {status}"))),
			Err(err) => return Err(Error::Connection(format!("HTTP health check failed: {err}"))),
		}

		self.logger
			.debug("websocket", format_args!("connecting to {}", credentials.websocket_url()));
		let socket = websocket::handshake(&credentials, self.connector.clone()).await?;

		self.set_state(ConnectionState::Connected);
		*self.current.write() = Some((credentials.clone(), gateway));
		self.exit.send_replace(None);

		let (sink, stream) = socket.split();
		let (outbound, rx) = mpsc::unbounded_channel();
		let writer = tokio::spawn(websocket::write_loop(sink, rx, Arc::clone(&self.logger)));
		self.router.attach(outbound.clone());

		let cancel = CancellationToken::new();
		let listener = {
			let router = Arc::clone(&self.router);
			let cancel = cancel.clone();
			let exit = Arc::clone(&self.exit);
			let own_outbound = outbound.clone();
			tokio::spawn(async move {
				let reason = listen(stream, Arc::clone(&router), cancel).await;
				if reason != ListenerExit::Cancelled {
					router.detach_if_current(&own_outbound);
				}
				debug!(target: "lcu", reason = ?reason, "listener exited");
				exit.send_replace(Some(reason));
			})
		};

		self.logger
			.info("connection", format_args!("connected to the local client API on port {}", credentials.port));
		info!(target: "lcu", port = credentials.port, "connected");

		Ok(Session {
			outbound,
			cancel,
			listener,
			writer,
		})
	}

	/// Closes the socket, releases logger resources, and drops credentials.
	///
	/// Calling it again, or without a session, is a no-op.
	pub async fn disconnect(&self) -> Result<()> {
		let mut slot = self.session.lock().await;
		if let Some(session) = slot.take() {
			self.teardown(session).await;
		}
		Ok(())
	}

	fn listener_stopped(&self, session: &Session) -> bool {
		session.listener.is_finished() || self.exit.borrow().is_some()
	}

	async fn teardown(&self, session: Session) {
		self.set_state(ConnectionState::Closing);

		let Session {
			outbound,
			cancel,
			listener,
			mut writer,
		} = session;

		self.router.detach();
		let _ = outbound.send(Message::Close(None));
		drop(outbound);

		cancel.cancel();
		listener.abort();
		if timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
			self.logger.debug("websocket", format_args!("writer did not finish closing in time"));
			writer.abort();
		}

		self.exit.send_if_modified(|exit| {
			if exit.is_none() {
				*exit = Some(ListenerExit::Cancelled);
				true
			} else {
				false
			}
		});

		if let Some(closer) = self.logger.closer() {
			closer.close();
		}

		*self.current.write() = None;
		self.set_state(ConnectionState::Disconnected);
		info!(target: "lcu", "disconnected");
	}

	/// Resolves once the current listener has stopped.
	///
	/// Pends until a session has been established.
	pub async fn listener_exit(&self) -> Option<ListenerExit> {
		let mut rx = self.exit.subscribe();
		let exit = rx.wait_for(Option::is_some).await.ok()?;
		exit.clone()
	}

	fn set_state(&self, state: ConnectionState) {
		let previous = std::mem::replace(&mut *self.state.write(), state);
		if previous != state {
			debug!(target: "lcu", from = ?previous, to = ?state, "connection state");
		}
	}
}

impl std::fmt::Debug for ConnectionManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectionManager")
			.field("state", &self.state())
			.field("credentials", &self.credentials())
			.field("router", &self.router)
			.finish_non_exhaustive()
	}
}
