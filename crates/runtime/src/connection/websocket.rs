use std::sync::Arc;

use futures_util::{Sink, SinkExt};
use lcu_protocol::SUBPROTOCOL;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::logging::Logger;

pub(crate) type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the pub/sub socket with Basic auth and the `wamp` sub-protocol.
pub(crate) async fn handshake(credentials: &Credentials, connector: Option<Connector>) -> Result<Socket> {
	let url = credentials.websocket_url();
	let mut request = url
		.as_str()
		.into_client_request()
		.map_err(|e| Error::Connection(format!("invalid WebSocket URL {url}: {e}")))?;

	let auth = HeaderValue::from_str(&credentials.authorization())
		.map_err(|e| Error::Connection(format!("password is not a valid header value: {e}")))?;
	let headers = request.headers_mut();
	headers.insert(AUTHORIZATION, auth);
	headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

	let (socket, _response) = connect_async_tls_with_config(request, None, false, connector)
		.await
		.map_err(|e| Error::Connection(format!("WebSocket handshake with {url} failed: {e}")))?;
	Ok(socket)
}

/// Sole writer of the socket. Stops after forwarding a close frame or when
/// every sender is gone, then closes the sink.
pub(crate) async fn write_loop<S>(mut sink: S, mut outbound: mpsc::UnboundedReceiver<Message>, logger: Arc<dyn Logger>)
where
	S: Sink<Message, Error = WsError> + Unpin,
{
	while let Some(message) = outbound.recv().await {
		let closing = matches!(message, Message::Close(_));
		if let Err(err) = sink.send(message).await {
			logger.error("websocket", format_args!("failed to write to socket: {err}"));
			break;
		}
		if closing {
			break;
		}
	}
	let _ = sink.close().await;
}
