use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use super::EventRouter;

/// Why the listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerExit {
	/// Cancelled by disconnect.
	Cancelled,
	/// The peer closed the socket.
	Closed,
	/// Reading from the socket failed.
	Failed(String),
}

/// Sole reader of the socket: feeds every text frame to the router until the
/// stream ends, errors, or `cancel` fires.
pub async fn listen<S>(mut stream: S, router: Arc<EventRouter>, cancel: CancellationToken) -> ListenerExit
where
	S: Stream<Item = Result<Message, WsError>> + Unpin,
{
	loop {
		let next = tokio::select! {
			biased;
			_ = cancel.cancelled() => return ListenerExit::Cancelled,
			next = stream.next() => next,
		};

		match next {
			Some(Ok(Message::Text(text))) => router.handle_text(&text),
			Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
				Ok(text) => router.handle_text(&text),
				Err(_) => router.logger.debug("websocket", format_args!("dropping non-UTF-8 binary frame")),
			},
			Some(Ok(Message::Close(frame))) => {
				router.logger.info("websocket", format_args!("server closed the socket: {frame:?}"));
				return ListenerExit::Closed;
			}
			Some(Ok(_)) => {}
			Some(Err(err)) => {
				router.logger.error("websocket", format_args!("failed to read from socket: {err}"));
				return ListenerExit::Failed(err.to_string());
			}
			None => return ListenerExit::Closed,
		}
	}
}
