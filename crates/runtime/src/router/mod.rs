//! Subscription registry and pub/sub dispatch.
//!
//! `subscribe` registers a handler under its topic and under the catch-all
//! channel, then asks the service for both. Inbound `[8, channel, event]`
//! frames are dispatched as:
//!
//! ```text
//! channel == "OnJsonApiEvent"  ->  handlers[event.uri] ++ handlers["/"]
//! otherwise                    ->  handlers[channel]
//! ```
//!
//! Each matching handler runs as its own task on the router's [`TaskTracker`].
//! There is no ordering between handlers and no deduplication.

mod handlers;
mod listener;

#[cfg(test)]
mod tests;

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use lcu_protocol::{CATCH_ALL_CHANNEL, Command, Event, EventType, Frame, ROOT_TOPIC, decode_frame, parse_frame};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::task::TaskTracker;

pub use handlers::{EventFilter, HandlerEntry, HandlerFn, HandlerFuture, HandlerId, next_handler_id};
pub use listener::{ListenerExit, listen};

use crate::error::{Error, Result};
use crate::logging::Logger;

const FRAME_TAP_CAPACITY: usize = 256;

/// Routes inbound events to registered handlers and sends subscription commands.
pub struct EventRouter {
	registry: RwLock<HashMap<String, Vec<HandlerEntry>>>,
	outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
	tasks: TaskTracker,
	frames: broadcast::Sender<Value>,
	logger: Arc<dyn Logger>,
}

impl EventRouter {
	pub fn new(logger: Arc<dyn Logger>) -> Self {
		let (frames, _) = broadcast::channel(FRAME_TAP_CAPACITY);
		Self {
			registry: RwLock::new(HashMap::new()),
			outbound: Mutex::new(None),
			tasks: TaskTracker::new(),
			frames,
			logger,
		}
	}

	/// Registers `handler` for `topic`, accepting only `types`.
	///
	/// The filter is validated before anything is registered. With no live
	/// session the handler stays registered and `Error::NotConnected` is
	/// returned.
	pub fn subscribe<F, Fut>(&self, topic: &str, types: &[EventType], handler: F) -> Result<()>
	where
		F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		let filter = EventFilter::from_types(types)?;
		let handler: HandlerFn = Arc::new(move |event| -> HandlerFuture { Box::pin(handler(event)) });
		let entry = HandlerEntry::new(filter, handler);

		{
			let mut registry = self.registry.write();
			registry.entry(topic.to_string()).or_default().push(entry.clone());
			registry.entry(CATCH_ALL_CHANNEL.to_string()).or_default().push(entry);
		}

		self.send(Command::Subscribe(topic.to_string()))?;
		self.send(Command::Subscribe(CATCH_ALL_CHANNEL.to_string()))
	}

	/// Subscribes to the root topic with every event type.
	pub fn subscribe_to_all<F, Fut>(&self, handler: F) -> Result<()>
	where
		F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		self.subscribe(ROOT_TOPIC, &EventType::FILTERABLE, handler)
	}

	/// Drops every handler under `topic` and sends `[6, topic]`.
	///
	/// Entries these handlers registered under the catch-all channel stay and
	/// are never freed, so `handler_count(CATCH_ALL_CHANNEL)` only grows over
	/// the router's lifetime. They are not consulted by dispatch, which looks
	/// up the event `uri` and the root topic.
	pub fn unsubscribe(&self, topic: &str) -> Result<()> {
		self.registry.write().remove(topic);
		self.send(Command::Unsubscribe(topic.to_string()))
	}

	/// Number of handlers registered under `topic`.
	pub fn handler_count(&self, topic: &str) -> usize {
		self.registry.read().get(topic).map_or(0, Vec::len)
	}

	/// Registered topics, sorted.
	pub fn topics(&self) -> Vec<String> {
		let mut topics: Vec<String> = self.registry.read().keys().cloned().collect();
		topics.sort();
		topics
	}

	/// Tap on every inbound frame array, before event decoding.
	pub fn frames(&self) -> broadcast::Receiver<Value> {
		self.frames.subscribe()
	}

	/// Tracker of in-flight handler tasks.
	pub fn tasks(&self) -> &TaskTracker {
		&self.tasks
	}

	pub fn is_attached(&self) -> bool {
		self.outbound.lock().is_some()
	}

	pub(crate) fn attach(&self, outbound: mpsc::UnboundedSender<Message>) {
		*self.outbound.lock() = Some(outbound);
	}

	pub(crate) fn detach(&self) -> Option<mpsc::UnboundedSender<Message>> {
		self.outbound.lock().take()
	}

	/// Detaches only if `outbound` is still the attached channel.
	pub(crate) fn detach_if_current(&self, outbound: &mpsc::UnboundedSender<Message>) {
		let mut slot = self.outbound.lock();
		if slot.as_ref().is_some_and(|current| current.same_channel(outbound)) {
			*slot = None;
		}
	}

	fn send(&self, command: Command) -> Result<()> {
		let text = command.encode();
		let outbound = self.outbound.lock();
		let Some(tx) = outbound.as_ref() else {
			return Err(Error::NotConnected);
		};
		self.logger.debug("websocket", format_args!("sending {text}"));
		tx.send(Message::Text(text)).map_err(|_| Error::NotConnected)
	}

	/// Handles one text frame from the socket. Malformed frames are logged and dropped.
	pub fn handle_text(&self, text: &str) {
		let elements = match parse_frame(text) {
			Ok(elements) => elements,
			Err(err) => {
				self.logger.debug("websocket", format_args!("dropping frame: {err}"));
				return;
			}
		};

		if self.frames.receiver_count() > 0 {
			let _ = self.frames.send(Value::Array(elements.clone()));
		}

		match decode_frame(&elements) {
			Ok(Frame::Event { channel, event }) => {
				self.dispatch(&channel, event);
			}
			Ok(Frame::Other { .. }) => {}
			Err(err) => self.logger.debug("websocket", format_args!("dropping frame: {}", Error::from(err))),
		}
	}

	/// Spawns every handler that should see `event` and returns how many ran.
	pub fn dispatch(&self, channel: &str, event: Event) -> usize {
		let targets: Vec<HandlerEntry> = {
			let registry = self.registry.read();
			let keys = if channel == CATCH_ALL_CHANNEL {
				vec![event.uri.as_str(), ROOT_TOPIC]
			} else {
				vec![channel]
			};
			keys.into_iter()
				.filter_map(|key| registry.get(key))
				.flatten()
				.filter(|entry| entry.filter.accepts(&event.event_type))
				.cloned()
				.collect()
		};

		let event = Arc::new(event);
		for entry in &targets {
			self.spawn_handler(entry, Arc::clone(&event));
		}
		targets.len()
	}

	fn spawn_handler(&self, entry: &HandlerEntry, event: Arc<Event>) {
		let id = entry.id;
		let handler = Arc::clone(&entry.handler);
		let logger = Arc::clone(&self.logger);
		let scope = event.uri.clone();

		self.tasks.spawn(async move {
			let invocation = AssertUnwindSafe(async move { handler(event).await }).catch_unwind();
			match invocation.await {
				Ok(Ok(())) => {}
				Ok(Err(err)) => logger.error(&scope, format_args!("handler {id} failed: {err:#}")),
				Err(panic) => logger.error(&scope, format_args!("handler {id} panicked: {}", panic_message(&*panic))),
			}
		});
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
	if let Some(msg) = panic.downcast_ref::<&str>() {
		msg
	} else if let Some(msg) = panic.downcast_ref::<String>() {
		msg
	} else {
		"non-string panic payload"
	}
}

impl std::fmt::Debug for EventRouter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventRouter")
			.field("topics", &self.topics())
			.field("attached", &self.is_attached())
			.field("in_flight", &self.tasks.len())
			.finish()
	}
}
