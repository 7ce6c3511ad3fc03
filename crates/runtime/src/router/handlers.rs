//! Handler storage for the event router.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lcu_protocol::{Event, EventType};

use crate::error::{Error, Result};

/// Unique identifier for event handlers.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Boxed async handler future.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Handler function: shared event to async `Result<()>`.
pub type HandlerFn = Arc<dyn Fn(Arc<Event>) -> HandlerFuture + Send + Sync>;

/// Accepted event types of one subscription.
///
/// Never empty, and only ever holds `Create`, `Update` and `Delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
	create: bool,
	update: bool,
	delete: bool,
}

impl EventFilter {
	/// Accepts every filterable type.
	pub fn all() -> Self {
		Self {
			create: true,
			update: true,
			delete: true,
		}
	}

	pub fn from_types(types: &[EventType]) -> Result<Self> {
		if types.is_empty() {
			return Err(Error::Subscription(
				"at least one event type must be specified (Create, Update, Delete)".to_string(),
			));
		}

		let mut filter = Self {
			create: false,
			update: false,
			delete: false,
		};
		for event_type in types {
			match event_type {
				EventType::Create => filter.create = true,
				EventType::Update => filter.update = true,
				EventType::Delete => filter.delete = true,
				EventType::Other(raw) => {
					return Err(Error::Subscription(format!(
						"invalid event type {raw:?}; valid types are Create, Update, Delete"
					)));
				}
			}
		}
		Ok(filter)
	}

	pub fn accepts(&self, event_type: &EventType) -> bool {
		match event_type {
			EventType::Create => self.create,
			EventType::Update => self.update,
			EventType::Delete => self.delete,
			EventType::Other(_) => false,
		}
	}
}

/// Registered handler with its filter.
#[derive(Clone)]
pub struct HandlerEntry {
	pub id: HandlerId,
	pub filter: EventFilter,
	pub handler: HandlerFn,
}

impl HandlerEntry {
	pub fn new(filter: EventFilter, handler: HandlerFn) -> Self {
		Self {
			id: next_handler_id(),
			filter,
			handler,
		}
	}
}

impl std::fmt::Debug for HandlerEntry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HandlerEntry")
			.field("id", &self.id)
			.field("filter", &self.filter)
			.finish_non_exhaustive()
	}
}
