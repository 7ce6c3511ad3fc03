//! LCU Runtime - Credential discovery, connection lifecycle, and event routing
//!
//! This crate provides the runtime infrastructure for talking to the local
//! client API of a running League Client:
//!
//! - **Credentials**: Reading the lockfile or scanning the process table, with
//!   an optional await mode that polls until the client is healthy
//! - **Connection**: One HTTPS client plus one `wamp` WebSocket session
//! - **Routing**: Decoding opcode-8 frames and dispatching them to handlers
//! - **Gateway**: Authenticated HTTP requests with optional tracing
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ ConnectionManager │  Lifecycle and state
//! └─┬───────┬───────┬─┘
//!   │       │       │
//! ┌─▼─────┐ │ ┌─────▼────────┐
//! │Resolver│ │ │RequestGateway│  HTTPS
//! └───────┘ │ └──────────────┘
//!     ┌─────▼─────┐
//!     │EventRouter│  Pub/sub over the socket
//!     └───────────┘
//! ```

pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod router;
pub mod tls;
pub(crate) mod wsl;

// Re-export key types at crate root
pub use config::ClientConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use credentials::{CredentialResolver, Credentials, ProcessTable, SystemProcessTable};
pub use error::{Error, Result};
pub use gateway::{HEALTH_CHECK_PATH, RequestGateway, Response};
pub use lcu_protocol::{Event, EventType};
pub use logging::{CloseLogs, EndpointLogger, Level, Logger, TracingLogger};
pub use reqwest::{Method, StatusCode, header};
pub use router::{EventFilter, EventRouter, ListenerExit};
