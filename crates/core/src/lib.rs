//! lcu: Rust client for the League Client local API
//!
//! Discovers the running client, opens an authenticated HTTPS + WebSocket
//! session, and routes pub/sub events to async handlers.
//!
//! # Example
//!
//! ```ignore
//! use lcu::{Client, ClientConfig, EventType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig { await_connection: true, ..Default::default() })?;
//!     client.connect().await?;
//!
//!     let summoner = client.current_summoner().await?;
//!     println!("signed in as {}", summoner.riot_id());
//!
//!     client.subscribe("/lol-lobby/v2/lobby", &[EventType::Create, EventType::Delete], |event| async move {
//!         println!("{} {}", event.event_type, event.uri);
//!         Ok(())
//!     })?;
//!     client.subscribe_to_game_phase(|phase| println!("phase: {phase}"))?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod phase;
mod summoner;

pub use client::Client;
pub use lcu_protocol::{CATCH_ALL_CHANNEL, ROOT_TOPIC};
pub use lcu_runtime::{
	ClientConfig, CloseLogs, ConnectionState, Credentials, EndpointLogger, Error, Event, EventFilter, EventType, Level,
	ListenerExit, Logger, Method, Response, Result, StatusCode, TracingLogger,
};
pub use phase::{GAMEFLOW_SESSION, GamePhase};
pub use summoner::Summoner;
