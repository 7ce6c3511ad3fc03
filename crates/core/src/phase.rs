//! Gameflow phase convenience subscription.

use std::fmt;
use std::sync::Arc;

use lcu_runtime::{Event, EventType, Result};
use serde::{Deserialize, Serialize};

use crate::Client;

/// Topic that publishes the gameflow session, including its `phase`.
pub const GAMEFLOW_SESSION: &str = "/lol-gameflow/v1/session";

/// Phase reported by `/lol-gameflow/v1/session`.
///
/// Unrecognised phase strings are kept verbatim in [`GamePhase::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GamePhase {
	None,
	Lobby,
	Matchmaking,
	ChampSelect,
	InProgress,
	WaitingForStats,
	PreEndOfGame,
	EndOfGame,
	Other(String),
}

impl GamePhase {
	pub fn as_str(&self) -> &str {
		match self {
			Self::None => "None",
			Self::Lobby => "Lobby",
			Self::Matchmaking => "Matchmaking",
			Self::ChampSelect => "ChampSelect",
			Self::InProgress => "InProgress",
			Self::WaitingForStats => "WaitingForStats",
			Self::PreEndOfGame => "PreEndOfGame",
			Self::EndOfGame => "EndOfGame",
			Self::Other(phase) => phase,
		}
	}

	/// Reads `data.phase` from a gameflow event.
	pub fn from_event(event: &Event) -> Option<Self> {
		event.data.get("phase")?.as_str().map(Self::from)
	}
}

impl From<&str> for GamePhase {
	fn from(value: &str) -> Self {
		match value {
			"None" => Self::None,
			"Lobby" => Self::Lobby,
			"Matchmaking" => Self::Matchmaking,
			"ChampSelect" => Self::ChampSelect,
			"InProgress" => Self::InProgress,
			"WaitingForStats" => Self::WaitingForStats,
			"PreEndOfGame" => Self::PreEndOfGame,
			"EndOfGame" => Self::EndOfGame,
			other => Self::Other(other.to_string()),
		}
	}
}

impl From<String> for GamePhase {
	fn from(value: String) -> Self {
		Self::from(value.as_str())
	}
}

impl From<GamePhase> for String {
	fn from(value: GamePhase) -> Self {
		value.as_str().to_string()
	}
}

impl fmt::Display for GamePhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Client {
	/// Calls `handler` with the new phase on every gameflow session update.
	///
	/// Updates without a string `phase` are skipped.
	pub fn subscribe_to_game_phase<F>(&self, handler: F) -> Result<()>
	where
		F: Fn(GamePhase) + Send + Sync + 'static,
	{
		let handler = Arc::new(handler);
		self.subscribe(GAMEFLOW_SESSION, &[EventType::Update], move |event: Arc<Event>| {
			let handler = Arc::clone(&handler);
			async move {
				if event.event_type == EventType::Update {
					if let Some(phase) = GamePhase::from_event(&event) {
						handler(phase);
					}
				}
				anyhow::Ok(())
			}
		})
	}

	/// Current phase via a plain GET.
	pub async fn game_phase(&self) -> Result<GamePhase> {
		self.get_json("/lol-gameflow/v1/gameflow-phase").await
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use lcu_protocol::CATCH_ALL_CHANNEL;
	use lcu_runtime::{ClientConfig, Error};
	use serde_json::json;
	use tokio::sync::mpsc;
	use tokio::time::timeout;

	use super::*;

	#[test]
	fn phases_round_trip_through_strings() {
		assert_eq!(GamePhase::from("ChampSelect"), GamePhase::ChampSelect);
		assert_eq!(GamePhase::from("ReadyCheck"), GamePhase::Other("ReadyCheck".into()));
		assert_eq!(GamePhase::Other("ReadyCheck".into()).to_string(), "ReadyCheck");

		let phase: GamePhase = serde_json::from_value(json!("InProgress")).unwrap();
		assert_eq!(phase, GamePhase::InProgress);
		assert_eq!(serde_json::to_value(GamePhase::EndOfGame).unwrap(), json!("EndOfGame"));
	}

	#[test]
	fn phase_from_event_requires_string() {
		let event = Event::new(EventType::Update, GAMEFLOW_SESSION, json!({"phase": "Lobby"}));
		assert_eq!(GamePhase::from_event(&event), Some(GamePhase::Lobby));

		let event = Event::new(EventType::Update, GAMEFLOW_SESSION, json!({"phase": 3}));
		assert_eq!(GamePhase::from_event(&event), None);

		let event = Event::new(EventType::Update, GAMEFLOW_SESSION, json!(null));
		assert_eq!(GamePhase::from_event(&event), None);
	}

	#[tokio::test]
	async fn phase_handler_sees_updates_only() {
		let client = Client::new(ClientConfig::default()).unwrap();
		let (tx, mut rx) = mpsc::unbounded_channel();

		let registered = client.subscribe_to_game_phase(move |phase| {
			let _ = tx.send(phase);
		});
		assert!(matches!(registered, Err(Error::NotConnected)));

		let router = client.router();
		router.dispatch(
			CATCH_ALL_CHANNEL,
			Event::new(EventType::Create, GAMEFLOW_SESSION, json!({"phase": "Lobby"})),
		);
		router.dispatch(
			CATCH_ALL_CHANNEL,
			Event::new(EventType::Update, GAMEFLOW_SESSION, json!({"phase": "Matchmaking"})),
		);
		router.dispatch(
			CATCH_ALL_CHANNEL,
			Event::new(EventType::Update, GAMEFLOW_SESSION, json!({"gameData": {}})),
		);

		let phase = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
		assert_eq!(phase, GamePhase::Matchmaking);

		router.tasks().close();
		router.tasks().wait().await;
		assert!(rx.try_recv().is_err());
	}
}
