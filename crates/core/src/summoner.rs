use lcu_runtime::{HEALTH_CHECK_PATH, Result};
use serde::{Deserialize, Serialize};

use crate::Client;

/// Subset of the current-summoner payload.
///
/// Fields the client omits fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Summoner {
	pub account_id: i64,
	pub summoner_id: i64,
	pub display_name: String,
	pub game_name: String,
	pub tag_line: String,
	pub puuid: String,
	pub profile_icon_id: i64,
	pub summoner_level: u32,
}

impl Summoner {
	/// `gameName#tagLine`, or the display name when no Riot ID is set.
	pub fn riot_id(&self) -> String {
		if self.game_name.is_empty() {
			self.display_name.clone()
		} else {
			format!("{}#{}", self.game_name, self.tag_line)
		}
	}
}

impl Client {
	/// The signed-in summoner.
	pub async fn current_summoner(&self) -> Result<Summoner> {
		self.get_json(HEALTH_CHECK_PATH).await
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn decodes_partial_payload() {
		let summoner: Summoner = serde_json::from_value(json!({
			"accountId": 1,
			"displayName": "",
			"gameName": "Haze",
			"tagLine": "EUW",
			"summonerLevel": 312,
			"rerollPoints": {"currentPoints": 0}
		}))
		.unwrap();

		assert_eq!(summoner.summoner_level, 312);
		assert_eq!(summoner.puuid, "");
		assert_eq!(summoner.riot_id(), "Haze#EUW");
	}

	#[test]
	fn riot_id_falls_back_to_display_name() {
		let summoner = Summoner {
			display_name: "Old Name".into(),
			..Summoner::default()
		};
		assert_eq!(summoner.riot_id(), "Old Name");
	}
}
