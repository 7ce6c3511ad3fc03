//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between process scans in await mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default timeout for HTTPS requests and the health check.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Log directory used when `debug` is set and no directory was given.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Settings shared by discovery, the HTTPS client, and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Delay between process scans while awaiting the client.
	#[serde(with = "millis")]
	pub poll_interval: Duration,
	/// Timeout for every HTTPS request.
	#[serde(with = "millis")]
	pub timeout: Duration,
	/// Keep polling until a client shows up and answers the health check.
	pub await_connection: bool,
	/// Trace requests and responses through the logger.
	pub debug: bool,
	/// Directory for per-endpoint log files.
	pub log_dir: Option<PathBuf>,
	/// Installation directory checked before any other location.
	pub install_path: Option<PathBuf>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			poll_interval: DEFAULT_POLL_INTERVAL,
			timeout: DEFAULT_TIMEOUT,
			await_connection: false,
			debug: false,
			log_dir: None,
			install_path: None,
		}
	}
}

impl ClientConfig {
	/// Defaults overlaid with `LCU_*` environment variables.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Defaults overlaid with values from `lookup`.
	///
	/// Unparseable values are ignored.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = Self::default();

		if let Some(path) = lookup("LCU_INSTALL_PATH").filter(|v| !v.is_empty()) {
			config.install_path = Some(PathBuf::from(path));
		}
		if let Some(ms) = lookup("LCU_POLL_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
			config.poll_interval = Duration::from_millis(ms);
		}
		if let Some(ms) = lookup("LCU_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
			config.timeout = Duration::from_millis(ms);
		}
		if let Some(flag) = lookup("LCU_AWAIT").and_then(|v| parse_flag(&v)) {
			config.await_connection = flag;
		}
		if let Some(flag) = lookup("LCU_DEBUG").and_then(|v| parse_flag(&v)) {
			config.debug = flag;
		}
		if let Some(dir) = lookup("LCU_LOG_DIR").filter(|v| !v.is_empty()) {
			config.log_dir = Some(PathBuf::from(dir));
		}

		config
	}

	/// Directory the endpoint logger should write to, if any.
	pub fn effective_log_dir(&self) -> Option<PathBuf> {
		match (&self.log_dir, self.debug) {
			(Some(dir), _) => Some(dir.clone()),
			(None, true) => Some(PathBuf::from(DEFAULT_LOG_DIR)),
			(None, false) => None,
		}
	}
}

fn parse_flag(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}

mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
