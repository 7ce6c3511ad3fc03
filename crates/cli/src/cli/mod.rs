
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use lcu::{ClientConfig, EventType};

/// Root CLI for lcu.
#[derive(Parser, Debug)]
#[command(name = "lcu")]
#[command(about = "Talk to the League Client local API")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(flatten)]
	pub connection: ConnectionArgs,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Send one authenticated request and print the response body.
	Request(RequestArgs),
	/// Print events for a topic, or for everything, until interrupted.
	Watch(WatchArgs),
	/// Print gameflow phase changes until interrupted.
	Phase,
	/// Print the signed-in summoner.
	Summoner,
	/// Locate the running client and print its credentials.
	Credentials,
}

/// Flags layered over `LCU_*` environment variables.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
	/// Keep polling until the client is up and healthy.
	#[arg(long = "await", global = true)]
	pub await_connection: bool,

	/// Trace every request and write per-endpoint log files.
	#[arg(long, global = true)]
	pub debug: bool,

	/// Directory for per-endpoint log files.
	#[arg(long, value_name = "DIR", global = true)]
	pub log_dir: Option<PathBuf>,

	/// Client install directory holding the lockfile.
	#[arg(long, value_name = "DIR", global = true)]
	pub install_path: Option<PathBuf>,

	/// Delay between discovery attempts in await mode, in milliseconds.
	#[arg(long, value_name = "MS", global = true)]
	pub poll_interval_ms: Option<u64>,

	/// HTTPS request timeout, in milliseconds.
	#[arg(long, value_name = "MS", global = true)]
	pub timeout_ms: Option<u64>,
}

impl ConnectionArgs {
	/// Applies the flags that were given on top of `base`.
	pub fn apply(&self, mut base: ClientConfig) -> ClientConfig {
		base.await_connection |= self.await_connection;
		base.debug |= self.debug;
		if let Some(dir) = &self.log_dir {
			base.log_dir = Some(dir.clone());
		}
		if let Some(path) = &self.install_path {
			base.install_path = Some(path.clone());
		}
		if let Some(ms) = self.poll_interval_ms {
			base.poll_interval = Duration::from_millis(ms);
		}
		if let Some(ms) = self.timeout_ms {
			base.timeout = Duration::from_millis(ms);
		}
		base
	}
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
	/// HTTP method (GET, POST, PUT, PATCH, DELETE).
	#[arg(value_name = "METHOD")]
	pub method: String,

	/// Endpoint path, for example /lol-summoner/v1/current-summoner.
	#[arg(value_name = "PATH")]
	pub path: String,

	/// JSON request body.
	#[arg(long, short = 'd', value_name = "JSON")]
	pub body: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
	/// Topic to watch. Watches every event when omitted.
	#[arg(value_name = "TOPIC")]
	pub topic: Option<String>,

	/// Event types to accept.
	#[arg(long = "type", short = 't', value_enum, value_delimiter = ',')]
	pub types: Vec<EventKind>,
}

impl WatchArgs {
	/// Requested event types, or all of them when none were given.
	pub fn event_types(&self) -> Vec<EventType> {
		if self.types.is_empty() {
			return EventType::FILTERABLE.to_vec();
		}
		self.types.iter().map(|kind| kind.event_type()).collect()
	}
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
	Create,
	Update,
	Delete,
}

impl EventKind {
	pub fn event_type(self) -> EventType {
		match self {
			Self::Create => EventType::Create,
			Self::Update => EventType::Update,
			Self::Delete => EventType::Delete,
		}
	}
}
