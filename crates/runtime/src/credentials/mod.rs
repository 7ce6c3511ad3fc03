//! Credential discovery for the running client.
//!
//! Strategies run in order and the first success wins:
//!
//! 1. `<install_path>/lockfile`, from configuration or an earlier process scan
//! 2. Platform lockfile locations
//! 3. Process table scan for `--app-port` / `--remoting-auth-token`
//! 4. Await mode: repeat the process scan every `poll_interval` until the
//!    discovered credentials pass the health check
//!
//! Await mode never gives up on its own; wrap [`CredentialResolver::resolve`]
//! in a timeout to bound it.

mod lockfile;
mod process;


use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, interval_at};

pub use lockfile::{LOCKFILE_NAME, default_lockfile_candidates, parse_lockfile};
pub use process::{ProcessTable, SystemProcessTable, install_dir_from_output, parse_process_output};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::gateway::RequestGateway;
use crate::logging::Logger;
use crate::wsl::host_install_dir;

/// Username the service expects in Basic auth.
pub const AUTH_USER: &str = "riot";

/// Connection secrets for one run of the client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	pub port: u16,
	pub password: String,
	pub protocol: String,
}

impl Credentials {
	pub fn new(port: u16, password: impl Into<String>) -> Self {
		Self {
			port,
			password: password.into(),
			protocol: "https".to_string(),
		}
	}

	/// `<protocol>://127.0.0.1:<port>`
	pub fn base_url(&self) -> String {
		format!("{}://127.0.0.1:{}", self.protocol, self.port)
	}

	/// WebSocket endpoint matching [`Credentials::base_url`].
	pub fn websocket_url(&self) -> String {
		let scheme = if self.protocol.eq_ignore_ascii_case("http") { "ws" } else { "wss" };
		format!("{scheme}://127.0.0.1:{}/", self.port)
	}

	/// `Authorization` header value.
	pub fn authorization(&self) -> String {
		let token = STANDARD.encode(format!("{AUTH_USER}:{}", self.password));
		format!("Basic {token}")
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("port", &self.port)
			.field("password", &"<redacted>")
			.field("protocol", &self.protocol)
			.finish()
	}
}

/// Locates credentials using lockfiles and the process table.
pub struct CredentialResolver {
	config: ClientConfig,
	http: reqwest::Client,
	logger: Arc<dyn Logger>,
	candidates: Vec<PathBuf>,
	processes: Arc<dyn ProcessTable>,
	scan_protocol: String,
	install_path: RwLock<Option<PathBuf>>,
}

impl CredentialResolver {
	pub fn new(config: ClientConfig, http: reqwest::Client, logger: Arc<dyn Logger>) -> Self {
		let install_path = config.install_path.clone();
		Self {
			config,
			http,
			logger,
			candidates: default_lockfile_candidates(),
			processes: Arc::new(SystemProcessTable),
			scan_protocol: "https".to_string(),
			install_path: RwLock::new(install_path),
		}
	}

	/// Replaces the platform lockfile locations.
	pub fn with_lockfile_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
		self.candidates = candidates;
		self
	}

	/// Replaces the process table source.
	pub fn with_process_table(mut self, processes: Arc<dyn ProcessTable>) -> Self {
		self.processes = processes;
		self
	}

	/// Protocol assigned to credentials found by a process scan.
	pub fn with_scan_protocol(mut self, protocol: impl Into<String>) -> Self {
		self.scan_protocol = protocol.into();
		self
	}

	/// Installation directory from configuration or the last process scan.
	pub fn install_path(&self) -> Option<PathBuf> {
		self.install_path.read().clone()
	}

	pub async fn resolve(&self) -> Result<Credentials> {
		if let Some(creds) = self.try_lockfiles() {
			return Ok(creds);
		}

		if let Some(creds) = self.try_process_scan().await {
			return Ok(creds);
		}

		if self.config.await_connection {
			return Ok(self.await_credentials().await);
		}

		Err(Error::Discovery("no running client found via lockfile or process scan".to_string()))
	}

	/// Authenticated health check of the service with the configured timeout.
	pub async fn health_check(&self, credentials: &Credentials) -> bool {
		match RequestGateway::new(self.http.clone(), credentials, false, self.logger.clone()) {
			Ok(gateway) => gateway.is_healthy().await,
			Err(err) => {
				self.logger.debug("health", format_args!("health check skipped: {err}"));
				false
			}
		}
	}

	fn lockfile_paths(&self) -> Vec<PathBuf> {
		let mut paths = Vec::with_capacity(self.candidates.len() + 1);
		if let Some(dir) = self.install_path() {
			paths.push(dir.join(LOCKFILE_NAME));
		}
		paths.extend(self.candidates.iter().cloned());
		paths
	}

	fn try_lockfiles(&self) -> Option<Credentials> {
		for path in self.lockfile_paths() {
			self.logger.debug("lockfile", format_args!("trying {}", path.display()));
			match lockfile::read_lockfile(&path) {
				Ok(Some(creds)) => {
					self.logger.debug("lockfile", format_args!("found valid lockfile at {}", path.display()));
					return Some(creds);
				}
				Ok(None) => self
					.logger
					.debug("lockfile", format_args!("malformed lockfile at {}, skipping", path.display())),
				Err(_) => {}
			}
		}
		None
	}

	async fn try_process_scan(&self) -> Option<Credentials> {
		let output = match self.processes.command_lines().await {
			Ok(output) => output,
			Err(err) => {
				self.logger.debug("process", format_args!("process listing failed: {err}"));
				return None;
			}
		};

		if let Some(dir) = install_dir_from_output(&output) {
			self.remember_install_dir(&dir);
		}

		let (port, password) = parse_process_output(&output)?;
		Some(Credentials {
			port,
			password,
			protocol: self.scan_protocol.clone(),
		})
	}

	fn remember_install_dir(&self, dir: &str) {
		let path = host_install_dir(dir);
		self.logger.debug("process", format_args!("found installation at {}", path.display()));
		*self.install_path.write() = Some(path);
	}

	async fn await_credentials(&self) -> Credentials {
		let poll = self.config.poll_interval.max(Duration::from_millis(1));
		self.logger.debug("connection", format_args!("waiting for the client to start"));

		let mut ticker = interval_at(Instant::now() + poll, poll);
		loop {
			ticker.tick().await;

			let Some(creds) = self.try_process_scan().await else {
				self.logger.debug("connection", format_args!("client not running yet"));
				continue;
			};

			self.logger.debug("connection", format_args!("found port {}, checking health", creds.port));
			if self.health_check(&creds).await {
				self.logger.debug("connection", format_args!("health check passed"));
				return creds;
			}
			self.logger.debug("connection", format_args!("health check failed, still waiting"));
		}
	}
}

impl fmt::Debug for CredentialResolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CredentialResolver")
			.field("candidates", &self.candidates)
			.field("install_path", &self.install_path())
			.finish_non_exhaustive()
	}
}
