//! Pluggable log sink used by the runtime.
//!
//! Every component logs through a shared [`Logger`]. The `scope` argument is
//! the endpoint or topic a message concerns (`/lol-gameflow/v1/session`) and
//! is empty for messages about the session as a whole.
//!
//! Sinks that hold resources expose them through [`Logger::closer`]; the
//! connection manager asks for it on disconnect instead of assuming every
//! sink needs cleanup.

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
	Debug,
	Info,
	Error,
}

impl Level {
	pub fn as_str(self) -> &'static str {
		match self {
			Level::Debug => "DEBUG",
			Level::Info => "INFO",
			Level::Error => "ERROR",
		}
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Releases resources held by a logger.
pub trait CloseLogs: Send + Sync {
	fn close(&self);
}

/// Log sink shared by every runtime component.
pub trait Logger: Send + Sync {
	fn log(&self, level: Level, scope: &str, args: fmt::Arguments<'_>);

	fn debug(&self, scope: &str, args: fmt::Arguments<'_>) {
		self.log(Level::Debug, scope, args);
	}

	fn info(&self, scope: &str, args: fmt::Arguments<'_>) {
		self.log(Level::Info, scope, args);
	}

	fn error(&self, scope: &str, args: fmt::Arguments<'_>) {
		self.log(Level::Error, scope, args);
	}

	/// Cleanup capability, if this sink holds anything worth releasing.
	fn closer(&self) -> Option<&dyn CloseLogs> {
		None
	}
}

/// Forwards to `tracing` with the scope as a structured field.
///
/// Debug messages are dropped unless `debug` is set, so that request tracing
/// stays quiet even under a permissive subscriber filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
	pub debug: bool,
}

impl TracingLogger {
	pub fn new(debug: bool) -> Self {
		Self { debug }
	}
}

impl Logger for TracingLogger {
	fn log(&self, level: Level, scope: &str, args: fmt::Arguments<'_>) {
		match level {
			Level::Debug if self.debug => debug!(target: "lcu", scope, "{args}"),
			Level::Debug => {}
			Level::Info => info!(target: "lcu", scope, "{args}"),
			Level::Error => error!(target: "lcu", scope, "{args}"),
		}
	}
}

/// Writes one append-only file per scope under a log directory.
///
/// Scope `/lol-gameflow/v1/session` lands in `_lol-gameflow_v1_session.log`;
/// the empty scope lands in `root.log`. Messages are mirrored to `tracing`.
pub struct EndpointLogger {
	dir: PathBuf,
	mirror: TracingLogger,
	files: Mutex<HashMap<String, File>>,
}

impl EndpointLogger {
	/// Creates the log directory if needed.
	pub fn new(dir: impl Into<PathBuf>, debug: bool) -> io::Result<Self> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir)?;
		Ok(Self {
			dir,
			mirror: TracingLogger::new(debug),
			files: Mutex::new(HashMap::new()),
		})
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Number of files currently held open.
	pub fn open_files(&self) -> usize {
		self.files.lock().len()
	}

	/// File name used for `scope`.
	pub fn file_name(scope: &str) -> String {
		if scope.is_empty() {
			return "root.log".to_string();
		}
		let stem: String = scope
			.chars()
			.map(|c| match c {
				'/' | '\\' | ':' | '?' | '*' | '"' | '<' | '>' | '|' => '_',
				c => c,
			})
			.collect();
		format!("{stem}.log")
	}

	fn write_line(&self, level: Level, scope: &str, args: fmt::Arguments<'_>) -> io::Result<()> {
		let name = Self::file_name(scope);
		let mut files = self.files.lock();
		let file = match files.entry(name) {
			std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
			std::collections::hash_map::Entry::Vacant(entry) => {
				let path = self.dir.join(entry.key());
				entry.insert(OpenOptions::new().create(true).append(true).open(path)?)
			}
		};
		let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
		writeln!(file, "{timestamp} [{level}] {args}")
	}
}

impl Logger for EndpointLogger {
	fn log(&self, level: Level, scope: &str, args: fmt::Arguments<'_>) {
		if level == Level::Debug && !self.mirror.debug {
			return;
		}
		if let Err(err) = self.write_line(level, scope, args) {
			warn!(target: "lcu", scope, error = %err, "failed to write endpoint log");
		}
		self.mirror.log(level, scope, args);
	}

	fn closer(&self) -> Option<&dyn CloseLogs> {
		Some(self)
	}
}

impl CloseLogs for EndpointLogger {
	fn close(&self) {
		let files: Vec<File> = self.files.lock().drain().map(|(_, file)| file).collect();
		for mut file in files {
			if let Err(err) = file.flush() {
				warn!(target: "lcu", error = %err, "failed to flush endpoint log");
			}
		}
	}
}

impl fmt::Debug for EndpointLogger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EndpointLogger")
			.field("dir", &self.dir)
			.field("debug", &self.mirror.debug)
			.field("open_files", &self.open_files())
			.finish()
	}
}
