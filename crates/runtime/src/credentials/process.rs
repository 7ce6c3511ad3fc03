use std::io;
use std::sync::LazyLock;

use futures_util::future::BoxFuture;
use regex::Regex;
use tokio::process::Command;

use crate::wsl::under_wsl;

const CLIENT_PROCESS: &str = "LeagueClientUx";

static APP_PORT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--app-port=(\d+)").unwrap());
static AUTH_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--remoting-auth-token=([\w-]+)").unwrap());
static WINDOWS_EXE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+\\LeagueClientUx\.exe)""#).unwrap());
static MACOS_EXE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"/Applications/League of Legends\.app/Contents/LoL/LeagueClientUx").unwrap());

/// Source of process command lines.
pub trait ProcessTable: Send + Sync {
	fn command_lines(&self) -> BoxFuture<'_, io::Result<String>>;
}

/// Lists processes with the platform tool.
///
/// Windows and WSL use `wmic` filtered to the client executable; other
/// platforms use `ps -A -o command` narrowed to client lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
	fn command_lines(&self) -> BoxFuture<'_, io::Result<String>> {
		Box::pin(async move {
			let (program, args, filter) = listing_command();
			let output = Command::new(program).args(args).kill_on_drop(true).output().await?;
			if !output.status.success() {
				return Err(io::Error::other(format!("{program} exited with {}", output.status)));
			}

			let text = String::from_utf8_lossy(&output.stdout).into_owned();
			Ok(if filter { client_lines(&text) } else { text })
		})
	}
}

fn listing_command() -> (&'static str, &'static [&'static str], bool) {
	const WMIC_ARGS: &[&str] = &["PROCESS", "WHERE", "name='LeagueClientUx.exe'", "GET", "commandline"];
	const PS_ARGS: &[&str] = &["-A", "-o", "command"];

	if cfg!(windows) {
		("wmic", WMIC_ARGS, false)
	} else if !cfg!(target_os = "macos") && under_wsl() {
		("wmic.exe", WMIC_ARGS, false)
	} else {
		("ps", PS_ARGS, true)
	}
}

fn client_lines(output: &str) -> String {
	output
		.lines()
		.filter(|line| line.contains(CLIENT_PROCESS))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Extracts `(port, token)` from `--app-port` and `--remoting-auth-token`.
pub fn parse_process_output(output: &str) -> Option<(u16, String)> {
	let port = APP_PORT_RE.captures(output)?.get(1)?.as_str().parse().ok()?;
	let token = AUTH_TOKEN_RE.captures(output)?.get(1)?.as_str().to_string();
	Some((port, token))
}

/// Directory holding the client executable, when the listing reveals it.
///
/// Windows paths are returned verbatim (`C:\Riot Games\League of Legends`).
pub fn install_dir_from_output(output: &str) -> Option<String> {
	let exe = WINDOWS_EXE_RE
		.captures(output)
		.and_then(|caps| caps.get(1))
		.or_else(|| MACOS_EXE_RE.find(output))?
		.as_str();

	let (dir, _) = exe.rsplit_once(['\\', '/'])?;
	Some(dir.to_string())
}
