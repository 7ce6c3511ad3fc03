use std::io;
use std::path::{Path, PathBuf};

use super::Credentials;

pub const LOCKFILE_NAME: &str = "lockfile";

const DRIVES: [char; 5] = ['C', 'D', 'E', 'F', 'G'];

/// Platform locations checked after the configured install path.
pub fn default_lockfile_candidates() -> Vec<PathBuf> {
	if cfg!(windows) {
		DRIVES
			.iter()
			.map(|drive| PathBuf::from(format!(r"{drive}:\Riot Games\League of Legends\{LOCKFILE_NAME}")))
			.collect()
	} else if cfg!(target_os = "macos") {
		vec![PathBuf::from("/Applications/League of Legends.app/Contents/LoL").join(LOCKFILE_NAME)]
	} else {
		// WSL mounts of the Windows drives.
		DRIVES
			.iter()
			.map(|drive| {
				PathBuf::from(format!("/mnt/{}", drive.to_ascii_lowercase()))
					.join("Riot Games")
					.join("League of Legends")
					.join(LOCKFILE_NAME)
			})
			.collect()
	}
}

/// Parses `name:pid:port:password:protocol`.
///
/// Returns `None` unless there are exactly five fields and the port is numeric.
pub fn parse_lockfile(contents: &str) -> Option<Credentials> {
	let fields: Vec<&str> = contents.trim_end().split(':').collect();
	let [_name, _pid, port, password, protocol] = fields.as_slice() else {
		return None;
	};

	Some(Credentials {
		port: port.parse().ok()?,
		password: (*password).to_string(),
		protocol: (*protocol).to_string(),
	})
}

/// Reads and parses a lockfile. A missing file is an `Err`; a malformed one is `Ok(None)`.
pub(super) fn read_lockfile(path: &Path) -> io::Result<Option<Credentials>> {
	let contents = std::fs::read_to_string(path)?;
	Ok(parse_lockfile(&contents))
}
