//! Windows Subsystem for Linux helpers.
//!
//! Under WSL the client runs on the Windows side: lockfiles live under
//! `/mnt/<drive>` and the process table is read through `wmic.exe`.

use std::path::PathBuf;

pub(crate) fn under_wsl() -> bool {
	if std::env::var_os("WSL_DISTRO_NAME").is_some() {
		return true;
	}
	std::fs::read_to_string("/proc/sys/kernel/osrelease").is_ok_and(|release| release_is_wsl(&release))
}

// WSL1 and WSL2 kernels both tag their release string.
fn release_is_wsl(release: &str) -> bool {
	let release = release.to_ascii_lowercase();
	release.contains("microsoft") || release.contains("wsl")
}

/// Install directory as reachable from this host.
///
/// `wmic.exe` reports the executable by its Windows path. Under WSL the
/// lockfile beside it is only readable through the drive mount, so the
/// cached override path has to be translated before the next resolution.
pub(crate) fn host_install_dir(dir: &str) -> PathBuf {
	if under_wsl() {
		drive_mount_path(dir).unwrap_or_else(|| PathBuf::from(dir))
	} else {
		PathBuf::from(dir)
	}
}

/// `C:\Riot Games\League of Legends` -> `/mnt/c/Riot Games/League of Legends`
fn drive_mount_path(dir: &str) -> Option<PathBuf> {
	let mut chars = dir.chars();
	let drive = chars.next().filter(char::is_ascii_alphabetic)?;
	if chars.next() != Some(':') {
		return None;
	}
	let rest = chars.as_str();
	if !rest.starts_with(['\\', '/']) {
		return None;
	}

	let mut mount = PathBuf::from("/mnt").join(drive.to_ascii_lowercase().to_string());
	for part in rest.split(['\\', '/']).filter(|part| !part.is_empty()) {
		mount.push(part);
	}
	Some(mount)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn recognises_wsl_kernel_releases() {
		assert!(release_is_wsl("5.15.153.1-microsoft-standard-WSL2"));
		assert!(release_is_wsl("4.4.0-19041-Microsoft"));
		assert!(!release_is_wsl("6.8.0-generic"));
	}

	#[test]
	fn maps_install_dir_onto_drive_mount() {
		assert_eq!(
			drive_mount_path(r"D:\Riot Games\League of Legends"),
			Some(PathBuf::from("/mnt/d/Riot Games/League of Legends"))
		);
		assert_eq!(drive_mount_path("C:/"), Some(PathBuf::from("/mnt/c")));
	}

	#[test]
	fn leaves_non_drive_paths_alone() {
		assert_eq!(drive_mount_path("/Applications/League of Legends.app"), None);
		assert_eq!(drive_mount_path("C:"), None);
		assert_eq!(drive_mount_path(r"\\server\share"), None);
	}
}
