//! Filesystem probes and single-level enumeration.

use std::path::Path;

use tracing::trace;

use crate::error::{PalError, Result};
use crate::path;
use crate::sys::{Native, Platform};

/// Which kind of directory entry [`list_entries`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	Directories,
	Files,
}

/// Whether `path` names an existing regular file, following symlinks.
pub fn file_exists(path: impl AsRef<Path>) -> bool {
	path.as_ref().is_file()
}

/// Whether `path` names an existing directory, following symlinks.
pub fn directory_exists(path: impl AsRef<Path>) -> bool {
	path.as_ref().is_dir()
}

/// Enumerates one level of `root`.
///
/// For [`EntryKind::Files`], `extension` is a case-sensitive suffix that the
/// entry name must strictly extend (`.dll` alone does not match `.dll`), and
/// symlinks or entries of unknown type are followed and kept only if the
/// target is a regular file. `accept` receives each combined path and may
/// veto it.
///
/// A relative `root` is resolved first, so every returned path is absolute.
/// Results come back in OS enumeration order. Callers needing a stable order
/// sort for themselves.
pub fn list_entries(
	root: &str,
	kind: EntryKind,
	extension: Option<&str>,
	accept: Option<&dyn Fn(&str) -> bool>,
) -> Result<Vec<String>> {
	let resolved;
	let root = if path::NATIVE.is_absolute(root) {
		root
	} else {
		resolved = absolute_path(root)?;
		resolved.as_str()
	};

	let reader = std::fs::read_dir(root).map_err(|e| PalError::io(root, e))?;
	let mut entries = Vec::new();

	for entry in reader {
		let entry = entry.map_err(|e| PalError::io(root, e))?;
		let Ok(name) = entry.file_name().into_string() else {
			trace!(root, entry = ?entry.file_name(), "skipping non-unicode entry");
			continue;
		};
		if matches!(name.as_str(), "." | "..") {
			continue;
		}

		let Ok(file_type) = entry.file_type() else {
			continue;
		};

		let keep = match kind {
			EntryKind::Directories => {
				file_type.is_dir() || (!file_type.is_file() && entry.path().is_dir())
			}
			EntryKind::Files => {
				if extension.is_some_and(|ext| !has_suffix(&name, ext)) {
					continue;
				}
				file_type.is_file() || (!file_type.is_dir() && entry.path().is_file())
			}
		};
		if !keep {
			continue;
		}

		let Ok(full) = path::combine(root, &name) else {
			continue;
		};
		if accept.is_some_and(|f| !f(&full)) {
			continue;
		}
		entries.push(full);
	}

	Ok(entries)
}

fn has_suffix(name: &str, suffix: &str) -> bool {
	name.len() > suffix.len() && name.ends_with(suffix)
}

/// Canonical absolute form of an existing path.
pub fn absolute_path(path: impl AsRef<Path>) -> Result<String> {
	Native::absolute_path(path.as_ref())
}

/// Absolute path of the running executable.
pub fn own_executable_path() -> Result<String> {
	let exe = std::env::current_exe().map_err(|e| PalError::io("<current executable>", e))?;
	absolute_path(exe)
}

/// File name of the running executable.
pub fn own_executable_name() -> Result<String> {
	let exe = own_executable_path()?;
	Ok(path::directory_name(&exe)?.to_owned())
}

/// Current working directory.
pub fn current_dir() -> Result<String> {
	let cwd = std::env::current_dir().map_err(|e| PalError::io(".", e))?;
	cwd.into_os_string().into_string().map_err(|raw| PalError::NotUnicode(raw.into()))
}
