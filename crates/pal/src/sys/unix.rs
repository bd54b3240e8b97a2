use std::path::Path;

use libloading::os::unix::{Library, RTLD_LOCAL, RTLD_NOW};

use super::Platform;
use crate::error::{PalError, Result};
use crate::path::{self, PathStyle};

pub struct Unix;

impl Platform for Unix {
	type ActivationCookie = ();

	const PATH_STYLE: PathStyle = path::UNIX;
	const REFERENCE_PATTERN: &'static str = r"\$\{([^}]+)\}";

	fn absolute_path(path: &Path) -> Result<String> {
		let resolved = std::fs::canonicalize(path).map_err(|e| match e.kind() {
			std::io::ErrorKind::NotFound => PalError::NotFound(path.to_path_buf()),
			_ => PalError::io(path, e),
		})?;
		resolved.into_os_string().into_string().map_err(|raw| PalError::NotUnicode(raw.into()))
	}

	fn open_library(path: &Path, pin: bool) -> Result<libloading::Library> {
		let library = unsafe { Library::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map_err(|e| {
			PalError::LibraryLoad {
				path: path.to_path_buf(),
				reason: e.to_string(),
			}
		})?;

		if pin {
			// Promote the already mapped object to RTLD_NODELETE; dlclose on any
			// handle afterwards leaves it resident.
			let pinned = unsafe {
				Library::open(Some(path), RTLD_NOW | libc::RTLD_NOLOAD | libc::RTLD_NODELETE)
			}
			.map_err(|e| PalError::LibraryPin {
				path: path.to_path_buf(),
				reason: e.to_string(),
			})?;
			std::mem::forget(pinned);
		}

		Ok(library.into())
	}

	fn is_debugger_present() -> bool {
		std::fs::read_to_string("/proc/self/status")
			.ok()
			.and_then(|status| tracer_pid(&status))
			.is_some_and(|pid| pid != 0)
	}

	// Activation contexts are a Windows loader concept; nothing to enter.
	fn activate(_executable: &Path) -> Result<Option<()>> {
		Ok(None)
	}

	fn deactivate(_cookie: ()) {}
}

fn tracer_pid(status: &str) -> Option<u32> {
	status
		.lines()
		.find_map(|line| line.strip_prefix("TracerPid:"))
		.and_then(|pid| pid.trim().parse().ok())
}
