//! Platform capability interface.
//!
//! Everything that differs between operating systems sits behind [`Platform`],
//! which has exactly two implementations. The build picks one as [`Native`];
//! the rest of the crate calls through that alias and never branches on the
//! target itself.

use std::path::Path;

use crate::error::Result;
use crate::path::PathStyle;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

/// Operations whose implementation depends on the host OS.
pub trait Platform {
	/// Path separator conventions.
	const PATH_STYLE: PathStyle;

	/// Regex matching one environment reference; capture group 1 is the name.
	const REFERENCE_PATTERN: &'static str;

	/// Canonical absolute form of an existing path.
	fn absolute_path(path: &Path) -> Result<String>;

	/// Loads a shared library. With `pin`, the library is additionally made
	/// resident for the rest of the process, and failure to do so fails the
	/// whole load.
	fn open_library(path: &Path, pin: bool) -> Result<libloading::Library>;

	/// Whether a debugger is attached to this process.
	fn is_debugger_present() -> bool;

	/// Token for an entered activation context.
	type ActivationCookie;

	/// Enters the activation context described by `executable`'s manifest.
	///
	/// `Ok(None)` when the platform has no activation contexts.
	fn activate(executable: &Path) -> Result<Option<Self::ActivationCookie>>;

	/// Leaves a context entered by [`Platform::activate`].
	fn deactivate(cookie: Self::ActivationCookie);
}

#[cfg(unix)]
pub type Native = unix::Unix;

#[cfg(windows)]
pub type Native = windows::Windows;

/// Whether a debugger is attached to this process.
pub fn is_debugger_present() -> bool {
	Native::is_debugger_present()
}
