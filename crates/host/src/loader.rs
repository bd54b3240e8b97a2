//! Runtime loading.
//!
//! A [`RuntimeInstance`] ties a pinned runtime library to the directory it
//! came from. The library is never unloaded; the instance lives until the
//! process exits.

use clrboot_pal::{PalError, fs, path};
use tracing::debug;

use crate::error::{BootstrapError, LoadError};
use crate::host::RuntimeHost;
use crate::locator::RuntimeCandidate;
use crate::version::RuntimeVersion;

/// How runtime libraries are opened and their host interface obtained.
pub trait RuntimeBackend {
	/// Loaded library handle.
	type Library;
	/// Host control interface.
	type Host: RuntimeHost;

	/// Loads and pins the library at `library_path`.
	fn open(&self, library_path: &str) -> Result<Self::Library, PalError>;

	/// Obtains the host control interface from a loaded library.
	fn host(&self, library: &Self::Library) -> Result<Self::Host, BootstrapError>;
}

/// A loaded runtime and, once acquired, its host interface.
pub struct RuntimeInstance<B: RuntimeBackend> {
	library: B::Library,
	candidate: RuntimeCandidate,
	library_loaded: bool,
	host_created: bool,
	host: Option<B::Host>,
}

impl<B: RuntimeBackend> RuntimeInstance<B> {
	pub fn candidate(&self) -> &RuntimeCandidate {
		&self.candidate
	}

	/// Directory the runtime was loaded from.
	pub fn directory(&self) -> &str {
		self.candidate.root()
	}

	/// Installed version, or `None` for a runtime beside the executable.
	pub fn version(&self) -> Option<&RuntimeVersion> {
		self.candidate.version()
	}

	pub fn library(&self) -> &B::Library {
		&self.library
	}

	pub fn is_library_loaded(&self) -> bool {
		self.library_loaded
	}

	/// Whether the host's `Start` has succeeded.
	pub fn is_host_created(&self) -> bool {
		self.host_created
	}

	/// Obtains the host interface, if not already held.
	pub fn acquire_host(&mut self, backend: &B) -> Result<&mut B::Host, BootstrapError> {
		if self.host.is_none() {
			self.host = Some(backend.host(&self.library)?);
		}
		self.host_mut()
	}

	pub fn host_mut(&mut self) -> Result<&mut B::Host, BootstrapError> {
		self.host.as_mut().ok_or(BootstrapError::HostState("acquired"))
	}

	/// Records that the host started.
	pub fn mark_host_started(&mut self) {
		self.host_created = true;
	}

	/// Gives up the host interface. The library itself stays resident.
	pub fn release_host(&mut self) {
		if let Some(host) = self.host.take() {
			host.release();
		}
		self.host_created = false;
	}
}

/// Loads the runtime library from `directory`.
///
/// No retry happens here. A missing file or a failed load or pin returns an
/// error and leaves nothing behind; the caller may try another directory.
pub fn load_runtime<B: RuntimeBackend>(
	backend: &B,
	directory: &str,
	library_name: &str,
	version: Option<RuntimeVersion>,
) -> Result<RuntimeInstance<B>, LoadError> {
	let library_path = path::combine(directory, library_name)?;
	if !fs::file_exists(&library_path) {
		return Err(LoadError::MissingLibrary(library_path));
	}
	load_candidate(backend, RuntimeCandidate::new(directory, library_path, version))
}

/// Loads an already validated candidate.
pub fn load_candidate<B: RuntimeBackend>(
	backend: &B,
	candidate: RuntimeCandidate,
) -> Result<RuntimeInstance<B>, LoadError> {
	let library = backend.open(candidate.library_path())?;
	debug!(
		root = candidate.root(),
		version = ?candidate.version().map(ToString::to_string),
		"runtime library loaded"
	);
	Ok(RuntimeInstance {
		library,
		candidate,
		library_loaded: true,
		host_created: false,
		host: None,
	})
}
