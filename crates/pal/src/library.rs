//! Dynamic library handles.

use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PalError, Result};
use crate::sys::{Native, Platform};

/// A loaded shared library.
///
/// A pinned library is never released: dropping the handle performs no unload,
/// because the loader has been told to keep the image resident for the
/// process lifetime and the libraries we pin do not survive being unloaded.
/// Unpinned libraries are closed on drop as usual.
pub struct DynamicLibrary {
	inner: ManuallyDrop<libloading::Library>,
	path: PathBuf,
	pinned: bool,
}

impl DynamicLibrary {
	/// Loads the library at `path`, pinning it when `pin` is set.
	pub fn load(path: impl AsRef<Path>, pin: bool) -> Result<Self> {
		let path = path.as_ref();
		let inner = Native::open_library(path, pin)?;
		debug!(path = %path.display(), pin, "loaded dynamic library");
		Ok(Self {
			inner: ManuallyDrop::new(inner),
			path: path.to_path_buf(),
			pinned: pin,
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn is_pinned(&self) -> bool {
		self.pinned
	}

	/// Resolves the exported symbol `name` and copies it out.
	///
	/// # Safety
	///
	/// `T` must match the symbol's real type. For an unpinned library the
	/// returned value must not be used after this handle is dropped.
	pub unsafe fn symbol<T: Copy>(&self, name: &str) -> Result<T> {
		let symbol = unsafe { self.inner.get::<T>(name.as_bytes()) }.map_err(|e| PalError::SymbolNotFound {
			name: name.to_owned(),
			reason: e.to_string(),
		})?;
		Ok(*symbol)
	}
}

impl Drop for DynamicLibrary {
	fn drop(&mut self) {
		if self.pinned {
			// Pinned images stay mapped until process exit.
			return;
		}
		unsafe { ManuallyDrop::drop(&mut self.inner) };
	}
}

impl std::fmt::Debug for DynamicLibrary {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DynamicLibrary")
			.field("path", &self.path)
			.field("pinned", &self.pinned)
			.finish()
	}
}
