//! Bootstrap configuration and well-known names.

use crate::version::RuntimeVersion;

/// Toggle for server-mode garbage collection.
pub const SERVER_GC_VAR: &str = "CORECLR_SERVER_GC";

/// Toggle for concurrent garbage collection.
pub const CONCURRENT_GC_VAR: &str = "CORECLR_CONCURRENT_GC";

/// Exit code for any failure before the managed entry point returns.
pub const FAILURE_EXIT_CODE: i32 = -1;

/// Installed-runtimes root, as an environment reference template.
#[cfg(windows)]
pub const DEFAULT_RUNTIMES_ROOT: &str = r"%ProgramFiles%\dotnet\shared\Microsoft.NETCore.App";
#[cfg(not(windows))]
pub const DEFAULT_RUNTIMES_ROOT: &str = "${DOTNET_ROOT}/shared/Microsoft.NETCore.App";

/// File name of the runtime library inside a runtime directory.
#[cfg(windows)]
pub const RUNTIME_LIBRARY_NAME: &str = "coreclr.dll";
#[cfg(target_os = "macos")]
pub const RUNTIME_LIBRARY_NAME: &str = "libcoreclr.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const RUNTIME_LIBRARY_NAME: &str = "libcoreclr.so";

/// Inputs that shape runtime discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
	/// Lowest installed runtime version accepted. Not applied to a runtime
	/// beside the executable.
	pub minimum_version: RuntimeVersion,
	/// Installed-runtimes root. Environment references are expanded; a value
	/// without references is taken as is.
	pub runtimes_root: String,
	/// Runtime library file name to look for.
	pub library_name: String,
}

impl Default for BootstrapConfig {
	fn default() -> Self {
		Self {
			minimum_version: RuntimeVersion::default(),
			runtimes_root: DEFAULT_RUNTIMES_ROOT.to_owned(),
			library_name: RUNTIME_LIBRARY_NAME.to_owned(),
		}
	}
}

impl BootstrapConfig {
	pub fn with_minimum_version(mut self, version: RuntimeVersion) -> Self {
		self.minimum_version = version;
		self
	}

	pub fn with_runtimes_root(mut self, root: impl Into<String>) -> Self {
		self.runtimes_root = root.into();
		self
	}

	pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
		self.library_name = name.into();
		self
	}
}
