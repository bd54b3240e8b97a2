//! Error types for discovery, loading, and bootstrap.

use clrboot_pal::PalError;
use thiserror::Error;

use crate::host::{HResult, HostStage};

/// Why a single runtime directory could not be loaded.
///
/// Recoverable at the discovery level: the sequencer moves on to the next
/// candidate.
#[derive(Debug, Error)]
pub enum LoadError {
	/// The directory has no runtime library.
	#[error("runtime library not found: {0}")]
	MissingLibrary(String),

	/// The library exists but loading or pinning it failed.
	#[error(transparent)]
	Library(#[from] PalError),
}

/// Fatal bootstrap failures. Each aborts the whole sequence.
#[derive(Debug, Error)]
pub enum BootstrapError {
	/// The target executable does not exist.
	#[error("target executable not found: {0}")]
	TargetNotFound(String),

	/// The target executable path could not be resolved.
	#[error("invalid target executable {path}: {source}")]
	InvalidTarget {
		/// Path as given.
		path: String,
		/// Underlying failure.
		#[source]
		source: PalError,
	},

	/// Neither the executable's directory nor any installed runtime loaded.
	#[error("{library} not found")]
	RuntimeNotFound {
		/// Runtime library file name searched for.
		library: String,
	},

	/// The runtime library does not export the hosting entry point.
	#[error("runtime hosting entry point unavailable: {0}")]
	HostEntryPoint(#[source] PalError),

	/// A hosting interface call returned a failure status.
	#[error("{stage} failed. ERRORCODE: {status}")]
	Host {
		/// Which call failed.
		stage: HostStage,
		/// Status the runtime returned.
		status: HResult,
	},

	/// The trusted assembly list came out empty.
	#[error("trusted platform assembly list is empty")]
	EmptyAssemblyList,

	/// A stage ran before the host reached the state it requires.
	#[error("runtime host not {0}")]
	HostState(&'static str),
}

impl BootstrapError {
	/// Numeric hosting status, when the failure came from the runtime.
	pub fn status(&self) -> Option<HResult> {
		match self {
			Self::Host { status, .. } => Some(*status),
			_ => None,
		}
	}
}
