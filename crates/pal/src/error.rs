//! Error types for platform operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the platform abstraction layer.
///
/// Absence is usually not an error here: existence probes return `bool`, and
/// callers decide whether a missing path aborts a stage or just skips a
/// candidate.
#[derive(Debug, Error)]
pub enum PalError {
	/// A `..` segment had no parent left to cancel.
	#[error("path escapes its first component: {0}")]
	PathEscapesRoot(String),

	/// A path contained no directory separator.
	#[error("path has no directory separator: {0}")]
	NoSeparator(String),

	/// A path does not exist on disk.
	#[error("path not found: {}", .0.display())]
	NotFound(PathBuf),

	/// A path or directory entry name is not valid UTF-8.
	#[error("path is not valid unicode: {}", .0.display())]
	NotUnicode(PathBuf),

	/// Filesystem call failed.
	#[error("I/O error at {}: {source}", path.display())]
	Io {
		/// Path the operation targeted.
		path: PathBuf,
		/// The underlying I/O error.
		source: std::io::Error,
	},

	/// The template contained no expandable environment reference.
	#[error("no environment references expanded in: {0}")]
	NoReferences(String),

	/// A referenced environment variable is not set.
	#[error("environment variable not set: {0}")]
	VariableNotSet(String),

	/// Expansion kept reintroducing references.
	#[error("environment expansion did not settle: {0}")]
	ExpansionLimit(String),

	/// The dynamic loader rejected a library.
	#[error("failed to load library {}: {reason}", path.display())]
	LibraryLoad {
		/// Library path.
		path: PathBuf,
		/// Loader diagnostic.
		reason: String,
	},

	/// A library loaded but could not be made permanently resident.
	#[error("failed to pin library {}: {reason}", path.display())]
	LibraryPin {
		/// Library path.
		path: PathBuf,
		/// Loader diagnostic.
		reason: String,
	},

	/// An exported symbol is absent.
	#[error("symbol not found: {name}: {reason}")]
	SymbolNotFound {
		/// Symbol name.
		name: String,
		/// Loader diagnostic.
		reason: String,
	},
}

impl PalError {
	/// Wraps an I/O error with the path that produced it.
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PalError>;
