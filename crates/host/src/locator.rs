//! Version-aware discovery of installed runtimes.

use clrboot_pal::{EntryKind, fs, path};
use tracing::{debug, warn};

use crate::version::RuntimeVersion;

/// A runtime directory that holds the expected library but is not loaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCandidate {
	root: String,
	library_path: String,
	version: Option<RuntimeVersion>,
}

impl RuntimeCandidate {
	pub fn new(root: impl Into<String>, library_path: impl Into<String>, version: Option<RuntimeVersion>) -> Self {
		Self {
			root: root.into(),
			library_path: library_path.into(),
			version,
		}
	}

	pub fn root(&self) -> &str {
		&self.root
	}

	pub fn library_path(&self) -> &str {
		&self.library_path
	}

	/// `None` for a runtime that ships beside the executable.
	pub fn version(&self) -> Option<&RuntimeVersion> {
		self.version.as_ref()
	}
}

/// Scans the immediate subdirectories of `root` for installed runtimes.
///
/// A subdirectory qualifies when its name parses as a version no lower than
/// `minimum` and it contains `library_name`. Names that are not versions are
/// skipped with a warning. Results are sorted ascending by version; an empty
/// result is not an error here.
pub fn locate_runtimes(root: &str, minimum: &RuntimeVersion, library_name: &str) -> Vec<RuntimeCandidate> {
	let directories = match fs::list_entries(root, EntryKind::Directories, None, None) {
		Ok(directories) => directories,
		Err(error) => {
			debug!(root, %error, "runtimes root not readable");
			return Vec::new();
		}
	};

	let mut candidates: Vec<RuntimeCandidate> = directories
		.into_iter()
		.filter_map(|directory| {
			let name = path::directory_name(&directory).ok()?;
			let version = match name.parse::<RuntimeVersion>() {
				Ok(version) => version,
				Err(error) => {
					warn!(path = %directory, %error, "skipping runtime directory with unparsable version");
					return None;
				}
			};
			if version < *minimum {
				debug!(path = %directory, %version, %minimum, "runtime below minimum version");
				return None;
			}

			let library_path = path::combine(&directory, library_name).ok()?;
			if !fs::file_exists(&library_path) {
				debug!(path = %directory, library = library_name, "runtime directory lacks library");
				return None;
			}
			Some(RuntimeCandidate::new(directory, library_path, Some(version)))
		})
		.collect();

	// Build metadata does not order versions, so equal versions fall back to
	// their directory for a stable pick.
	candidates.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.root.cmp(&b.root)));
	candidates
}
