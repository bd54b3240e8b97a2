//! Trusted platform assembly list.

use std::collections::HashSet;
use std::fmt;

use clrboot_pal::{EntryKind, PathStyle, fs, path};
use tracing::{debug, warn};

/// Assembly file extensions in scan order. Each optimized image comes
/// before its plain counterpart so it shadows it.
pub const ASSEMBLY_EXTENSIONS: [&str; 6] = [".ni.dll", ".dll", ".ni.exe", ".exe", ".ni.winmd", ".winmd"];

const NATIVE_IMAGE_MARKER: &str = ".ni";

/// Ordered, duplicate-free assembly paths handed to the runtime's resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyList {
	entries: Vec<String>,
	paths: HashSet<String>,
	names: HashSet<String>,
}

impl AssemblyList {
	pub fn new() -> Self {
		Self::default()
	}

	/// Scans `runtime_dir` by extension priority, then appends `executable`
	/// unless it is already listed.
	pub fn build(runtime_dir: &str, executable: &str) -> Self {
		let mut list = Self::new();
		list.add_directory(runtime_dir);
		list.push(executable);
		debug!(runtime_dir, assemblies = list.len(), "built trusted assembly list");
		list
	}

	/// Adds every assembly in `dir`, one pass per extension.
	///
	/// Within a directory, assemblies are keyed by logical name (file name
	/// without extension or native image marker, compared case-insensitively),
	/// so the first extension to supply a name wins. An unreadable directory
	/// contributes nothing.
	pub fn add_directory(&mut self, dir: &str) {
		for extension in ASSEMBLY_EXTENSIONS {
			let mut found = match fs::list_entries(dir, EntryKind::Files, Some(extension), None) {
				Ok(found) => found,
				Err(error) => {
					warn!(dir, %error, "cannot scan directory for assemblies");
					return;
				}
			};
			found.sort();

			for file in found {
				let Some(name) = logical_name(&file, extension) else {
					continue;
				};
				if self.paths.contains(&file) || !self.names.insert(name) {
					continue;
				}
				self.paths.insert(file.clone());
				self.entries.push(file);
			}
		}
	}

	/// Appends `path` unless the exact path is already listed.
	pub fn push(&mut self, path: &str) -> bool {
		if !self.paths.insert(path.to_owned()) {
			return false;
		}
		self.entries.push(path.to_owned());
		true
	}

	pub fn contains(&self, path: &str) -> bool {
		self.paths.contains(path)
	}

	pub fn entries(&self) -> &[String] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Joins the entries with `style`'s list separator.
	pub fn serialize_with(&self, style: PathStyle) -> String {
		style.join_list(&self.entries)
	}

	/// Joins the entries with the platform list separator.
	pub fn serialize(&self) -> String {
		self.serialize_with(path::NATIVE)
	}
}

impl fmt::Display for AssemblyList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.serialize())
	}
}

fn logical_name(file: &str, extension: &str) -> Option<String> {
	let name = path::directory_name(file).ok()?;
	let stem = name.strip_suffix(extension)?;
	let stem = stem.strip_suffix(NATIVE_IMAGE_MARKER).unwrap_or(stem);
	Some(stem.to_lowercase())
}
