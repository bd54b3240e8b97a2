//! String path algebra.
//!
//! Paths are handled as strings split into segments. Normalization is a pure
//! fixed-point reduction over those segments: each step collapses exactly one
//! `..`, `.`, or empty segment, and the loop ends once no step applies. A `..`
//! always cancels the segment immediately before it, whatever that segment is,
//! so collapsing one `..` can expose the next.
//!
//! Nothing here touches the filesystem.

use crate::error::{PalError, Result};
use crate::sys::{Native, Platform};

/// Separator conventions for one platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStyle {
	separator: char,
	alt_separator: Option<char>,
	list_separator: char,
	drive_prefixes: bool,
}

/// Forward-slash paths rooted at `/`.
pub const UNIX: PathStyle = PathStyle {
	separator: '/',
	alt_separator: None,
	list_separator: ':',
	drive_prefixes: false,
};

/// Backslash paths with drive letters and UNC shares; `/` is accepted on input.
pub const WINDOWS: PathStyle = PathStyle {
	separator: '\\',
	alt_separator: Some('/'),
	list_separator: ';',
	drive_prefixes: true,
};

/// Style of the platform this crate was built for.
pub const NATIVE: PathStyle = <Native as Platform>::PATH_STYLE;

impl PathStyle {
	/// Primary directory separator, used on output.
	pub const fn separator(self) -> char {
		self.separator
	}

	/// Separator between entries of a path list.
	pub const fn list_separator(self) -> char {
		self.list_separator
	}

	pub fn is_separator(self, c: char) -> bool {
		c == self.separator || self.alt_separator == Some(c)
	}

	/// Returns whether `path` carries a root (leading separator, drive, or share).
	pub fn is_absolute(self, path: &str) -> bool {
		self.split_root(path).0.is_some()
	}

	/// Joins `base` and `relative` with one separator and normalizes the result.
	///
	/// An absolute `relative` replaces `base` entirely. Fails when a `..`
	/// would climb above the first path component.
	pub fn combine(self, base: &str, relative: &str) -> Result<String> {
		if base.is_empty() || self.is_absolute(relative) {
			return self.normalize(relative);
		}

		let mut joined = String::with_capacity(base.len() + relative.len() + 1);
		joined.push_str(base);
		if !base.ends_with(|c| self.is_separator(c)) {
			joined.push(self.separator);
		}
		joined.push_str(relative);
		self.normalize(&joined)
	}

	/// Collapses `.`, `..`, and redundant separators.
	///
	/// The first component of a relative path is an anchor and is never
	/// removed; a rooted path may cancel every named component down to the
	/// root. Idempotent on its own output.
	pub fn normalize(self, path: &str) -> Result<String> {
		if path.is_empty() {
			return Ok(String::new());
		}

		let (root, rest) = self.split_root(path);
		let mut segments: Vec<&str> = rest.split(|c| self.is_separator(c)).collect();
		let first = if root.is_some() { 0 } else { 1 };

		loop {
			match collapse_once(&segments, first) {
				Collapse::Stable => break,
				Collapse::Reduced(next) => segments = next,
				Collapse::Escapes => return Err(PalError::PathEscapesRoot(path.to_owned())),
			}
		}

		Ok(self.render(root, &segments))
	}

	/// Last component of `path`.
	pub fn directory_name(self, path: &str) -> Result<&str> {
		let idx = self
			.last_separator(path)
			.ok_or_else(|| PalError::NoSeparator(path.to_owned()))?;
		Ok(&path[idx + 1..])
	}

	/// Everything before the last separator of `path`.
	///
	/// A path whose only separator is its root yields the root itself, so
	/// `/foo` has parent `/`.
	pub fn parent_directory(self, path: &str) -> Result<&str> {
		let idx = self
			.last_separator(path)
			.ok_or_else(|| PalError::NoSeparator(path.to_owned()))?;
		if idx == 0 {
			return Ok(&path[..1]);
		}
		if self.drive_prefixes && idx == 2 && self.split_root(path).0.is_some() {
			return Ok(&path[..3]);
		}
		Ok(&path[..idx])
	}

	/// Joins entries with this style's list separator, without a trailing one.
	pub fn join_list<I, S>(self, entries: I) -> String
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut out = String::new();
		for (i, entry) in entries.into_iter().enumerate() {
			if i > 0 {
				out.push(self.list_separator);
			}
			out.push_str(entry.as_ref());
		}
		out
	}

	fn last_separator(self, path: &str) -> Option<usize> {
		path.rfind(|c| self.is_separator(c))
	}

	/// Splits off the root prefix. The returned root excludes its trailing
	/// separator; `Some("")` is the bare leading separator.
	fn split_root(self, path: &str) -> (Option<&str>, &str) {
		if self.drive_prefixes {
			let bytes = path.as_bytes();
			if bytes.len() >= 3
				&& bytes[0].is_ascii_alphabetic()
				&& bytes[1] == b':'
				&& self.is_separator(bytes[2] as char)
			{
				return (Some(&path[..2]), &path[3..]);
			}

			let mut chars = path.chars();
			if chars.next().is_some_and(|c| self.is_separator(c))
				&& chars.next().is_some_and(|c| self.is_separator(c))
			{
				// `\\server\share` is one indivisible root.
				let share = &path[2..];
				let end = share
					.char_indices()
					.filter(|&(_, c)| self.is_separator(c))
					.nth(1)
					.map(|(i, _)| i);
				return match end {
					Some(end) => (Some(&path[..2 + end]), &share[end + 1..]),
					None => (Some(path), ""),
				};
			}
		}

		match path.strip_prefix(|c| self.is_separator(c)) {
			Some(rest) => (Some(""), rest),
			None => (None, path),
		}
	}

	fn render(self, root: Option<&str>, segments: &[&str]) -> String {
		let sep = self.separator.to_string();
		match root {
			Some(root) => format!("{root}{sep}{}", segments.join(&sep)),
			None => segments.join(&sep),
		}
	}
}

enum Collapse<'a> {
	Stable,
	Reduced(Vec<&'a str>),
	Escapes,
}

/// Applies the leftmost applicable reduction. `..` takes priority over `.` and
/// empty segments so that `a/./..` cancels the `.` rather than `a`.
fn collapse_once<'a>(segments: &[&'a str], first: usize) -> Collapse<'a> {
	let reduced = |skip: std::ops::RangeInclusive<usize>| {
		let mut next = Vec::with_capacity(segments.len());
		next.extend_from_slice(&segments[..*skip.start()]);
		next.extend_from_slice(&segments[skip.end() + 1..]);
		Collapse::Reduced(next)
	};

	if let Some(i) = segments
		.iter()
		.enumerate()
		.skip(first)
		.find_map(|(i, s)| (*s == "..").then_some(i))
	{
		if i == 0 || i - 1 < first {
			return Collapse::Escapes;
		}
		return reduced(i - 1..=i);
	}

	match segments
		.iter()
		.enumerate()
		.skip(first)
		.find(|(_, s)| s.is_empty() || **s == ".")
	{
		Some((i, _)) => reduced(i..=i),
		None => Collapse::Stable,
	}
}

/// [`PathStyle::combine`] with the native style.
pub fn combine(base: &str, relative: &str) -> Result<String> {
	NATIVE.combine(base, relative)
}

/// [`PathStyle::normalize`] with the native style.
pub fn normalize(path: &str) -> Result<String> {
	NATIVE.normalize(path)
}

/// [`PathStyle::directory_name`] with the native style.
pub fn directory_name(path: &str) -> Result<&str> {
	NATIVE.directory_name(path)
}

/// [`PathStyle::parent_directory`] with the native style.
pub fn parent_directory(path: &str) -> Result<&str> {
	NATIVE.parent_directory(path)
}
