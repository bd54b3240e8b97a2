//! Semantic versions of installed runtimes.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Reasons a string is not a semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
	#[error("expected major.minor.patch, got {0:?}")]
	Shape(String),

	#[error("invalid numeric component {0:?}")]
	Number(String),

	#[error("numeric component {0:?} has a leading zero")]
	LeadingZero(String),

	#[error("invalid identifier {0:?}")]
	Identifier(String),
}

/// One dot-separated pre-release identifier.
///
/// Numeric identifiers order numerically and before alphanumeric ones, which
/// order lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Identifier {
	Numeric(u64),
	Alphanumeric(String),
}

impl fmt::Display for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Numeric(n) => write!(f, "{n}"),
			Self::Alphanumeric(s) => f.write_str(s),
		}
	}
}

/// A `major.minor.patch[-prerelease][+build]` version.
///
/// Build metadata is kept for display but takes no part in equality or
/// ordering. A release orders after every pre-release of the same triple.
#[derive(Debug, Clone, Default)]
pub struct RuntimeVersion {
	major: u64,
	minor: u64,
	patch: u64,
	prerelease: Vec<Identifier>,
	build: Option<String>,
}

impl RuntimeVersion {
	pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
		Self {
			major,
			minor,
			patch,
			prerelease: Vec::new(),
			build: None,
		}
	}

	pub fn major(&self) -> u64 {
		self.major
	}

	pub fn minor(&self) -> u64 {
		self.minor
	}

	pub fn patch(&self) -> u64 {
		self.patch
	}

	pub fn is_prerelease(&self) -> bool {
		!self.prerelease.is_empty()
	}
}

impl FromStr for RuntimeVersion {
	type Err = VersionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (rest, build) = match s.split_once('+') {
			Some((rest, build)) => {
				for part in build.split('.') {
					check_identifier(part)?;
				}
				(rest, Some(build.to_owned()))
			}
			None => (s, None),
		};

		let (core, prerelease) = match rest.split_once('-') {
			Some((core, pre)) => (core, pre.split('.').map(parse_prerelease).collect::<Result<Vec<_>, _>>()?),
			None => (rest, Vec::new()),
		};

		let mut numbers = core.split('.');
		let (Some(major), Some(minor), Some(patch), None) =
			(numbers.next(), numbers.next(), numbers.next(), numbers.next())
		else {
			return Err(VersionError::Shape(s.to_owned()));
		};

		Ok(Self {
			major: parse_number(major)?,
			minor: parse_number(minor)?,
			patch: parse_number(patch)?,
			prerelease,
			build,
		})
	}
}

fn parse_number(part: &str) -> Result<u64, VersionError> {
	if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
		return Err(VersionError::Number(part.to_owned()));
	}
	if part.len() > 1 && part.starts_with('0') {
		return Err(VersionError::LeadingZero(part.to_owned()));
	}
	part.parse().map_err(|_| VersionError::Number(part.to_owned()))
}

fn check_identifier(part: &str) -> Result<(), VersionError> {
	if part.is_empty() || !part.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
		return Err(VersionError::Identifier(part.to_owned()));
	}
	Ok(())
}

fn parse_prerelease(part: &str) -> Result<Identifier, VersionError> {
	check_identifier(part)?;
	if part.bytes().all(|b| b.is_ascii_digit()) {
		return parse_number(part).map(Identifier::Numeric);
	}
	Ok(Identifier::Alphanumeric(part.to_owned()))
}

impl Ord for RuntimeVersion {
	fn cmp(&self, other: &Self) -> Ordering {
		(self.major, self.minor, self.patch)
			.cmp(&(other.major, other.minor, other.patch))
			.then_with(|| match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
				(true, true) => Ordering::Equal,
				(true, false) => Ordering::Greater,
				(false, true) => Ordering::Less,
				(false, false) => self.prerelease.cmp(&other.prerelease),
			})
	}
}

impl PartialOrd for RuntimeVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for RuntimeVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for RuntimeVersion {}

impl std::hash::Hash for RuntimeVersion {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		(self.major, self.minor, self.patch, &self.prerelease).hash(state);
	}
}

impl fmt::Display for RuntimeVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
		for (i, id) in self.prerelease.iter().enumerate() {
			f.write_str(if i == 0 { "-" } else { "." })?;
			write!(f, "{id}")?;
		}
		if let Some(build) = &self.build {
			write!(f, "+{build}")?;
		}
		Ok(())
	}
}
