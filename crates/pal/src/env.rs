//! Environment variable lookup and reference expansion.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PalError, Result};
use crate::sys::{Native, Platform};

/// Upper bound on substitutions in one expansion; values that keep
/// reintroducing references trip it instead of looping forever.
const MAX_SUBSTITUTIONS: usize = 64;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(<Native as Platform>::REFERENCE_PATTERN).expect("reference pattern is a valid regex")
});

/// Value of `name`, or `None` when unset or not unicode.
pub fn var(name: &str) -> Option<String> {
	std::env::var(name).ok()
}

/// Interprets `name` as a boolean toggle. Unset counts as `false`.
pub fn var_bool(name: &str) -> bool {
	var(name).is_some_and(|value| parse_bool(&value))
}

/// `1` or `true` in any case is `true`; anything else is `false`.
pub fn parse_bool(value: &str) -> bool {
	value == "1" || value.eq_ignore_ascii_case("true")
}

/// Expands platform environment references (`%NAME%` on Windows, `${NAME}`
/// elsewhere) using the process environment.
pub fn expand_references(template: &str) -> Result<String> {
	expand_with(template, &REFERENCE, var)
}

/// Expands platform environment references through `lookup` instead of the
/// process environment.
pub fn expand_references_with(template: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
	expand_with(template, &REFERENCE, lookup)
}

/// Expands every match of `pattern` in `template` through `lookup`.
///
/// The leftmost remaining reference is substituted each round, and scanning
/// resumes at the start of the substituted text so values that themselves
/// contain references are expanded too. Fails with
/// [`PalError::NoReferences`] when nothing was substituted, with
/// [`PalError::VariableNotSet`] on the first unset variable, and with
/// [`PalError::ExpansionLimit`] when substitution does not settle.
pub fn expand_with(
	template: &str,
	pattern: &Regex,
	lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
	let mut expanded = template.to_owned();
	let mut cursor = 0;
	let mut substitutions = 0;

	while let Some((range, name)) = pattern
		.captures_at(&expanded, cursor)
		.and_then(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str().to_owned())))
	{
		let value = lookup(&name).ok_or(PalError::VariableNotSet(name))?;

		if substitutions == MAX_SUBSTITUTIONS {
			return Err(PalError::ExpansionLimit(template.to_owned()));
		}
		cursor = range.start;
		expanded.replace_range(range, &value);
		substitutions += 1;
	}

	if substitutions == 0 {
		return Err(PalError::NoReferences(template.to_owned()));
	}
	Ok(expanded)
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use serial_test::serial;

	use super::*;

	fn unix_pattern() -> Regex {
		Regex::new(r"\$\{([^}]+)\}").unwrap()
	}

	fn windows_pattern() -> Regex {
		Regex::new(r"%([0-9A-Za-z_\\/\(\)]+)%").unwrap()
	}

	fn table(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| map.get(name).cloned()
	}

	#[test]
	fn test_parse_bool() {
		for yes in ["1", "true", "TRUE", "True"] {
			assert!(parse_bool(yes), "{yes}");
		}
		for no in ["0", "false", "yes", "", " 1", "2"] {
			assert!(!parse_bool(no), "{no}");
		}
	}

	#[test]
	fn test_expand_single_reference() {
		let out = expand_with("${ROOT}/shared", &unix_pattern(), table(&[("ROOT", "/usr/dotnet")])).unwrap();
		assert_eq!(out, "/usr/dotnet/shared");
		assert!(!out.contains("${"));
	}

	#[test]
	fn test_expand_windows_reference() {
		let out = expand_with(
			"%ProgramFiles%\\dotnet",
			&windows_pattern(),
			table(&[("ProgramFiles", "C:\\Program Files")]),
		)
		.unwrap();
		assert_eq!(out, "C:\\Program Files\\dotnet");
	}

	#[test]
	fn test_expand_multiple_and_nested() {
		let lookup = table(&[("A", "${B}/a"), ("B", "/b"), ("C", "c")]);
		let out = expand_with("${A}/${C}", &unix_pattern(), lookup).unwrap();
		assert_eq!(out, "/b/a/c");
	}

	#[test]
	fn test_expand_without_references_fails() {
		let err = expand_with("/usr/share/dotnet", &unix_pattern(), table(&[])).unwrap_err();
		assert!(matches!(err, PalError::NoReferences(_)));
	}

	#[test]
	fn test_expand_unset_variable_fails() {
		let err = expand_with("${MISSING}/x", &unix_pattern(), table(&[])).unwrap_err();
		assert!(matches!(err, PalError::VariableNotSet(name) if name == "MISSING"));
	}

	#[test]
	fn test_expand_self_reference_is_bounded() {
		let err = expand_with("${LOOP}", &unix_pattern(), table(&[("LOOP", "x${LOOP}")])).unwrap_err();
		assert!(matches!(err, PalError::ExpansionLimit(_)));
	}

	#[test]
	#[serial]
	fn test_process_environment() {
		// SAFETY: serialized with every other test touching the environment.
		unsafe {
			std::env::set_var("CLRBOOT_PAL_TEST_TOGGLE", "TRUE");
			std::env::remove_var("CLRBOOT_PAL_TEST_UNSET");
		}
		assert!(var_bool("CLRBOOT_PAL_TEST_TOGGLE"));
		assert!(!var_bool("CLRBOOT_PAL_TEST_UNSET"));
		assert_eq!(var("CLRBOOT_PAL_TEST_UNSET"), None);
		unsafe {
			std::env::remove_var("CLRBOOT_PAL_TEST_TOGGLE");
		}
	}
}
