use indexmap::IndexMap;
use serde::Deserialize;

/// Whether a value counts as 'on': `1`, `ON`, `YES`, `TRUE` or `Y`.
pub fn is_on(value: &str) -> bool {
	match value.to_ascii_uppercase().as_str() {
		"1" | "ON" | "YES" | "TRUE" | "Y" => true,
		_ => false,
	}
}

/// Whether a value counts as 'off': empty, `0`, `OFF`, `NO`, `FALSE`, `N`,
/// `IGNORE`, or anything ending in `-NOTFOUND`.
///
/// Note that some values are neither on nor off.
pub fn is_off(value: &str) -> bool {
	let v = value.to_ascii_uppercase();
	match v.as_str() {
		"" | "0" | "OFF" | "NO" | "FALSE" | "N" | "IGNORE" => true,
		_ => v.ends_with("-NOTFOUND"),
	}
}

/// A free-form bag of string properties.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Properties(IndexMap<String, String>);

impl Properties {
	pub fn new() -> Self {
		Properties(IndexMap::new())
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(|s| &s[..])
	}

	/// Get a property, treating an empty value as absent.
	pub fn get_nonempty(&self, key: &str) -> Option<&str> {
		self.get(key).filter(|s| !s.is_empty())
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.insert(key.into(), value.into());
	}

	/// Whether the property is set to an 'on' value. Unset is not on.
	pub fn is_on(&self, key: &str) -> bool {
		self.get(key).map_or(false, is_on)
	}

	/// Whether the property is unset, or set to an 'off' value.
	pub fn is_off(&self, key: &str) -> bool {
		self.get(key).map_or(true, is_off)
	}

	/// A `;`-separated list property. Empty elements are skipped.
	pub fn list(&self, key: &str) -> impl Iterator<Item = &str> {
		self.get(key)
			.unwrap_or("")
			.split(';')
			.filter(|s| !s.is_empty())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn booleans() {
		for v in &["1", "on", "Yes", "TRUE", "y"] {
			assert!(is_on(v), "{}", v);
			assert!(!is_off(v), "{}", v);
		}
		for v in &["", "0", "off", "No", "false", "n", "Ignore", "FOO-NOTFOUND"] {
			assert!(is_off(v), "{}", v);
			assert!(!is_on(v), "{}", v);
		}
		assert!(!is_on("maybe"));
		assert!(!is_off("maybe"));
	}

	#[test]
	fn bag() {
		let mut p = Properties::new();
		assert!(p.is_off("X"));
		assert!(!p.is_on("X"));
		p.set("OBJECT_DEPENDS", "a.h;;b.h");
		p.set("EMPTY", "");
		assert_eq!(p.list("OBJECT_DEPENDS").collect::<Vec<_>>(), ["a.h", "b.h"]);
		assert_eq!(p.list("MISSING").count(), 0);
		assert_eq!(p.get_nonempty("EMPTY"), None);
	}
}
