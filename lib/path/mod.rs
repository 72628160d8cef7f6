//! Paths as they appear in generated rule files.
//!
//! A [`BuildPath`] is always stored in canonical form, with `/` as separator.
//! It is only turned into text for a specific purpose (a make target, a shell
//! argument, or a quoted list entry) through a [`PathStyle`]. Rendered text is
//! never fed back into a [`BuildPath`] or rendered a second time.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// A canonical, `/`-separated path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BuildPath(String);

/// Canonicalize a path.
///
/// Backslashes become forward slashes, duplicate separators and `.`
/// components are dropped, and `..` removes the component before it (if
/// there is one). An absolute path never goes above its root.
pub fn canonicalize(path: &str) -> String {
	if path.is_empty() {
		return String::new();
	}

	let path = path.replace('\\', "/");

	let root_len = root_length(&path);
	let (root, rest) = path.split_at(root_len);

	let mut components: Vec<&str> = Vec::new();
	for c in rest.split('/') {
		match c {
			"" | "." => {}
			".." => match components.last() {
				Some(&last) if last != ".." => {
					components.pop();
				}
				_ if root.is_empty() => components.push(".."),
				_ => {}
			},
			c => components.push(c),
		}
	}

	if components.is_empty() {
		if root.is_empty() {
			".".to_string()
		} else {
			root.to_string()
		}
	} else {
		let mut result = String::with_capacity(path.len());
		result.push_str(root);
		result.push_str(&components.join("/"));
		result
	}
}

/// The length of the root of a `/`-separated path: `/`, `//` (network
/// share), `C:/` or `C:`.
fn root_length(path: &str) -> usize {
	let b = path.as_bytes();
	if b.starts_with(b"//") && b.get(2) != Some(&b'/') {
		2
	} else if b.starts_with(b"/") {
		1
	} else if b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':' {
		if b.get(2) == Some(&b'/') {
			3
		} else {
			2
		}
	} else {
		0
	}
}

impl BuildPath {
	pub fn new(path: impl AsRef<str>) -> Self {
		BuildPath(canonicalize(path.as_ref()))
	}

	/// Convert a [`Path`], replacing any non-UTF-8 parts.
	pub fn from_path(path: &Path) -> Self {
		BuildPath::new(path.to_string_lossy())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn to_path_buf(&self) -> PathBuf {
		PathBuf::from(&self.0)
	}

	/// Whether the path starts with `/` or a drive letter.
	pub fn is_absolute(&self) -> bool {
		root_length(&self.0) > 0
	}

	/// Append a (relative) path. An absolute `other` replaces `self`.
	pub fn join(&self, other: impl AsRef<str>) -> BuildPath {
		let other = other.as_ref();
		if self.0.is_empty() || self.0 == "." || root_length(other) > 0 {
			BuildPath::new(other)
		} else if other.is_empty() {
			self.clone()
		} else {
			BuildPath::new(format!("{}/{}", self.0, other))
		}
	}

	/// The path without its last component.
	pub fn parent(&self) -> BuildPath {
		let root = root_length(&self.0);
		match self.0[root..].rfind('/') {
			Some(i) => BuildPath(self.0[..root + i].to_string()),
			None if root > 0 => BuildPath(self.0[..root].to_string()),
			None => BuildPath(".".to_string()),
		}
	}

	/// The last component of the path.
	pub fn file_name(&self) -> &str {
		let root = root_length(&self.0);
		let rest = &self.0[root..];
		rest.rsplit('/').next().unwrap_or(rest)
	}

	/// The file name without its last extension.
	pub fn file_stem(&self) -> &str {
		let name = self.file_name();
		match name.rfind('.') {
			Some(0) | None => name,
			Some(i) => &name[..i],
		}
	}

	/// The last extension, without the dot.
	pub fn extension(&self) -> Option<&str> {
		let name = self.file_name();
		match name.rfind('.') {
			Some(0) | None => None,
			Some(i) => Some(&name[i + 1..]),
		}
	}

	/// Whether `self` is `base`, or lies beneath it.
	pub fn starts_with(&self, base: &BuildPath) -> bool {
		self.0 == base.0
			|| (self.0.starts_with(&base.0)
				&& (base.0.ends_with('/') || self.0[base.0.len()..].starts_with('/')))
	}

	/// A lexical relative path from `base` to `self`.
	///
	/// If they have different roots, `self` is returned as-is.
	pub fn relative_to(&self, base: &BuildPath) -> BuildPath {
		let root_a = &self.0[..root_length(&self.0)];
		let root_b = &base.0[..root_length(&base.0)];
		if !root_a.eq_ignore_ascii_case(root_b) {
			return self.clone();
		}
		let a: Vec<&str> = components(&self.0[root_a.len()..]);
		let b: Vec<&str> = components(&base.0[root_b.len()..]);
		let common = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
		let mut parts: Vec<&str> = Vec::new();
		parts.resize(b.len() - common, "..");
		parts.extend_from_slice(&a[common..]);
		if parts.is_empty() {
			BuildPath(".".to_string())
		} else {
			BuildPath(parts.join("/"))
		}
	}
}

fn components(s: &str) -> Vec<&str> {
	s.split('/').filter(|c| !c.is_empty() && *c != ".").collect()
}

impl fmt::Debug for BuildPath {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&self.0, f)
	}
}

impl fmt::Display for BuildPath {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for BuildPath {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl AsRef<Path> for BuildPath {
	fn as_ref(&self) -> &Path {
		Path::new(&self.0)
	}
}

impl From<&str> for BuildPath {
	fn from(s: &str) -> Self {
		BuildPath::new(s)
	}
}

impl<'de> Deserialize<'de> for BuildPath {
	fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
		String::deserialize(d).map(BuildPath::new)
	}
}

/// How paths are written down for the shell the generated rules run in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStyle {
	Unix,
	Windows,
}

impl PathStyle {
	/// Render a path as a make target or dependency.
	///
	/// A leading `./` is dropped, and spaces, `#` and `$` are escaped.
	pub fn make_target(self, path: &BuildPath) -> String {
		let s = path.as_str();
		let s = s.strip_prefix("./").unwrap_or(s);
		let mut out = String::with_capacity(s.len());
		for c in s.chars() {
			match c {
				' ' => out.push_str("\\ "),
				'#' => out.push_str("\\#"),
				'$' => out.push_str("$$"),
				'/' if self == PathStyle::Windows => out.push('\\'),
				c => out.push(c),
			}
		}
		out
	}

	/// Render a path as an argument in a shell command.
	///
	/// Arguments with spaces are quoted.
	pub fn shell_arg(self, path: &BuildPath) -> String {
		let native = self.native(path);
		if native.contains(' ') {
			format!("\"{}\"", native)
		} else {
			native
		}
	}

	/// Render a path quoted, as used in object lists.
	pub fn quoted(self, path: &BuildPath) -> String {
		format!("\"{}\"", self.native(path))
	}

	fn native(self, path: &BuildPath) -> String {
		match self {
			PathStyle::Unix => path.as_str().to_string(),
			PathStyle::Windows => path.as_str().replace('/', "\\"),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	#[rustfmt::skip]
	fn test_canonicalize() {
		assert_eq!(canonicalize(""), "");
		assert_eq!(canonicalize("hello"), "hello");
		assert_eq!(canonicalize("./hello"), "hello");
		assert_eq!(canonicalize("foo/./bar/baz"), "foo/bar/baz");
		assert_eq!(canonicalize("foo/bar/baz/./."), "foo/bar/baz");
		assert_eq!(canonicalize("/foo/bar/baz/."), "/foo/bar/baz");
		assert_eq!(canonicalize("foo/../baz"), "baz");
		assert_eq!(canonicalize("foo/.ok"), "foo/.ok");
		assert_eq!(canonicalize(".//foo///bar////..//baz////blah.x"), "foo/baz/blah.x");
		assert_eq!(canonicalize("./."), ".");
		assert_eq!(canonicalize("/."), "/");
		assert_eq!(canonicalize("foo/.."), ".");
		assert_eq!(canonicalize("/foo/../"), "/");
		assert_eq!(canonicalize("/.."), "/");
		assert_eq!(canonicalize("../foo/../"), "..");
		assert_eq!(canonicalize("foo/../../test"), "../test");
		assert_eq!(canonicalize("../x/a/b/../c/../.."), "../x");
		assert_eq!(canonicalize("C:\\src\\..\\lib\\x.c"), "C:/lib/x.c");
	}

	#[test]
	fn absolute_and_join() {
		assert!(BuildPath::new("/usr/lib").is_absolute());
		assert!(BuildPath::new("c:/x").is_absolute());
		assert!(!BuildPath::new("x/y").is_absolute());
		let base = BuildPath::new("/build");
		assert_eq!(base.join("sub/../app").as_str(), "/build/app");
		assert_eq!(base.join("/abs").as_str(), "/abs");
		assert_eq!(BuildPath::new(".").join("x").as_str(), "x");
	}

	#[test]
	fn components_of_path() {
		let p = BuildPath::new("/build/app/a.c");
		assert_eq!(p.parent().as_str(), "/build/app");
		assert_eq!(p.file_name(), "a.c");
		assert_eq!(p.file_stem(), "a");
		assert_eq!(p.extension(), Some("c"));
		assert_eq!(BuildPath::new("/a").parent().as_str(), "/");
		assert_eq!(BuildPath::new("a").parent().as_str(), ".");
		assert_eq!(BuildPath::new("dir/.hidden").extension(), None);
	}

	#[test]
	fn relative_paths() {
		let top = BuildPath::new("/b");
		assert_eq!(BuildPath::new("/b/app/x.o").relative_to(&top).as_str(), "app/x.o");
		assert_eq!(BuildPath::new("/b/lib").relative_to(&BuildPath::new("/b/app")).as_str(), "../lib");
		assert_eq!(top.relative_to(&top).as_str(), ".");
		assert_eq!(BuildPath::new("/b/app").starts_with(&top), true);
		assert_eq!(BuildPath::new("/bx").starts_with(&top), false);
	}

	#[test]
	fn rendering() {
		let p = BuildPath::new("./dir with space/a#$.c");
		assert_eq!(PathStyle::Unix.make_target(&p), "dir\\ with\\ space/a\\#$$.c");
		assert_eq!(PathStyle::Unix.shell_arg(&p), "\"dir with space/a#$.c\"");
		assert_eq!(PathStyle::Windows.shell_arg(&BuildPath::new("a/b")), "a\\b");
		assert_eq!(PathStyle::Unix.quoted(&BuildPath::new("a/b.o")), "\"a/b.o\"");
	}
}
