//! Finding the files a source file includes.

use crate::model::Language;
use crate::path::BuildPath;
use log::{debug, warn};
use raw_string::RawStr;
use regex::bytes::Regex;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::io::{Error, ErrorKind};
use std::iter::once;
use std::path::Path;

/// How includes are found in a language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scanner {
	/// `#include "x"` and `#include <x>`.
	Preprocessor,
	/// `INCLUDE 'x'`, `#include "x"`, and `USE module`.
	Fortran,
	/// `import a.b.C;`.
	Java,
}

/// Where and what to scan.
#[derive(Debug)]
pub struct ScanOptions<'a> {
	pub include_path: &'a [BuildPath],
	/// Only includes matching this are followed.
	pub scan: Regex,
	/// Includes matching this are reported when they can't be found.
	pub complain: Regex,
}

impl<'a> ScanOptions<'a> {
	pub fn new(include_path: &'a [BuildPath], scan: &str, complain: &str) -> Result<Self, Error> {
		let compile = |pattern: &str| {
			Regex::new(pattern).map_err(|e| {
				Error::new(
					ErrorKind::InvalidInput,
					format!("Invalid include pattern {:?}: {}", pattern, e),
				)
			})
		};
		Ok(ScanOptions {
			include_path,
			scan: compile(scan)?,
			complain: compile(complain)?,
		})
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IncludeKind {
	/// `"x"`: look next to the including file first.
	Quoted,
	/// `<x>`: only look on the include path.
	Angled,
	/// A compiled module interface. Never scanned itself.
	Module,
}

#[derive(Debug, PartialEq, Eq)]
struct Include {
	name: String,
	kind: IncludeKind,
}

struct Patterns {
	include: Regex,
	fortran_include: Regex,
	fortran_use: Regex,
	java_import: Regex,
}

impl Patterns {
	fn new() -> Self {
		// These are constant, and known to be valid.
		let re = |s: &str| Regex::new(s).unwrap();
		Patterns {
			include: re(r#"^\s*#\s*include\s*(["<])([^">]+)[">]"#),
			fortran_include: re(r#"(?i)^\s*include\s*['"]([^'"]+)['"]"#),
			fortran_use: re(r"(?i)^\s*use\s*(?:,\s*non_intrinsic\s*::\s*|::\s*|\s)\s*(\w+)"),
			java_import: re(r"^\s*import\s+(static\s+)?([\w.]+)\s*;"),
		}
	}
}

impl Scanner {
	/// The scanner for a language, if there is one.
	pub fn for_language(language: Language) -> Option<Scanner> {
		match language {
			Language::C | Language::CXX | Language::RC => Some(Scanner::Preprocessor),
			Language::Fortran => Some(Scanner::Fortran),
			Language::Java => Some(Scanner::Java),
		}
	}

	/// Find all files `source` depends on, following includes recursively.
	///
	/// The result includes `source` itself. Includes that can't be found are
	/// left out.
	pub fn scan(self, source: &BuildPath, options: &ScanOptions) -> Result<BTreeSet<BuildPath>, Error> {
		let patterns = Patterns::new();
		let mut deps = BTreeSet::new();
		let mut scanned = HashSet::new();
		let mut queue = VecDeque::new();

		deps.insert(source.clone());
		queue.push_back(source.clone());

		while let Some(file) = queue.pop_front() {
			if !scanned.insert(file.clone()) {
				continue;
			}
			let content = match std::fs::read(file.to_path_buf()) {
				Ok(content) => content,
				Err(e) if &file == source => {
					return Err(Error::new(
						e.kind(),
						format!("Unable to read {:?}: {}", source, e),
					));
				}
				Err(e) => {
					debug!("Unable to scan {:?}: {}", file, e);
					continue;
				}
			};
			for include in self.includes(&patterns, &content) {
				if !options.scan.is_match(include.name.as_bytes()) {
					continue;
				}
				match resolve(&include, &file, options.include_path) {
					Some(path) => {
						if deps.insert(path.clone()) && include.kind != IncludeKind::Module {
							queue.push_back(path);
						}
					}
					None => {
						if options.complain.is_match(include.name.as_bytes()) {
							warn!("Cannot find file {:?} (included from {:?})", include.name, file);
						}
					}
				}
			}
		}

		Ok(deps)
	}

	fn includes(self, patterns: &Patterns, content: &[u8]) -> Vec<Include> {
		let mut result = Vec::new();
		let mut start = 0;
		for end in memchr::memchr_iter(b'\n', content).chain(once(content.len())) {
			let line = &content[start..end];
			start = end + 1;
			if let Some(include) = self.parse_line(patterns, line) {
				result.push(include);
			}
		}
		result
	}

	fn parse_line(self, patterns: &Patterns, line: &[u8]) -> Option<Include> {
		let text = |bytes: &[u8]| RawStr::from_bytes(bytes).to_str().ok().map(str::to_string);
		match self {
			Scanner::Preprocessor => preprocessor_include(patterns, line, text),
			Scanner::Fortran => {
				if let Some(include) = preprocessor_include(patterns, line, text) {
					return Some(include);
				}
				if let Some(c) = patterns.fortran_include.captures(line) {
					return Some(Include {
						name: text(&c[1])?,
						kind: IncludeKind::Quoted,
					});
				}
				let c = patterns.fortran_use.captures(line)?;
				let module = text(&c[1])?.to_lowercase();
				if module == "intrinsic" {
					return None;
				}
				Some(Include {
					name: format!("{}.mod", module),
					kind: IncludeKind::Module,
				})
			}
			Scanner::Java => {
				let c = patterns.java_import.captures(line)?;
				let name = text(&c[2])?;
				let mut parts: Vec<&str> = name.split('.').collect();
				if c.get(1).is_some() {
					// Static import: The last part is a member of the class.
					parts.pop();
				}
				if parts.is_empty() {
					return None;
				}
				Some(Include {
					name: format!("{}.java", parts.join("/")),
					kind: IncludeKind::Angled,
				})
			}
		}
	}
}

fn preprocessor_include(
	patterns: &Patterns,
	line: &[u8],
	text: impl Fn(&[u8]) -> Option<String>,
) -> Option<Include> {
	let c = patterns.include.captures(line)?;
	Some(Include {
		name: text(&c[2])?,
		kind: if &c[1] == b"\"" {
			IncludeKind::Quoted
		} else {
			IncludeKind::Angled
		},
	})
}

fn resolve(include: &Include, from: &BuildPath, include_path: &[BuildPath]) -> Option<BuildPath> {
	let name = BuildPath::new(&include.name);
	if name.is_absolute() {
		return if exists(&name) { Some(name) } else { None };
	}
	let here = if include.kind == IncludeKind::Quoted {
		Some(from.parent())
	} else {
		None
	};
	here.iter()
		.chain(include_path)
		.map(|dir| dir.join(name.as_str()))
		.find(exists)
}

fn exists(path: &BuildPath) -> bool {
	Path::new(path.as_str()).is_file()
}

#[cfg(test)]
mod test {
	use super::*;
	use std::fs;

	fn bp(p: &Path) -> BuildPath {
		BuildPath::from_path(p)
	}

	#[test]
	fn preprocessor_closure() {
		let dir = tempfile::tempdir().unwrap();
		let inc = dir.path().join("inc");
		fs::create_dir(&inc).unwrap();
		fs::write(dir.path().join("main.c"), "#include \"a.h\"\n  # include <sys.h>\nint x;\n").unwrap();
		fs::write(dir.path().join("a.h"), "#include <b.h>\n#include \"a.h\"\n").unwrap();
		fs::write(inc.join("b.h"), "/* nothing */").unwrap();

		let include_path = [bp(&inc)];
		let options = ScanOptions::new(&include_path, "^.*$", "^$").unwrap();
		let source = bp(&dir.path().join("main.c"));
		let deps = Scanner::Preprocessor.scan(&source, &options).unwrap();
		let expected: BTreeSet<BuildPath> = vec![
			source.clone(),
			bp(&dir.path().join("a.h")),
			bp(&inc.join("b.h")),
		]
		.into_iter()
		.collect();
		assert_eq!(deps, expected);

		// Deleting a header removes it from the result.
		fs::remove_file(inc.join("b.h")).unwrap();
		let deps = Scanner::Preprocessor.scan(&source, &options).unwrap();
		assert_eq!(deps.len(), 2);
		assert!(!deps.contains(&bp(&inc.join("b.h"))));
	}

	#[test]
	fn scan_pattern_limits() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("main.c"), "#include \"a.h\"\n#include \"b.hpp\"\n").unwrap();
		fs::write(dir.path().join("a.h"), "").unwrap();
		fs::write(dir.path().join("b.hpp"), "").unwrap();
		let options = ScanOptions::new(&[], r"\.h$", "^$").unwrap();
		let deps = Scanner::Preprocessor
			.scan(&bp(&dir.path().join("main.c")), &options)
			.unwrap();
		assert!(deps.contains(&bp(&dir.path().join("a.h"))));
		assert!(!deps.contains(&bp(&dir.path().join("b.hpp"))));
		assert!(ScanOptions::new(&[], "(", "^$").is_err());
	}

	#[test]
	fn missing_source() {
		let options = ScanOptions::new(&[], "^.*$", "^$").unwrap();
		let e = Scanner::Preprocessor
			.scan(&BuildPath::new("/nonexistent/x.c"), &options)
			.unwrap_err();
		assert_eq!(e.kind(), ErrorKind::NotFound);
	}

	#[test]
	fn fortran_and_java() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join("prog.f90"),
			"program p\n  use Shapes\n  use, intrinsic :: iso_c_binding\n  include 'consts.inc'\nend\n",
		)
		.unwrap();
		fs::write(dir.path().join("consts.inc"), "integer, parameter :: n = 1\n").unwrap();
		fs::write(dir.path().join("shapes.mod"), "binary").unwrap();
		let include_path = [bp(dir.path())];
		let options = ScanOptions::new(&include_path, "^.*$", "^$").unwrap();
		let deps = Scanner::Fortran
			.scan(&bp(&dir.path().join("prog.f90")), &options)
			.unwrap();
		assert!(deps.contains(&bp(&dir.path().join("consts.inc"))));
		assert!(deps.contains(&bp(&dir.path().join("shapes.mod"))));
		assert_eq!(deps.len(), 3);

		fs::create_dir_all(dir.path().join("org/demo")).unwrap();
		fs::write(dir.path().join("org/demo/Util.java"), "package org.demo;\n").unwrap();
		fs::write(
			dir.path().join("Main.java"),
			"import org.demo.Util;\nimport java.util.*;\nimport static org.demo.Util.helper;\n",
		)
		.unwrap();
		let deps = Scanner::Java
			.scan(&bp(&dir.path().join("Main.java")), &options)
			.unwrap();
		assert!(deps.contains(&bp(&dir.path().join("org/demo/Util.java"))));
		assert_eq!(deps.len(), 2);
	}
}
