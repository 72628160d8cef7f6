//! Dependency scanning, and the dependency ledger of every object file.
//!
//! For an object file `app.dir/a.o`, the ledger consists of two files:
//!
//! - `app.dir/a.o.depends.make`: A make fragment, with one
//!   `app.dir/a.o: <dependency>` line for every file the object depends on.
//!   It is included by the rules of the object.
//! - `app.dir/a.o.depends`: The *mark*. It is only created right after a
//!   successful scan, so its existence (and timestamp) says the fragment is
//!   current.
//!
//! A [`Ledger`] that turns out to be inconsistent is [cleared][Ledger::clear]:
//! the fragment is replaced by a placeholder, and the mark is removed. This
//! makes the next build rescan the object. Scanning problems never fail the
//! build; they only cost a rescan.

mod dirinfo;
mod scanner;

pub use self::dirinfo::{DirectoryInformation, FILE_NAME as DIRECTORY_INFORMATION};
pub use self::scanner::{ScanOptions, Scanner};

use crate::genfile::GeneratedFile;
use crate::model::Language;
use crate::mtime::StatCache;
use crate::path::{BuildPath, PathStyle};
use log::{debug, error};
use std::collections::BTreeSet;
use std::fs;
use std::io::{Error, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The dependency ledger of one object file.
#[derive(Clone, Debug)]
pub struct Ledger {
	dir: PathBuf,
	object: String,
}

impl Ledger {
	/// The ledger for `object`, relative to the build directory `dir`.
	pub fn new(dir: impl Into<PathBuf>, object: impl Into<String>) -> Self {
		Ledger {
			dir: dir.into(),
			object: object.into(),
		}
	}

	/// The name of the make fragment, relative to the build directory.
	pub fn fragment_name(object: &str) -> String {
		format!("{}.depends.make", object)
	}

	/// The name of the mark file, relative to the build directory.
	pub fn mark_name(object: &str) -> String {
		format!("{}.depends", object)
	}

	pub fn fragment(&self) -> PathBuf {
		self.dir.join(Ledger::fragment_name(&self.object))
	}

	pub fn mark(&self) -> PathBuf {
		self.dir.join(Ledger::mark_name(&self.object))
	}

	/// Store the result of a scan, and touch the mark.
	pub fn write(&self, dependencies: &BTreeSet<BuildPath>, style: PathStyle) -> Result<(), Error> {
		let object = BuildPath::new(&self.object);
		let mut out = GeneratedFile::create(self.fragment())?;
		out.set_copy_if_different(true);
		writeln!(out, "# Dependencies for object file {}.", self.object)?;
		for dep in dependencies {
			writeln!(
				out,
				"{}: {}",
				style.make_target(&object),
				style.make_target(dep)
			)?;
		}
		out.close()?;
		fs::write(
			self.mark(),
			format!("# Dependencies updated for object file {}.\n", self.object),
		)
	}

	/// Forget all dependencies, until the next scan.
	pub fn clear(&self) -> Result<(), Error> {
		debug!("Clearing dependencies of {}", self.object);
		match fs::remove_file(self.mark()) {
			Err(ref e) if e.kind() == ErrorKind::NotFound => {}
			r => r?,
		}
		let mut out = GeneratedFile::create(self.fragment())?;
		out.set_copy_if_different(true);
		write!(
			out,
			"# Empty dependencies file for object file {}.\n\
			 # This may be replaced when dependencies are built.\n",
			self.object
		)?;
		out.close()?;
		Ok(())
	}

	/// Make sure there is a fragment to include, without touching an
	/// existing one.
	pub fn ensure_exists(&self) -> Result<(), Error> {
		if self.fragment().exists() {
			Ok(())
		} else {
			self.clear()
		}
	}

	/// Read the recorded `(depender, dependee)` pairs.
	///
	/// A missing or empty fragment has no pairs.
	pub fn read(&self) -> Result<Vec<(BuildPath, BuildPath)>, Error> {
		let content = match fs::read_to_string(self.fragment()) {
			Ok(c) => c,
			Err(ref e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(e),
		};
		let dir = BuildPath::from_path(&self.dir);
		let mut pairs = Vec::new();
		for line in content.lines() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}
			let sep = find_separator(line).ok_or_else(|| {
				Error::new(
					ErrorKind::InvalidData,
					format!("Invalid line in {:?}: {:?}", self.fragment(), line),
				)
			})?;
			let depender = dir.join(unescape(&line[..sep]));
			let dependee = dir.join(unescape(&line[sep + 1..]));
			pairs.push((depender, dependee));
		}
		Ok(pairs)
	}

	/// Check whether the ledger is still consistent, and clear it if not.
	///
	/// It is inconsistent if it can't be read, if the mark is older than the
	/// fragment, if a dependency no longer exists, or if the object is older
	/// than one of its dependencies. (The latter might have gained new
	/// includes.)
	///
	/// Returns whether the ledger was kept.
	pub fn check(&self, stat_cache: &mut StatCache) -> bool {
		let consistent = match self.is_consistent(stat_cache) {
			Ok(c) => c,
			Err(e) => {
				debug!("Unable to check dependencies of {}: {}", self.object, e);
				false
			}
		};
		if !consistent {
			if let Err(e) = self.clear() {
				error!("Unable to clear dependencies of {}: {}", self.object, e);
			}
		}
		consistent
	}

	fn is_consistent(&self, stat_cache: &mut StatCache) -> Result<bool, Error> {
		let fragment = match stat_cache.mtime(&self.fragment())? {
			Some(t) => t,
			None => return Ok(false),
		};
		match stat_cache.mtime(&self.mark())? {
			Some(mark) if mark >= fragment => {}
			Some(_) => return Ok(false),
			// Not scanned yet. The mark rule takes care of that.
			None => {}
		}
		for (depender, dependee) in self.read()? {
			let dependee_time = match stat_cache.mtime(dependee.as_ref())? {
				Some(t) => t,
				None => {
					debug!("{} no longer exists", dependee);
					return Ok(false);
				}
			};
			if let Some(depender_time) = stat_cache.mtime(depender.as_ref())? {
				if depender_time < dependee_time {
					debug!("{} is older than {}", depender, dependee);
					return Ok(false);
				}
			}
		}
		Ok(true)
	}
}

/// Find the `:` between depender and dependee, skipping escaped characters
/// and drive letters.
fn find_separator(line: &str) -> Option<usize> {
	let bytes = line.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'\\' => i += 1,
			b':' if bytes.get(i + 1).map_or(true, |&b| b == b' ' || b == b'\t') => return Some(i),
			_ => {}
		}
		i += 1;
	}
	None
}

/// Undo [`PathStyle::make_target`].
fn unescape(s: &str) -> String {
	let s = s.trim();
	let mut out = String::with_capacity(s.len());
	let mut chars = s.chars().peekable();
	while let Some(c) = chars.next() {
		match (c, chars.peek()) {
			('\\', Some(&n)) if n == ' ' || n == '#' => {
				out.push(n);
				chars.next();
			}
			('$', Some(&'$')) => {
				out.push('$');
				chars.next();
			}
			(c, _) => out.push(c),
		}
	}
	out
}

/// Scan the dependencies of `object`, and write its ledger.
///
/// This is what the generated mark rules run, from the build directory
/// `dir`. Returns the number of dependencies found.
pub fn scan_and_write(
	dir: &Path,
	info: &DirectoryInformation,
	language: Language,
	object: &str,
	source: &BuildPath,
	style: PathStyle,
) -> Result<usize, Error> {
	let scanner = Scanner::for_language(language).ok_or_else(|| {
		Error::new(
			ErrorKind::InvalidInput,
			format!("No dependency scanner for language {}", language),
		)
	})?;
	let options = ScanOptions::new(
		info.include_path(language),
		&info.scan_pattern,
		&info.complain_pattern,
	)?;
	let ledger = Ledger::new(dir, object);
	let source = BuildPath::from_path(dir).join(source.as_str());
	let dependencies = match scanner.scan(&source, &options) {
		Ok(d) => d,
		Err(e) => {
			// Leave a ledger that forces another scan next time.
			ledger.clear()?;
			return Err(e);
		}
	};
	ledger.write(&dependencies, style)?;
	Ok(dependencies.len())
}

/// Write an empty ledger, for objects with scanning disabled.
pub fn write_empty(dir: &Path, object: &str, style: PathStyle) -> Result<(), Error> {
	Ledger::new(dir, object).write(&BTreeSet::new(), style)
}
