//! Deciding whether the build system has to be generated again.
//!
//! Every generated makefile starts all passes with a check against the
//! manifest of its directory. The build system is stale when:
//!
//!  - there is no manifest, or it can't be read,
//!  - any of the recorded inputs or outputs is missing, or
//!  - the oldest output is older than the newest input.
//!
//! A manifest without any outputs has nothing that could be out of date.
//!
//! When it is fresh, the dependency ledgers of all recorded objects are
//! checked, and the inconsistent ones are cleared so they are scanned
//! again.

use crate::depends::Ledger;
use crate::error::ModelError;
use crate::listfile::ListFile;
use crate::model::Language;
use crate::mtime::{StatCache, Timestamp};
use log::{debug, warn};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness {
	Fresh,
	/// With the reason.
	Stale(String),
}

impl Freshness {
	pub fn is_fresh(&self) -> bool {
		*self == Freshness::Fresh
	}
}

/// Check the manifest of a directory.
///
/// `None` means there is no manifest to check, so the build system is
/// always stale.
pub fn check_build_system(manifest: Option<&Path>) -> Freshness {
	let manifest = match manifest {
		Some(m) => m,
		None => return Freshness::Stale("no manifest given".to_string()),
	};
	let list = match ListFile::read(manifest) {
		Ok(l) => l,
		Err(e) => return Freshness::Stale(format!("unable to read {:?}: {}", manifest, e)),
	};
	let mut stat_cache = StatCache::new();
	if let Err(reason) = check_times(&list, &mut stat_cache) {
		return Freshness::Stale(reason);
	}

	let dir = manifest.parent().unwrap_or_else(|| Path::new("."));
	let mut cleared = 0;
	for (section, objects) in list.sections() {
		let language = match section.strip_prefix("objects ") {
			Some(l) => l,
			None => continue,
		};
		if Language::from_name(language).is_none() {
			warn!(
				"{}",
				ModelError::NoDependsChecker {
					language: language.to_string()
				}
			);
			continue;
		}
		for object in objects {
			if !Ledger::new(dir, &object[..]).check(&mut stat_cache) {
				cleared += 1;
			}
		}
	}
	debug!("Build system is up to date, {} dependency ledgers cleared", cleared);
	Freshness::Fresh
}

fn check_times(list: &ListFile, stat_cache: &mut StatCache) -> Result<(), String> {
	let inputs = list.get("inputs").ok_or("manifest lists no inputs")?;
	let outputs = list.get("outputs").ok_or("manifest lists no outputs")?;
	let mut newest_input: Option<(Timestamp, &str)> = None;
	for input in inputs {
		let t = existing(stat_cache, input)?;
		if newest_input.map_or(true, |(n, _)| t > n) {
			newest_input = Some((t, input));
		}
	}
	let mut oldest_output: Option<(Timestamp, &str)> = None;
	for output in outputs {
		let t = existing(stat_cache, output)?;
		if oldest_output.map_or(true, |(o, _)| t < o) {
			oldest_output = Some((t, output));
		}
	}
	if let (Some((input_time, input)), Some((output_time, output))) = (newest_input, oldest_output) {
		if output_time < input_time {
			return Err(format!("{} is newer than {}", input, output));
		}
	}
	Ok(())
}

fn existing(stat_cache: &mut StatCache, file: &str) -> Result<Timestamp, String> {
	match stat_cache.mtime(Path::new(file)) {
		Ok(Some(t)) => Ok(t),
		Ok(None) => Err(format!("{} is missing", file)),
		Err(e) => Err(format!("unable to inspect {}: {}", file, e)),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::fs;
	use std::path::PathBuf;
	use std::thread::sleep;
	use std::time::Duration;

	fn tick() {
		sleep(Duration::from_millis(20));
	}

	fn is_stale(f: Freshness) -> bool {
		match f {
			Freshness::Stale(_) => true,
			Freshness::Fresh => false,
		}
	}

	/// A manifest with one input and one output, written in that order.
	fn setup(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
		let input = dir.join("model.json");
		let output = dir.join("Makefile");
		fs::write(&input, "{}").unwrap();
		tick();
		fs::write(&output, "all:\n").unwrap();
		let mut list = ListFile::new();
		list.push("inputs", input.to_str().unwrap());
		list.push("outputs", output.to_str().unwrap());
		let manifest = dir.join("Makefile.manifest");
		list.write(&manifest, "test").unwrap();
		(manifest, input, output)
	}

	#[test]
	fn missing_manifest() {
		let dir = tempfile::tempdir().unwrap();
		assert!(is_stale(check_build_system(None)));
		assert!(is_stale(check_build_system(Some(&dir.path().join("nope")))));
		let bad = dir.path().join("bad");
		fs::write(&bad, "no section").unwrap();
		assert!(is_stale(check_build_system(Some(&bad))));
		let empty = dir.path().join("empty");
		fs::write(&empty, "").unwrap();
		assert!(is_stale(check_build_system(Some(&empty))));
	}

	#[test]
	fn input_newer_than_output() {
		let dir = tempfile::tempdir().unwrap();
		let (manifest, input, output) = setup(dir.path());
		assert_eq!(check_build_system(Some(&manifest)), Freshness::Fresh);
		tick();
		fs::write(&input, "{ }").unwrap();
		assert_eq!(
			check_build_system(Some(&manifest)),
			Freshness::Stale(format!("{} is newer than {}", input.display(), output.display()))
		);
	}

	#[test]
	fn no_outputs() {
		let dir = tempfile::tempdir().unwrap();
		let input = dir.path().join("model.json");
		fs::write(&input, "{}").unwrap();
		let mut list = ListFile::new();
		list.push("inputs", input.to_str().unwrap());
		list.section_mut("outputs");
		let manifest = dir.path().join("Makefile.manifest");
		list.write(&manifest, "test").unwrap();
		assert_eq!(check_build_system(Some(&manifest)), Freshness::Fresh);

		let mut list = ListFile::new();
		list.push("inputs", input.to_str().unwrap());
		list.write(&manifest, "test").unwrap();
		assert!(is_stale(check_build_system(Some(&manifest))));
	}

	#[test]
	fn missing_output() {
		let dir = tempfile::tempdir().unwrap();
		let (manifest, _, output) = setup(dir.path());
		fs::remove_file(&output).unwrap();
		assert_eq!(
			check_build_system(Some(&manifest)),
			Freshness::Stale(format!("{} is missing", output.display()))
		);
	}

	#[test]
	fn inconsistent_ledgers_are_cleared() {
		let dir = tempfile::tempdir().unwrap();
		let (manifest, _, _) = setup(dir.path());
		let mut list = ListFile::read(&manifest).unwrap();
		list.push("objects C", "a.o");
		list.push("objects Cobol", "b.o");
		list.write(&manifest, "test").unwrap();

		let header = dir.path().join("a.h");
		fs::write(&header, "").unwrap();
		let ledger = Ledger::new(dir.path(), "a.o");
		fs::write(
			ledger.fragment(),
			format!("a.o: {}\n", header.display()),
		)
		.unwrap();
		assert!(check_build_system(Some(&manifest)).is_fresh());
		assert!(fs::read_to_string(ledger.fragment()).unwrap().contains("a.h"));

		fs::remove_file(&header).unwrap();
		assert!(check_build_system(Some(&manifest)).is_fresh());
		assert!(!fs::read_to_string(ledger.fragment()).unwrap().contains("a.h"));
	}
}
