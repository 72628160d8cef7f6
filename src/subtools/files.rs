//! Small file operations that generated rules run, so they don't depend on
//! the shell of the platform.

use log::{debug, error};
use rulegen::genfile::{copy_if_different, Published};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

/// Remove files. With `force`, missing files are not an error.
pub(super) fn remove(files: &[PathBuf], force: bool) -> Result<bool, Error> {
	let mut ok = true;
	for file in files {
		match fs::remove_file(file) {
			Ok(()) => debug!("Removed {:?}", file),
			Err(ref e) if force && e.kind() == ErrorKind::NotFound => {}
			Err(e) => {
				error!("Unable to remove {:?}: {}", file, e);
				ok = false;
			}
		}
	}
	Ok(ok)
}

/// Make `so_name` and `name` refer to `real_name`, in the directory of
/// `real_name`.
///
/// `so_name` links to `real_name`, `name` to `so_name`. Links with the same
/// name as what they'd point to are skipped.
pub(super) fn symlink_library(real_name: &Path, so_name: &Path, name: &Path) -> Result<(), Error> {
	let file_name = |p: &Path| {
		p.file_name()
			.map(PathBuf::from)
			.ok_or_else(|| Error::new(ErrorKind::InvalidInput, format!("Not a file: {:?}", p)))
	};
	let dir = real_name.parent().unwrap_or_else(|| Path::new(""));
	let real = file_name(real_name)?;
	let so = file_name(so_name)?;
	let plain = file_name(name)?;
	if so != real {
		link(&real, &dir.join(&so))?;
	}
	if plain != so {
		link(&so, &dir.join(&plain))?;
	}
	Ok(())
}

fn link(target: &Path, link: &Path) -> Result<(), Error> {
	match fs::remove_file(link) {
		Err(ref e) if e.kind() == ErrorKind::NotFound => {}
		r => r?,
	}
	debug!("Linking {:?} to {:?}", link, target);
	symlink(target, link)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> Result<(), Error> {
	std::os::unix::fs::symlink(target, link)
}

// No symbolic links without special privileges, so copy instead.
#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> Result<(), Error> {
	let dir = link.parent().unwrap_or_else(|| Path::new(""));
	fs::copy(dir.join(target), link).map(|_| ())
}

pub(super) fn copy(source: &Path, destination: &Path) -> Result<(), Error> {
	match copy_if_different(source, destination)? {
		Published::Replaced => debug!("Copied {:?} to {:?}", source, destination),
		Published::Unchanged => debug!("{:?} is up to date", destination),
	}
	Ok(())
}

pub(super) fn make_directories(directories: &[PathBuf]) -> Result<(), Error> {
	for dir in directories {
		fs::create_dir_all(dir).map_err(|e| {
			Error::new(e.kind(), format!("Unable to create directory {:?}: {}", dir, e))
		})?;
	}
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn remove_files() {
		let dir = tempfile::tempdir().unwrap();
		let a = dir.path().join("a");
		fs::write(&a, "").unwrap();
		let missing = dir.path().join("missing");
		assert!(remove(&[a.clone(), missing.clone()], true).unwrap());
		assert!(!a.exists());
		assert!(!remove(&[missing], false).unwrap());
	}

	#[cfg(unix)]
	#[test]
	fn library_links() {
		let dir = tempfile::tempdir().unwrap();
		let real = dir.path().join("libfoo.so.1.2");
		fs::write(&real, "").unwrap();
		let so = dir.path().join("libfoo.so.1");
		let name = dir.path().join("libfoo.so");
		fs::write(&so, "stale").unwrap();
		symlink_library(&real, &so, &name).unwrap();
		assert_eq!(fs::read_link(&so).unwrap(), Path::new("libfoo.so.1.2"));
		assert_eq!(fs::read_link(&name).unwrap(), Path::new("libfoo.so.1"));

		// Without a version, there is nothing to link.
		let plain = dir.path().join("libbar.so");
		fs::write(&plain, "").unwrap();
		symlink_library(&plain, &plain, &plain).unwrap();
		assert!(fs::read_link(&plain).is_err());
	}

	#[test]
	fn directories() {
		let dir = tempfile::tempdir().unwrap();
		let deep = dir.path().join("a/b/c");
		make_directories(&[deep.clone(), deep.clone()]).unwrap();
		assert!(deep.is_dir());
	}
}
