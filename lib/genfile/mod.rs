//! Writing generated files atomically.
//!
//! A [`GeneratedFile`] writes to a staging file next to its destination
//! (`<path>.tmp`). Only [`close`][GeneratedFile::close] publishes it, with a
//! single rename. A reader of the destination therefore sees either the old
//! or the new content, never something in between. A writer that is dropped
//! without being closed throws its staging file away.
//!
//! In *copy-if-different* mode, the destination is left alone (including its
//! timestamp) if the new content is byte-for-byte identical. This keeps
//! everything that depends on a generated file from being rebuilt when
//! regeneration didn't change anything.

use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Error, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// What [`GeneratedFile::close`] did with the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Published {
	/// The destination now has the new content.
	Replaced,
	/// The content was identical, the destination was not touched.
	Unchanged,
}

/// A file that is being generated.
#[derive(Debug)]
pub struct GeneratedFile {
	destination: PathBuf,
	staging: PathBuf,
	file: Option<BufWriter<File>>,
	copy_if_different: bool,
	compression: bool,
	compression_extra_extension: bool,
}

impl GeneratedFile {
	/// Start generating a file.
	///
	/// Creates the parent directory if necessary, and removes any stale
	/// staging file left behind by an earlier run.
	pub fn create(destination: impl Into<PathBuf>) -> Result<Self, Error> {
		let destination = destination.into();
		let staging = staging_path(&destination);
		if let Some(dir) = destination.parent() {
			if !dir.as_os_str().is_empty() {
				fs::create_dir_all(dir).map_err(|e| {
					Error::new(
						e.kind(),
						format!("Unable to create directory {:?}: {}", dir, e),
					)
				})?;
			}
		}
		remove_if_exists(&staging)?;
		let file = File::create(&staging).map_err(|e| {
			Error::new(
				e.kind(),
				format!("Unable to create {:?}: {}", staging, e),
			)
		})?;
		Ok(GeneratedFile {
			destination,
			staging,
			file: Some(BufWriter::new(file)),
			copy_if_different: false,
			compression: false,
			compression_extra_extension: true,
		})
	}

	/// Only replace the destination if the content differs.
	pub fn set_copy_if_different(&mut self, copy_if_different: bool) {
		self.copy_if_different = copy_if_different;
	}

	/// Publish the content gzip-compressed.
	pub fn set_compression(&mut self, compression: bool) {
		self.compression = compression;
	}

	/// Whether a compressed file is published as `<path>.gz` (the default), or
	/// under the destination path itself.
	pub fn set_compression_extra_extension(&mut self, extra: bool) {
		self.compression_extra_extension = extra;
	}

	/// The path the content will be published to.
	pub fn destination(&self) -> PathBuf {
		if self.compression && self.compression_extra_extension {
			let mut name = self.destination.clone().into_os_string();
			name.push(".gz");
			PathBuf::from(name)
		} else {
			self.destination.clone()
		}
	}

	/// Finish writing, and publish the file.
	///
	/// The staging file is removed in all cases.
	pub fn close(mut self) -> Result<Published, Error> {
		let result = self.publish();
		if let Err(e) = remove_if_exists(&self.staging) {
			debug!("Unable to remove {:?}: {}", self.staging, e);
		}
		result
	}

	fn publish(&mut self) -> Result<Published, Error> {
		let file = match self.file.take() {
			Some(file) => file,
			None => return Err(Error::new(ErrorKind::Other, "File already closed")),
		};
		file.into_inner().map_err(|e| e.into_error())?.sync_all()?;

		let destination = self.destination();

		let source = if self.compression {
			let compressed = with_extension_suffix(&self.staging, ".temp.gz");
			compress(&self.staging, &compressed)?;
			remove_if_exists(&self.staging)?;
			fs::rename(&compressed, &self.staging)?;
			self.staging.clone()
		} else {
			self.staging.clone()
		};

		if self.copy_if_different && !files_differ(&source, &destination)? {
			debug!("{:?} is unchanged", destination);
			return Ok(Published::Unchanged);
		}

		rename(&source, &destination)?;
		debug!("Wrote {:?}", destination);
		Ok(Published::Replaced)
	}
}

impl Write for GeneratedFile {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.file.as_mut() {
			Some(f) => f.write(buf),
			None => Err(Error::new(ErrorKind::Other, "File already closed")),
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.file.as_mut() {
			Some(f) => f.flush(),
			None => Ok(()),
		}
	}
}

impl Drop for GeneratedFile {
	fn drop(&mut self) {
		if self.file.take().is_some() {
			// Never closed: The destination stays as it was.
			let _ = fs::remove_file(&self.staging);
		}
	}
}

fn staging_path(destination: &Path) -> PathBuf {
	with_extension_suffix(destination, ".tmp")
}

fn with_extension_suffix(path: &Path, suffix: &str) -> PathBuf {
	let mut name = path.as_os_str().to_owned();
	name.push(suffix);
	PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> Result<(), Error> {
	match fs::remove_file(path) {
		Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(()),
		r => r,
	}
}

fn compress(source: &Path, destination: &Path) -> Result<(), Error> {
	let mut input = File::open(source)?;
	let mut encoder = GzEncoder::new(File::create(destination)?, Compression::default());
	io::copy(&mut input, &mut encoder)?;
	encoder.finish()?.sync_all()
}

/// Rename `source` over `destination`.
///
/// Where the rename can't replace an existing file, the destination is
/// removed first and the rename is tried once more.
fn rename(source: &Path, destination: &Path) -> Result<(), Error> {
	match fs::rename(source, destination) {
		Ok(()) => Ok(()),
		Err(first) => {
			if !destination.exists() {
				return Err(Error::new(
					first.kind(),
					format!("Unable to rename {:?} to {:?}: {}", source, destination, first),
				));
			}
			remove_if_exists(destination)?;
			fs::rename(source, destination).map_err(|e| {
				Error::new(
					e.kind(),
					format!("Unable to rename {:?} to {:?}: {}", source, destination, e),
				)
			})
		}
	}
}

/// Whether the two files have different content.
///
/// A missing file is different from any existing file.
pub fn files_differ(a: &Path, b: &Path) -> Result<bool, Error> {
	let (fa, fb) = match (File::open(a), File::open(b)) {
		(Ok(fa), Ok(fb)) => (fa, fb),
		(Err(ref e), _) | (_, Err(ref e)) if e.kind() == ErrorKind::NotFound => return Ok(true),
		(Err(e), _) | (_, Err(e)) => return Err(e),
	};
	if fa.metadata()?.len() != fb.metadata()?.len() {
		return Ok(true);
	}
	let mut ra = BufReader::new(fa);
	let mut rb = BufReader::new(fb);
	let mut buf_a = [0u8; 8192];
	let mut buf_b = [0u8; 8192];
	loop {
		let n = ra.read(&mut buf_a)?;
		if n == 0 {
			return Ok(false);
		}
		rb.read_exact(&mut buf_b[..n])?;
		if buf_a[..n] != buf_b[..n] {
			return Ok(true);
		}
	}
}

/// Copy `source` to `destination`, unless they already have the same content.
pub fn copy_if_different(source: &Path, destination: &Path) -> Result<Published, Error> {
	let destination = if destination.is_dir() {
		match source.file_name() {
			Some(name) => destination.join(name),
			None => destination.to_path_buf(),
		}
	} else {
		destination.to_path_buf()
	};
	if !files_differ(source, &destination)? {
		return Ok(Published::Unchanged);
	}
	let mut out = GeneratedFile::create(&destination)?;
	io::copy(&mut File::open(source)?, &mut out)?;
	out.close()
}
