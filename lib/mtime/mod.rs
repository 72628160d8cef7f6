//! Getting the `mtime` of files to check if they're older than their inputs.

use std::cmp::{max, Ordering};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Error;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A timestamp of a file, in nanoseconds since the epoch.
///
/// `Option<Timestamp>` is the same size as `Timestamp`, as a timestamp is
/// never 0.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timestamp(NonZeroU64);

impl Timestamp {
	/// A value of `0` means 'no file', and results in [`None`].
	pub fn from_nanos(mtime: u64) -> Option<Self> {
		NonZeroU64::new(mtime).map(Timestamp)
	}

	pub fn to_nanos(self) -> u64 {
		self.0.get()
	}

	/// Convert a [`SystemTime`] to a [`Timestamp`].
	///
	/// Anything at or before the epoch becomes 1 nanosecond after the epoch,
	/// and anything beyond 2^64-1 nanoseconds is capped.
	pub fn from_system_time(time: SystemTime) -> Self {
		let ns = time.duration_since(UNIX_EPOCH).ok().map_or(1, |d| {
			max(
				1,
				d.as_secs()
					.saturating_mul(1_000_000_000)
					.saturating_add(d.subsec_nanos().into()),
			)
		});
		debug_assert!(ns > 0);
		Timestamp(unsafe { NonZeroU64::new_unchecked(ns) })
	}

	pub fn to_system_time(self) -> SystemTime {
		UNIX_EPOCH + Duration::from_nanos(self.to_nanos())
	}
}

/// Looks up the `mtime` of a file. Returns `None` if the file does not exist.
///
/// Each call to this function is a syscall. Use [`StatCache`] when the same
/// files are checked over and over, as is done for shared headers.
pub fn mtime(file: &Path) -> Result<Option<Timestamp>, Error> {
	match std::fs::metadata(file).and_then(|m| m.modified()) {
		Ok(time) => Ok(Some(Timestamp::from_system_time(time))),
		Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e),
	}
}

/// Compare the modification times of two files.
///
/// Returns `None` if either of them does not exist (or can't be inspected),
/// in which case nothing can be concluded.
pub fn compare_file_times(a: &Path, b: &Path) -> Option<Ordering> {
	let a = mtime(a).ok()??;
	let b = mtime(b).ok()??;
	Some(a.cmp(&b))
}

/// A cache that remembers the `mtime`s of files.
#[derive(Debug, Default)]
pub struct StatCache {
	// `None` means the file does not exist.
	cache: HashMap<PathBuf, Option<Timestamp>>,
}

impl StatCache {
	pub fn new() -> Self {
		StatCache {
			cache: HashMap::new(),
		}
	}

	/// Looks up the `mtime` of a file, returns the cached value if it exists.
	pub fn mtime(&mut self, file: &Path) -> Result<Option<Timestamp>, Error> {
		if let Some(&t) = self.cache.get(file) {
			return Ok(t);
		}
		match self.cache.entry(file.to_path_buf()) {
			Entry::Vacant(v) => Ok(*v.insert(mtime(file)?)),
			Entry::Occupied(v) => Ok(*v.get()),
		}
	}

	/// Forget what is known about a file, for example after rewriting it.
	pub fn forget(&mut self, file: &Path) {
		self.cache.remove(file);
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::fs::File;

	#[test]
	fn timestamp_conversion() {
		assert_eq!(Timestamp::from_nanos(0), None);
		let t = Timestamp::from_nanos(1_500_000_000_123).unwrap();
		assert_eq!(Timestamp::from_system_time(t.to_system_time()), t);
		assert_eq!(Timestamp::from_system_time(UNIX_EPOCH).to_nanos(), 1);
	}

	#[test]
	fn missing_files() {
		let dir = tempfile::tempdir().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("b");
		assert_eq!(mtime(&a).unwrap(), None);
		File::create(&a).unwrap();
		assert!(mtime(&a).unwrap().is_some());
		assert_eq!(compare_file_times(&a, &b), None);
		assert_eq!(compare_file_times(&a, &a), Some(Ordering::Equal));
	}

	#[test]
	fn stat_cache_remembers() {
		let dir = tempfile::tempdir().unwrap();
		let a = dir.path().join("a");
		let mut cache = StatCache::new();
		assert_eq!(cache.mtime(&a).unwrap(), None);
		File::create(&a).unwrap();
		assert_eq!(cache.mtime(&a).unwrap(), None);
		cache.forget(&a);
		assert!(cache.mtime(&a).unwrap().is_some());
	}
}
