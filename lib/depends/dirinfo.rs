use crate::error::ErrorWithLocation;
use crate::genfile::Published;
use crate::listfile::{ListFile, ParseError};
use crate::model::{is_on, Language};
use crate::path::BuildPath;
use std::collections::BTreeMap;
use std::io::Error;
use std::path::{Path, PathBuf};

/// The name of the file, in each build directory.
pub const FILE_NAME: &str = "DirectoryInformation.list";

/// What a dependency scan in a directory needs to know.
///
/// Written by the generator, read back by the `depends` command that the
/// generated rules run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryInformation {
	pub include_paths: BTreeMap<Language, Vec<BuildPath>>,
	pub scan_pattern: String,
	pub complain_pattern: String,
	pub force_unix_paths: bool,
}

impl Default for DirectoryInformation {
	fn default() -> Self {
		DirectoryInformation {
			include_paths: BTreeMap::new(),
			scan_pattern: "^.*$".to_string(),
			complain_pattern: "^$".to_string(),
			force_unix_paths: false,
		}
	}
}

impl DirectoryInformation {
	pub fn path(dir: &Path) -> PathBuf {
		dir.join(FILE_NAME)
	}

	pub fn include_path(&self, language: Language) -> &[BuildPath] {
		self.include_paths
			.get(&language)
			.map_or(&[][..], |v| &v[..])
	}

	pub fn to_list(&self) -> ListFile {
		let mut list = ListFile::new();
		for (lang, paths) in &self.include_paths {
			let section = list.section_mut(format!("include_path {}", lang));
			section.extend(paths.iter().map(|p| p.to_string()));
		}
		list.push("include_scan_pattern", self.scan_pattern.clone());
		list.push("include_complain_pattern", self.complain_pattern.clone());
		list.push(
			"force_unix_paths",
			if self.force_unix_paths { "1" } else { "0" },
		);
		list
	}

	pub fn from_list(list: &ListFile) -> Self {
		let mut info = DirectoryInformation::default();
		for (name, items) in list.sections() {
			let mut words = name.split(' ');
			match (words.next(), words.next().and_then(Language::from_name)) {
				(Some("include_path"), Some(lang)) => {
					info.include_paths
						.insert(lang, items.iter().map(BuildPath::new).collect());
				}
				(Some("include_scan_pattern"), None) => {
					if let Some(p) = items.first() {
						info.scan_pattern = p.clone();
					}
				}
				(Some("include_complain_pattern"), None) => {
					if let Some(p) = items.first() {
						info.complain_pattern = p.clone();
					}
				}
				(Some("force_unix_paths"), None) => {
					info.force_unix_paths = items.first().map_or(false, |v| is_on(v));
				}
				_ => {}
			}
		}
		info
	}

	/// Read the information of a build directory.
	///
	/// A missing file means nothing special was configured.
	pub fn read(dir: &Path) -> Result<Self, ErrorWithLocation<ParseError>> {
		let path = DirectoryInformation::path(dir);
		if !path.exists() {
			return Ok(DirectoryInformation::default());
		}
		ListFile::read(&path).map(|list| DirectoryInformation::from_list(&list))
	}

	pub fn write(&self, dir: &Path) -> Result<Published, Error> {
		self.to_list()
			.write(DirectoryInformation::path(dir), "Directory information, used by dependency scans.")
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn write_and_read() {
		let dir = tempfile::tempdir().unwrap();
		assert_eq!(
			DirectoryInformation::read(dir.path()).unwrap(),
			DirectoryInformation::default()
		);
		let mut info = DirectoryInformation::default();
		info.include_paths
			.insert(Language::C, vec![BuildPath::new("/src/inc")]);
		info.complain_pattern = r"\.h$".to_string();
		info.force_unix_paths = true;
		info.write(dir.path()).unwrap();
		let back = DirectoryInformation::read(dir.path()).unwrap();
		assert_eq!(back, info);
		assert_eq!(back.include_path(Language::C), &[BuildPath::new("/src/inc")]);
		assert!(back.include_path(Language::CXX).is_empty());
	}
}
