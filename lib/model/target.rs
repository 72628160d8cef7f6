use super::properties::Properties;
use crate::path::BuildPath;
use serde::Deserialize;
use std::fmt;

/// What a [`Target`] produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
	Executable,
	StaticLibrary,
	SharedLibrary,
	ModuleLibrary,
	/// A phony target: only runs commands and orders other targets.
	Utility,
	InstallFiles,
	InstallPrograms,
}

impl TargetKind {
	/// Targets that only describe what to install. They get no rules.
	pub fn is_install_only(self) -> bool {
		match self {
			TargetKind::InstallFiles | TargetKind::InstallPrograms => true,
			_ => false,
		}
	}

	/// Executables and libraries: targets made by compiling and linking.
	pub fn is_linked(self) -> bool {
		match self {
			TargetKind::Executable
			| TargetKind::StaticLibrary
			| TargetKind::SharedLibrary
			| TargetKind::ModuleLibrary => true,
			_ => false,
		}
	}

	pub fn is_library(self) -> bool {
		self.is_linked() && self != TargetKind::Executable
	}

	/// The words used in messages, e.g. `shared library`.
	pub fn description(self) -> &'static str {
		match self {
			TargetKind::Executable => "executable",
			TargetKind::StaticLibrary => "static library",
			TargetKind::SharedLibrary => "shared library",
			TargetKind::ModuleLibrary => "shared module",
			TargetKind::Utility => "utility",
			TargetKind::InstallFiles => "install files",
			TargetKind::InstallPrograms => "install programs",
		}
	}
}

/// A source language, which decides how a file is compiled and scanned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum Language {
	C,
	CXX,
	RC,
	Fortran,
	Java,
}

impl Language {
	pub const ALL: [Language; 5] = [
		Language::C,
		Language::CXX,
		Language::RC,
		Language::Fortran,
		Language::Java,
	];

	pub fn name(self) -> &'static str {
		match self {
			Language::C => "C",
			Language::CXX => "CXX",
			Language::RC => "RC",
			Language::Fortran => "Fortran",
			Language::Java => "Java",
		}
	}

	pub fn from_name(name: &str) -> Option<Language> {
		Language::ALL.iter().cloned().find(|l| l.name() == name)
	}

	/// Guess the language of a source file from its extension.
	pub fn from_extension(ext: &str) -> Option<Language> {
		Some(match ext {
			"c" => Language::C,
			"C" | "cc" | "cpp" | "cxx" | "c++" | "CPP" | "M" | "mm" => Language::CXX,
			"rc" => Language::RC,
			"f" | "F" | "f77" | "f90" | "f95" | "for" | "F90" => Language::Fortran,
			"java" => Language::Java,
			_ => return None,
		})
	}
}

impl fmt::Display for Language {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "inl", "txx"];
const OBJECT_EXTENSIONS: &[&str] = &["o", "obj", "lo"];

/// A command to run: one argument vector per line.
pub type CommandLine = Vec<String>;

/// Commands with declared outputs and inputs.
///
/// Used both for custom build steps and for the pre-build, pre-link and
/// post-build commands of targets.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CustomCommand {
	pub commands: Vec<CommandLine>,
	pub outputs: Vec<BuildPath>,
	/// Files or target names this command needs.
	pub depends: Vec<String>,
	pub comment: Option<String>,
	pub working_directory: Option<BuildPath>,
}

impl CustomCommand {
	/// The output that gets the actual rule. Others are aliases of it.
	pub fn primary_output(&self) -> Option<&BuildPath> {
		self.outputs.first()
	}
}

/// A source file, as listed by a target.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SourceFile {
	/// Full path. Relative paths in the model are relative to the source
	/// directory.
	pub path: BuildPath,
	/// Overrides the language deduced from the extension.
	#[serde(default)]
	pub language: Option<Language>,
	#[serde(default)]
	pub properties: Properties,
	/// The command that generates this file, if any.
	#[serde(default)]
	pub custom_command: Option<CustomCommand>,
}

impl SourceFile {
	pub fn new(path: impl AsRef<str>) -> Self {
		SourceFile {
			path: BuildPath::new(path),
			language: None,
			properties: Properties::new(),
			custom_command: None,
		}
	}

	pub fn language(&self) -> Option<Language> {
		self.language
			.or_else(|| self.path.extension().and_then(Language::from_extension))
	}

	/// Headers are only dependencies, never compiled.
	pub fn is_header_only(&self) -> bool {
		self.properties.is_on("HEADER_FILE_ONLY")
			|| self
				.path
				.extension()
				.map_or(false, |e| HEADER_EXTENSIONS.contains(&e))
	}

	/// Pre-built objects are linked in directly.
	pub fn is_external_object(&self) -> bool {
		self.properties.is_on("EXTERNAL_OBJECT")
			|| self
				.path
				.extension()
				.map_or(false, |e| OBJECT_EXTENSIONS.contains(&e))
	}
}

/// A named build product.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Target {
	pub name: String,
	pub kind: TargetKind,
	#[serde(default)]
	pub sources: Vec<SourceFile>,
	/// Other targets or external libraries to link with.
	#[serde(default)]
	pub link_libraries: Vec<String>,
	/// Targets that have to be built first.
	#[serde(default)]
	pub utilities: Vec<String>,
	#[serde(default)]
	pub pre_build: Vec<CustomCommand>,
	#[serde(default)]
	pub pre_link: Vec<CustomCommand>,
	#[serde(default)]
	pub post_build: Vec<CustomCommand>,
	#[serde(default)]
	pub properties: Properties,
	/// Part of the default 'build everything' set.
	#[serde(default = "default_in_all")]
	pub in_all: bool,
}

fn default_in_all() -> bool {
	true
}

impl Target {
	pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
		Target {
			name: name.into(),
			kind,
			sources: Vec::new(),
			link_libraries: Vec::new(),
			utilities: Vec::new(),
			pre_build: Vec::new(),
			pre_link: Vec::new(),
			post_build: Vec::new(),
			properties: Properties::new(),
			in_all: true,
		}
	}

	/// All pre-build, pre-link and post-build commands, in that order.
	pub fn build_commands(&self) -> impl Iterator<Item = &CustomCommand> {
		self.pre_build
			.iter()
			.chain(&self.pre_link)
			.chain(&self.post_build)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn source_classification() {
		let c = SourceFile::new("/src/a.c");
		assert_eq!(c.language(), Some(Language::C));
		assert!(!c.is_header_only());
		assert_eq!(SourceFile::new("x.cxx").language(), Some(Language::CXX));
		assert_eq!(SourceFile::new("m.f90").language(), Some(Language::Fortran));
		assert!(SourceFile::new("a.hpp").is_header_only());
		assert!(SourceFile::new("pre.obj").is_external_object());
		let mut s = SourceFile::new("gen.c");
		s.properties.set("HEADER_FILE_ONLY", "ON");
		assert!(s.is_header_only());
		s.language = Some(Language::CXX);
		assert_eq!(s.language(), Some(Language::CXX));
		assert_eq!(SourceFile::new("README").language(), None);
	}

	#[test]
	fn kinds() {
		assert!(TargetKind::InstallFiles.is_install_only());
		assert!(TargetKind::ModuleLibrary.is_library());
		assert!(!TargetKind::Executable.is_library());
		assert!(!TargetKind::Utility.is_linked());
		assert_eq!(Language::from_name("Fortran"), Some(Language::Fortran));
		assert_eq!(Language::from_name("Cobol"), None);
	}
}
