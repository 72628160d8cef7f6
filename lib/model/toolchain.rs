//! Toolchain definitions: how to compile and link, and how outputs are named.
//!
//! Rule templates contain `<PLACEHOLDER>`s, which are expanded by the rule
//! generator:
//!
//! | Placeholder        | Expands to                                        |
//! |--------------------|---------------------------------------------------|
//! | `<COMPILER>`       | The compiler of the language                      |
//! | `<FLAGS>`          | Compile flags, or link flags of the language      |
//! | `<SOURCE>`         | The source file                                   |
//! | `<OBJECT>`         | The object file                                   |
//! | `<OBJECTS>`        | All object files of a target                      |
//! | `<TARGET>`         | The file being linked                             |
//! | `<TARGET_BASE>`    | The target file without suffix                    |
//! | `<TARGET_SONAME>`  | The shared library `soname`                       |
//! | `<SONAME_FLAG>`    | The flag setting the `soname`, with the `soname`  |
//! | `<LINK_FLAGS>`     | Target link flags                                 |
//! | `<LINK_LIBRARIES>` | Libraries and library directories to link with    |

use super::target::{Language, TargetKind};
use crate::error::FatalError;
use indexmap::IndexMap;
use serde::Deserialize;

/// Everything known about compiling and linking one language.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LanguageRules {
	pub compiler: String,
	pub compile_object: Option<Vec<String>>,
	pub link_executable: Option<Vec<String>>,
	pub create_static_library: Option<Vec<String>>,
	pub create_shared_library: Option<Vec<String>>,
	pub create_shared_module: Option<Vec<String>>,
	pub flags: String,
	/// Extra flags per configuration, keyed by upper-case configuration name.
	pub config_flags: IndexMap<String, String>,
	/// Flags for code that goes into shared libraries and modules.
	pub shared_flags: String,
	/// Flags for linking shared libraries and modules.
	pub shared_link_flags: String,
	/// The language with the highest preference links a mixed target.
	pub link_preference: u32,
}

/// How the platform names things.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Platform {
	pub executable_suffix: String,
	pub static_library_prefix: String,
	pub static_library_suffix: String,
	pub shared_library_prefix: String,
	pub shared_library_suffix: String,
	pub module_prefix: String,
	pub module_suffix: String,
	pub object_extension: String,
	/// Set when shared libraries carry a `soname`, e.g. `-Wl,-soname,`.
	pub soname_flag: Option<String>,
	/// Executables with `MACOSX_BUNDLE` get a bundle directory layout.
	pub bundles: bool,
	/// Link flags for executables with `WIN32_EXECUTABLE`.
	pub win32_executable_flags: String,
	pub include_flag: String,
	pub define_flag: String,
	pub link_library_flag: String,
	pub link_directory_flag: String,
}

impl Default for Platform {
	fn default() -> Self {
		Platform {
			executable_suffix: String::new(),
			static_library_prefix: "lib".to_string(),
			static_library_suffix: ".a".to_string(),
			shared_library_prefix: "lib".to_string(),
			shared_library_suffix: ".so".to_string(),
			module_prefix: "lib".to_string(),
			module_suffix: ".so".to_string(),
			object_extension: ".o".to_string(),
			soname_flag: Some("-Wl,-soname,".to_string()),
			bundles: false,
			win32_executable_flags: String::new(),
			include_flag: "-I".to_string(),
			define_flag: "-D".to_string(),
			link_library_flag: "-l".to_string(),
			link_directory_flag: "-L".to_string(),
		}
	}
}

/// Rule templates per language, and platform naming.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Toolchain {
	/// Keyed by language name (`C`, `CXX`, ...).
	pub languages: IndexMap<String, LanguageRules>,
	pub platform: Platform,
}

impl Default for Toolchain {
	fn default() -> Self {
		Toolchain::unix()
	}
}

/// The kind of template needed from a [`LanguageRules`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
	CompileObject,
	Link(TargetKind),
}

fn lines(l: &[&str]) -> Option<Vec<String>> {
	Some(l.iter().map(|s| s.to_string()).collect())
}

fn unix_language(compiler: &str, preference: u32, linker: &str) -> LanguageRules {
	let shared = format!(
		"{} <FLAGS> <LINK_FLAGS> <SONAME_FLAG> -o <TARGET> <OBJECTS> <LINK_LIBRARIES>",
		linker
	);
	let executable = format!(
		"{} <FLAGS> <LINK_FLAGS> <OBJECTS> -o <TARGET> <LINK_LIBRARIES>",
		linker
	);
	let mut config_flags = IndexMap::new();
	config_flags.insert("DEBUG".to_string(), "-g".to_string());
	config_flags.insert("RELEASE".to_string(), "-O3 -DNDEBUG".to_string());
	config_flags.insert("MINSIZEREL".to_string(), "-Os -DNDEBUG".to_string());
	config_flags.insert("RELWITHDEBINFO".to_string(), "-O2 -g".to_string());
	LanguageRules {
		compiler: compiler.to_string(),
		compile_object: lines(&["<COMPILER> <FLAGS> -o <OBJECT> -c <SOURCE>"]),
		link_executable: lines(&[executable.as_str()]),
		create_static_library: lines(&[
			"ar cr <TARGET> <LINK_FLAGS> <OBJECTS>",
			"ranlib <TARGET>",
		]),
		create_shared_library: lines(&[shared.as_str()]),
		create_shared_module: lines(&[shared.as_str()]),
		flags: String::new(),
		config_flags,
		shared_flags: "-fPIC".to_string(),
		shared_link_flags: "-shared".to_string(),
		link_preference: preference,
	}
}

impl Toolchain {
	/// A GNU-style toolchain for C, C++ and Fortran.
	pub fn unix() -> Self {
		let mut languages = IndexMap::new();
		languages.insert("C".to_string(), unix_language("cc", 10, "cc"));
		languages.insert("CXX".to_string(), unix_language("c++", 30, "c++"));
		languages.insert(
			"Fortran".to_string(),
			unix_language("gfortran", 20, "gfortran"),
		);
		Toolchain {
			languages,
			platform: Platform::default(),
		}
	}

	pub fn language(&self, lang: Language) -> Option<&LanguageRules> {
		self.languages.get(lang.name())
	}

	/// Get a rule template. Missing templates are fatal: nothing sensible
	/// can be generated without them.
	pub fn template(&self, lang: Language, kind: RuleKind) -> Result<&[String], FatalError> {
		let (field, template) = match self.language(lang) {
			None => ("compiler", None),
			Some(rules) => match kind {
				RuleKind::CompileObject => ("compile_object", rules.compile_object.as_ref()),
				RuleKind::Link(TargetKind::Executable) => {
					("link_executable", rules.link_executable.as_ref())
				}
				RuleKind::Link(TargetKind::StaticLibrary) => {
					("create_static_library", rules.create_static_library.as_ref())
				}
				RuleKind::Link(TargetKind::SharedLibrary) => {
					("create_shared_library", rules.create_shared_library.as_ref())
				}
				RuleKind::Link(TargetKind::ModuleLibrary) => {
					("create_shared_module", rules.create_shared_module.as_ref())
				}
				RuleKind::Link(_) => ("link", None),
			},
		};
		template.map(|t| &t[..]).ok_or_else(|| FatalError::MissingDefinition {
			name: format!("{} {}", lang.name(), field),
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn templates() {
		let t = Toolchain::unix();
		assert_eq!(
			t.template(Language::C, RuleKind::CompileObject).unwrap(),
			&["<COMPILER> <FLAGS> -o <OBJECT> -c <SOURCE>".to_string()]
		);
		assert_eq!(
			t.template(Language::CXX, RuleKind::Link(TargetKind::StaticLibrary))
				.unwrap()
				.len(),
			2
		);
		match t.template(Language::Java, RuleKind::CompileObject) {
			Err(FatalError::MissingDefinition { name }) => assert_eq!(name, "Java compiler"),
			r => panic!("{:?}", r),
		}
		assert!(t
			.template(Language::C, RuleKind::Link(TargetKind::Utility))
			.is_err());
	}

	#[test]
	fn deserialize_partial() {
		let t: Toolchain = serde_json::from_str(
			r#"{ "languages": { "C": { "compiler": "gcc", "compile_object": ["x"] } },
			     "platform": { "object_extension": ".obj" } }"#,
		)
		.unwrap();
		assert_eq!(t.languages["C"].compiler, "gcc");
		assert!(t.languages["C"].link_executable.is_none());
		assert_eq!(t.platform.object_extension, ".obj");
		assert_eq!(t.platform.static_library_prefix, "lib");
	}
}
