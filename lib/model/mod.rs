//! The target model: directories, targets, source files and commands.
//!
//! The model is produced by an external interpreter of the project
//! description, as a JSON document:
//!
//! ```json
//! {
//!   "settings": { "backend": "Unix Makefiles" },
//!   "directories": [
//!     {
//!       "source_dir": "/src", "binary_dir": "/build", "project": "demo",
//!       "children": ["/build/lib", "/build/app"]
//!     },
//!     {
//!       "source_dir": "/src/app", "binary_dir": "/build/app", "project": "demo",
//!       "targets": [
//!         { "name": "app", "kind": "executable",
//!           "sources": [{ "path": "a.c" }, { "path": "b.c" }],
//!           "link_libraries": ["foo"] }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The first directory is the top of the tree. Relative source paths are
//! relative to the source directory they are declared in, relative output
//! paths of custom commands to the binary directory.
//!
//! The model is read-only once loaded.

mod properties;
mod settings;
mod target;
mod toolchain;

pub use self::properties::{is_off, is_on, Properties};
pub use self::settings::Settings;
pub use self::target::{CommandLine, CustomCommand, Language, SourceFile, Target, TargetKind};
pub use self::toolchain::{LanguageRules, Platform, RuleKind, Toolchain};

use crate::error::FatalError;
use crate::path::BuildPath;
use serde::Deserialize;
use std::io::{Error, ErrorKind};
use std::path::Path;

/// The complete target model.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Model {
	pub settings: Settings,
	pub toolchain: Toolchain,
	pub directories: Vec<Directory>,
}

/// One directory of the source tree, and its build directory.
#[derive(Clone, Debug, Deserialize)]
pub struct Directory {
	pub source_dir: BuildPath,
	pub binary_dir: BuildPath,
	pub project: String,
	/// Variables like `LIBRARY_OUTPUT_PATH` and `EXECUTABLE_OUTPUT_PATH`.
	#[serde(default)]
	pub definitions: Properties,
	#[serde(default)]
	pub properties: Properties,
	#[serde(default)]
	pub include_directories: Vec<BuildPath>,
	#[serde(default)]
	pub link_directories: Vec<BuildPath>,
	/// Flags like `-DFOO=1`, added to every compile command.
	#[serde(default)]
	pub compile_definitions: Vec<String>,
	/// Only includes matching this are followed by dependency scans.
	#[serde(default = "default_scan_pattern")]
	pub include_scan_pattern: String,
	/// Includes matching this are reported when they can't be found.
	#[serde(default = "default_complain_pattern")]
	pub include_complain_pattern: String,
	/// The project description files this directory was read from.
	#[serde(default)]
	pub list_files: Vec<BuildPath>,
	/// Build this directory before its parent.
	#[serde(default)]
	pub pre_order: bool,
	#[serde(default)]
	pub exclude_from_all: bool,
	/// Binary directories of the subdirectories, in declared order.
	#[serde(default)]
	pub children: Vec<BuildPath>,
	#[serde(default)]
	pub targets: Vec<Target>,
}

fn default_scan_pattern() -> String {
	"^.*$".to_string()
}

fn default_complain_pattern() -> String {
	"^$".to_string()
}

impl Directory {
	pub fn new(source_dir: impl AsRef<str>, binary_dir: impl AsRef<str>, project: &str) -> Self {
		Directory {
			source_dir: BuildPath::new(source_dir),
			binary_dir: BuildPath::new(binary_dir),
			project: project.to_string(),
			definitions: Properties::new(),
			properties: Properties::new(),
			include_directories: Vec::new(),
			link_directories: Vec::new(),
			compile_definitions: Vec::new(),
			include_scan_pattern: default_scan_pattern(),
			include_complain_pattern: default_complain_pattern(),
			list_files: Vec::new(),
			pre_order: false,
			exclude_from_all: false,
			children: Vec::new(),
			targets: Vec::new(),
		}
	}

	pub fn target(&self, name: &str) -> Option<&Target> {
		self.targets.iter().find(|t| t.name == name)
	}

	/// Make all relative paths absolute.
	fn resolve_paths(&mut self) {
		let source_dir = self.source_dir.clone();
		let binary_dir = self.binary_dir.clone();
		let in_source = |p: &mut BuildPath| *p = source_dir.join(p.as_str());
		let in_binary = |p: &mut BuildPath| *p = binary_dir.join(p.as_str());

		self.include_directories.iter_mut().for_each(in_source);
		self.list_files.iter_mut().for_each(in_source);
		self.children.iter_mut().for_each(in_binary);

		for target in &mut self.targets {
			for source in &mut target.sources {
				let generated = source.custom_command.is_some();
				if let Some(cc) = source.custom_command.as_mut() {
					cc.outputs.iter_mut().for_each(in_binary);
				}
				if generated {
					in_binary(&mut source.path);
				} else {
					in_source(&mut source.path);
				}
			}
			for cc in target
				.pre_build
				.iter_mut()
				.chain(&mut target.pre_link)
				.chain(&mut target.post_build)
			{
				cc.outputs.iter_mut().for_each(in_binary);
			}
		}
	}
}

impl Model {
	/// Read a model from a JSON file.
	pub fn load(file: impl AsRef<Path>) -> Result<Model, FatalError> {
		let file = file.as_ref();
		let error = |error| FatalError::Model {
			file: file.to_path_buf(),
			error,
		};
		let data = std::fs::read(file).map_err(error)?;
		Model::from_json(&data).map_err(error)
	}

	/// Parse a model from JSON.
	pub fn from_json(data: &[u8]) -> Result<Model, Error> {
		let mut model: Model =
			serde_json::from_slice(data).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
		if model.directories.is_empty() {
			return Err(Error::new(ErrorKind::InvalidData, "No directories"));
		}
		for dir in &mut model.directories {
			dir.resolve_paths();
		}
		Ok(model)
	}

	/// The top directory of the tree.
	///
	/// Panics if there are no directories. [`Model::from_json`] refuses
	/// such models.
	pub fn top(&self) -> &Directory {
		&self.directories[0]
	}

	pub fn directory(&self, binary_dir: &BuildPath) -> Option<&Directory> {
		self.directories.iter().find(|d| &d.binary_dir == binary_dir)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	const MODEL: &str = r#"{
		"settings": { "backend": "Unix Makefiles", "mangle_object_names": true },
		"directories": [
			{ "source_dir": "/src", "binary_dir": "/build", "project": "demo",
			  "children": ["app"], "list_files": ["CMakeLists.txt"] },
			{ "source_dir": "/src/app", "binary_dir": "/build/app", "project": "demo",
			  "targets": [
				{ "name": "app", "kind": "executable",
				  "sources": [
					{ "path": "a.c" },
					{ "path": "gen.c", "custom_command": {
						"commands": [["gen", "gen.c"]], "outputs": ["gen.c"] } }
				  ],
				  "link_libraries": ["foo"],
				  "properties": { "LINK_FLAGS": "-static" } },
				{ "name": "docs", "kind": "utility", "in_all": false }
			  ] }
		]
	}"#;

	#[test]
	fn load_model() {
		let model = Model::from_json(MODEL.as_bytes()).unwrap();
		assert_eq!(model.settings.backend.as_deref(), Some("Unix Makefiles"));
		assert!(model.settings.mangle_object_names);
		assert_eq!(model.settings.unique_name_attempts, 1000);
		assert_eq!(model.top().children, [BuildPath::new("/build/app")]);
		assert_eq!(model.top().list_files, [BuildPath::new("/src/CMakeLists.txt")]);
		let app_dir = model.directory(&BuildPath::new("/build/app")).unwrap();
		let app = app_dir.target("app").unwrap();
		assert_eq!(app.kind, TargetKind::Executable);
		assert!(app.in_all);
		assert_eq!(app.sources[0].path.as_str(), "/src/app/a.c");
		assert_eq!(app.sources[1].path.as_str(), "/build/app/gen.c");
		assert_eq!(
			app.sources[1].custom_command.as_ref().unwrap().outputs,
			[BuildPath::new("/build/app/gen.c")]
		);
		assert_eq!(app.properties.get("LINK_FLAGS"), Some("-static"));
		assert_eq!(app_dir.include_scan_pattern, "^.*$");
		assert!(!app_dir.target("docs").unwrap().in_all);
		assert!(model.toolchain.language(Language::C).is_some());
	}

	#[test]
	fn bad_models() {
		assert!(Model::from_json(b"{}").is_err());
		assert!(Model::from_json(b"{ \"directories\": [ { } ] }").is_err());
		assert!(Model::from_json(b"not json").is_err());
		match Model::load("/nonexistent/model.json") {
			Err(FatalError::Model { .. }) => {}
			r => panic!("{:?}", r.map(|_| ())),
		}
	}
}
