use crate::path::BuildPath;
use serde::Deserialize;

/// Options that change how rules are generated.
///
/// Read from the `settings` block of the model. Missing fields take the
/// [`Default`] value.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
	/// Name of the backend, e.g. `Unix Makefiles`.
	pub backend: Option<String>,
	/// How generated rules invoke `rulegen` itself.
	pub rulegen_command: String,
	/// Don't make every rule depend on the rule file it is written in.
	pub skip_rule_dependency: bool,
	/// Don't make `install` depend on `all`.
	pub skip_install_all_dependency: bool,
	/// Show all commands while building.
	pub verbose_makefile: bool,
	/// Replace characters in object file names that upset some tools.
	pub mangle_object_names: bool,
	/// How many names are tried before giving up on finding a unique one.
	pub unique_name_attempts: u32,
	pub enable_testing: bool,
	/// Use `/` in paths, even for a Windows shell.
	pub force_unix_paths: bool,
	/// Empty: use the cached list, or `Debug;Release`.
	pub configuration_types: Vec<String>,
	/// The active configuration for single-configuration backends.
	pub build_type: Option<String>,
	/// Script run by the `install` rule.
	pub install_script: Option<BuildPath>,
	/// Command run by the `test` rule.
	pub test_driver: Option<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Settings {
			backend: None,
			rulegen_command: "rulegen".to_string(),
			skip_rule_dependency: false,
			skip_install_all_dependency: false,
			verbose_makefile: false,
			mangle_object_names: false,
			unique_name_attempts: 1000,
			enable_testing: false,
			force_unix_paths: false,
			configuration_types: Vec::new(),
			build_type: None,
			install_script: None,
			test_driver: None,
		}
	}
}
