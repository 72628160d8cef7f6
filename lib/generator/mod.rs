//! Generating the makefiles of one directory.
//!
//! For a build directory `B`, the [`LocalGenerator`] writes:
//!
//! - `B/Makefile`: the entry point. It holds the pass drivers (`all`,
//!   `depend`, `build`, `clean`), the rules that recurse into
//!   subdirectories, and the rules that jump to other directories to build
//!   targets from there. It includes all the files below.
//! - `B/<target>.dir/<target>.make`: the link and clean rules of a target.
//! - `B/<target>.dir/<source>.o.make`: the rules to compile an object file
//!   and to scan its dependencies. It includes the
//!   [ledger](crate::depends::Ledger) of the object.
//! - `B/CustomRules.dir/<output>.make`: the rule of a custom command, and
//!   the rules of utility targets.
//! - `B/DirectoryInformation.list`: what the dependency scans of this
//!   directory need to know.
//!
//! Rule files are written in copy-if-different mode, so regenerating
//! without changes leaves them untouched. The `Makefile` itself is always
//! rewritten.

mod backend;
mod custom;
mod makefile;
mod names;
mod naming;
mod object;
mod target;
mod traverse;

pub use self::backend::Backend;
pub use self::makefile::{mangle_path, Rule, RuleFile};
pub use self::names::UniqueNames;
pub use self::naming::{output_directory, output_path, target_names, TargetNames};
pub use self::traverse::{CHECK_BUILD_SYSTEM, MANIFEST};

use crate::depends::{DirectoryInformation, DIRECTORY_INFORMATION};
use crate::error::{Diagnostics, FatalError, ModelError};
use crate::genfile::{GeneratedFile, Published};
use crate::model::{CustomCommand, Directory, Language, Model, Settings, TargetKind};
use crate::path::{BuildPath, PathStyle};
use indexmap::IndexMap;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::PathBuf;

/// The name of the makefile in every build directory.
pub const MAKEFILE: &str = "Makefile";

/// The directory, within a build directory, holding custom command rules.
pub const CUSTOM_RULES_DIR: &str = "CustomRules.dir";

/// Where a target is defined, and what it produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetLocation {
	/// The build directory of the directory that defines the target.
	pub directory: BuildPath,
	pub kind: TargetKind,
	/// The file the target produces. `None` for utilities.
	pub output: Option<BuildPath>,
}

/// All targets of the project, by name.
#[derive(Clone, Debug, Default)]
pub struct TargetIndex {
	targets: IndexMap<String, TargetLocation>,
}

impl TargetIndex {
	/// Index all targets of the model.
	///
	/// A name that's used more than once is an error. The first definition
	/// is the one that counts.
	pub fn build(model: &Model, diag: &mut Diagnostics) -> Self {
		let mut targets: IndexMap<String, TargetLocation> = IndexMap::new();
		for dir in &model.directories {
			for target in dir.targets.iter().filter(|t| !t.kind.is_install_only()) {
				if let Some(existing) = targets.get(&target.name) {
					diag.error(ModelError::DuplicateTarget {
						target: target.name.clone(),
						directory: existing.directory.to_path_buf(),
					});
					continue;
				}
				targets.insert(
					target.name.clone(),
					TargetLocation {
						directory: dir.binary_dir.clone(),
						kind: target.kind,
						output: output_path(dir, target, &model.toolchain.platform),
					},
				);
			}
		}
		TargetIndex { targets }
	}

	pub fn get(&self, name: &str) -> Option<&TargetLocation> {
		self.targets.get(name)
	}

	pub fn len(&self) -> usize {
		self.targets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.targets.is_empty()
	}
}

/// What every [`LocalGenerator`] of one pass shares.
#[derive(Debug)]
pub struct Context<'a> {
	pub model: &'a Model,
	/// The full path of the model file, which the generated rules use to
	/// regenerate.
	pub model_file: BuildPath,
	pub backend: Backend,
	pub targets: TargetIndex,
}

impl<'a> Context<'a> {
	pub fn new(model: &'a Model, model_file: BuildPath, backend: Backend, diag: &mut Diagnostics) -> Self {
		Context {
			model,
			model_file,
			backend,
			targets: TargetIndex::build(model, diag),
		}
	}

	pub fn top(&self) -> &'a Directory {
		self.model.top()
	}

	pub fn style(&self) -> PathStyle {
		self.backend
			.path_style(self.model.settings.force_unix_paths)
	}
}

/// What the coordinator decided about a directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectoryRole {
	/// The first directory of its project. Gets the `install` and `test`
	/// rules.
	pub project_root: bool,
}

/// What was generated for one directory.
#[derive(Clone, Debug, Default)]
pub struct DirectoryOutput {
	pub makefile: PathBuf,
	pub directory_information: PathBuf,
	/// All rule files that were written successfully, changed or not.
	pub rule_files: Vec<PathBuf>,
	/// The object files with a dependency ledger, relative to the build
	/// directory.
	pub objects: BTreeMap<Language, Vec<String>>,
}

/// A rule in another directory's makefile that needs to be run from here.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Jump {
	target: String,
	directory: BuildPath,
	output: BuildPath,
}

/// The targets the local rule of each pass depends on.
#[derive(Clone, Debug, Default)]
struct Hooks {
	depend: Vec<String>,
	build: Vec<String>,
	clean: Vec<String>,
}

/// Everything that is tracked while generating one directory.
#[derive(Debug)]
struct GeneratorState {
	names: UniqueNames,
	/// Object files that have a rule, to catch duplicates.
	objects: HashSet<String>,
	/// Custom command rule files, by name.
	custom_rules: HashMap<String, CustomCommand>,
	/// Rule files to include, relative to the build directory.
	includes: Vec<String>,
	jumps: IndexMap<String, Jump>,
	hooks: Hooks,
	output: DirectoryOutput,
}

/// The generator of one directory.
pub struct LocalGenerator<'a> {
	ctx: &'a Context<'a>,
	dir: &'a Directory,
	role: DirectoryRole,
	style: PathStyle,
	state: GeneratorState,
}

impl<'a> LocalGenerator<'a> {
	pub fn new(ctx: &'a Context<'a>, dir: &'a Directory, role: DirectoryRole) -> Self {
		LocalGenerator {
			ctx,
			dir,
			role,
			style: ctx.style(),
			state: GeneratorState {
				names: UniqueNames::new(ctx.model.settings.unique_name_attempts),
				objects: HashSet::new(),
				custom_rules: HashMap::new(),
				includes: Vec::new(),
				jumps: IndexMap::new(),
				hooks: Hooks::default(),
				output: DirectoryOutput::default(),
			},
		}
	}

	/// Generate all files of the directory.
	///
	/// Problems with single targets or files are recorded in `diag`, and
	/// skipped. Only problems that make the whole pass pointless are
	/// returned as an error.
	pub fn generate(mut self, diag: &mut Diagnostics) -> Result<DirectoryOutput, FatalError> {
		debug!("Generating {}", self.dir.binary_dir);
		self.write_directory_information(diag);
		let dir = self.dir;
		for target in &dir.targets {
			for source in &target.sources {
				if let Some(cc) = &source.custom_command {
					self.custom_command(diag, cc);
				}
			}
		}
		for target in dir.targets.iter().filter(|t| !t.kind.is_install_only()) {
			if target.kind.is_linked() {
				self.linked_target(diag, target)?;
			} else {
				self.utility_target(diag, target);
			}
		}
		self.write_makefile(diag);
		Ok(self.state.output)
	}

	fn binary_dir(&self) -> &BuildPath {
		&self.dir.binary_dir
	}

	fn settings(&self) -> &'a Settings {
		&self.ctx.model.settings
	}

	/// A path as used in this directory's makefiles.
	///
	/// Paths within the build tree are made relative to this directory.
	/// Others are left alone.
	fn rel(&self, path: &BuildPath) -> BuildPath {
		if path.is_absolute() && path.starts_with(&self.ctx.top().binary_dir) {
			path.relative_to(self.binary_dir())
		} else {
			path.clone()
		}
	}

	/// A path as make target or dependency.
	fn node(&self, path: &BuildPath) -> String {
		self.style.make_target(&self.rel(path))
	}

	/// A path as command line argument.
	fn arg(&self, path: &BuildPath) -> String {
		self.style.shell_arg(&self.rel(path))
	}

	/// The command to make `target` from the makefile in the current
	/// directory.
	fn make_call(&self, target: &str) -> String {
		let flags = if self.ctx.backend.pass_makeflags() {
			" -$(MAKEFLAGS)"
		} else {
			""
		};
		format!("$(MAKE) -f {}{} {}", MAKEFILE, flags, target)
	}

	/// Commands that run `commands` in `dir`, and return.
	fn in_directory(&self, dir: &BuildPath, commands: Vec<String>) -> Vec<String> {
		let rel = dir.relative_to(self.binary_dir());
		if rel.as_str() == "." {
			return commands;
		}
		let cd = format!("cd {}", self.style.shell_arg(&rel));
		if self.ctx.backend.windows_shell() {
			let back = self.binary_dir().relative_to(dir);
			let mut c = vec![cd];
			c.extend(commands);
			c.push(format!("cd {}", self.style.shell_arg(&back)));
			c
		} else {
			let mut line = cd;
			for command in commands {
				line.push_str(" && ");
				line.push_str(&command);
			}
			vec![line]
		}
	}

	/// How this directory is called in messages.
	fn display_name(&self) -> String {
		self.binary_dir()
			.relative_to(&self.ctx.top().binary_dir)
			.to_string()
	}

	/// Add a dependency on the rule file itself, unless disabled.
	fn add_rule_dependency(&self, rule: &mut Rule, rule_file: &str) {
		if !self.settings().skip_rule_dependency {
			rule.depends
				.push(self.style.make_target(&BuildPath::new(rule_file)));
		}
	}

	/// Add a dependency on a target or file, given by name.
	///
	/// Targets of this directory are found through their rule in an
	/// included file. Linked targets of other directories get a jump rule.
	/// `custom` allows plain (relative) file names, as used by custom
	/// commands.
	fn append_any_depend(&mut self, depends: &mut Vec<String>, name: &str, custom: bool) {
		let ctx = self.ctx;
		if let Some(target) = self.dir.target(name).filter(|t| !t.kind.is_install_only()) {
			match output_path(self.dir, target, &ctx.model.toolchain.platform) {
				Some(out) => depends.push(self.node(&out)),
				None => depends.push(target.name.clone()),
			}
			return;
		}
		if let Some(location) = ctx.targets.get(name) {
			if let Some(out) = &location.output {
				depends.push(self.node(out));
				self.state.jumps.entry(name.to_string()).or_insert_with(|| Jump {
					target: name.to_string(),
					directory: location.directory.clone(),
					output: out.clone(),
				});
			}
			return;
		}
		let path = BuildPath::new(name);
		if path.is_absolute() || custom {
			depends.push(self.node(&path));
		}
	}

	/// The command lines of a custom command, with echo and directory change.
	fn custom_command_lines(&self, cc: &CustomCommand) -> Vec<String> {
		let mut commands = Vec::new();
		if let Some(comment) = cc.comment.as_ref().filter(|c| !c.is_empty()) {
			makefile::append_echo(&mut commands, self.ctx.backend, comment);
		}
		let lines: Vec<String> = cc
			.commands
			.iter()
			.filter(|c| !c.is_empty())
			.map(|c| self.command_line(c))
			.collect();
		match &cc.working_directory {
			Some(dir) => commands.extend(self.in_directory(dir, lines)),
			None => commands.extend(lines),
		}
		commands
	}

	/// One command line. A program that is an executable of the project is
	/// replaced by its path.
	fn command_line(&self, line: &[String]) -> String {
		let mut words = Vec::with_capacity(line.len());
		for (i, word) in line.iter().enumerate() {
			let exe = self
				.ctx
				.targets
				.get(word)
				.filter(|t| i == 0 && t.kind == TargetKind::Executable)
				.and_then(|t| t.output.as_ref());
			match exe {
				Some(out) => words.push(self.arg(out)),
				None => words.push(makefile::shell_word(word)),
			}
		}
		words.join(" ")
	}

	/// Write a rule file, and remember to include it.
	///
	/// Returns whether the file was written.
	fn publish(&mut self, diag: &mut Diagnostics, name: &str, file: &RuleFile) -> bool {
		let path = self.binary_dir().to_path_buf().join(name);
		let content = file.to_bytes(self.ctx.backend);
		let result = GeneratedFile::create(&path).and_then(|mut f| {
			f.set_copy_if_different(true);
			f.write_all(&content)?;
			f.close()
		});
		match result {
			Ok(published) => {
				if published == Published::Replaced {
					debug!("Wrote {:?}", path);
				}
				self.state.includes.push(name.to_string());
				self.state.output.rule_files.push(path);
				true
			}
			Err(error) => {
				diag.error(ModelError::Io { file: path, error });
				false
			}
		}
	}

	fn write_directory_information(&mut self, diag: &mut Diagnostics) {
		let mut info = DirectoryInformation {
			include_paths: BTreeMap::new(),
			scan_pattern: self.dir.include_scan_pattern.clone(),
			complain_pattern: self.dir.include_complain_pattern.clone(),
			force_unix_paths: self.settings().force_unix_paths,
		};
		if !self.dir.include_directories.is_empty() {
			for &lang in &Language::ALL {
				info.include_paths
					.insert(lang, self.dir.include_directories.clone());
			}
		}
		let path = self.binary_dir().to_path_buf();
		self.state.output.directory_information = path.join(DIRECTORY_INFORMATION);
		if let Err(error) = info.write(&path) {
			diag.error(ModelError::Io {
				file: path.join(DIRECTORY_INFORMATION),
				error,
			});
		}
	}
}

/// Expand `<PLACEHOLDER>`s in a rule template line.
///
/// The template is split into words first. Words that expand to nothing
/// are dropped, the values themselves are kept as they are.
fn expand(template: &str, vars: &[(&str, &str)]) -> String {
	let mut words = Vec::new();
	for word in template.split(' ').filter(|w| !w.is_empty()) {
		let word = expand_word(word, vars);
		if !word.is_empty() {
			words.push(word);
		}
	}
	words.join(" ")
}

fn expand_word(word: &str, vars: &[(&str, &str)]) -> String {
	let mut out = String::with_capacity(word.len());
	let mut rest = word;
	while let Some(start) = rest.find('<') {
		out.push_str(&rest[..start]);
		let after = &rest[start..];
		let value = after.find('>').and_then(|end| {
			let name = &after[1..end];
			vars.iter()
				.find(|(n, _)| *n == name)
				.map(|(_, v)| (*v, end + 1))
		});
		match value {
			Some((v, len)) => {
				out.push_str(v);
				rest = &after[len..];
			}
			None => {
				out.push('<');
				rest = &after[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

/// Join flags, skipping empty ones.
fn join_flags<'s>(flags: impl IntoIterator<Item = &'s str>) -> String {
	let mut out = String::new();
	for f in flags.into_iter().map(str::trim).filter(|f| !f.is_empty()) {
		if !out.is_empty() {
			out.push(' ');
		}
		out.push_str(f);
	}
	out
}
