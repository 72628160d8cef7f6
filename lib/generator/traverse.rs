//! The `Makefile` of a directory: the passes, and the way they recurse
//! through the tree.
//!
//! Every pass (`all`, `depend`, `build`, `clean`) has a driver rule that
//! runs, in order:
//!
//! 1. `<pass>.pre-order`: the pass in all subdirectories marked pre-order,
//! 2. `<pass>.local`: the pass for the targets of this directory,
//! 3. `<pass>.post-order`: the pass in all other subdirectories.
//!
//! The subdirectory rules of each order are chained, each depending on the
//! previous one, so that subdirectories are visited one by one in declared
//! order, even by a parallel make.

use super::makefile::{append_echo, mangle_path, write_disclaimer, write_divider, Rule};
use super::{LocalGenerator, MAKEFILE};
use crate::error::{Diagnostics, ModelError};
use crate::genfile::GeneratedFile;
use crate::path::BuildPath;
use std::io::{Result, Write};

const PASSES: [&str; 4] = ["all", "depend", "build", "clean"];

/// The rule that checks whether the build system needs to be regenerated.
pub const CHECK_BUILD_SYSTEM: &str = "rulegen_check_build_system";

/// The name of the manifest in every build directory.
pub const MANIFEST: &str = "Makefile.manifest";

impl<'a> LocalGenerator<'a> {
	/// Write the `Makefile` of this directory.
	///
	/// It is always replaced, so its timestamp shows when the build system
	/// was last generated.
	pub(super) fn write_makefile(&mut self, diag: &mut Diagnostics) {
		let path = self.binary_dir().to_path_buf().join(MAKEFILE);
		self.state.output.makefile = path.clone();
		let mut content = Vec::new();
		// Writing to a Vec can't fail.
		let _ = self.makefile_text(&mut content);
		let result = GeneratedFile::create(&path).and_then(|mut f| {
			f.write_all(&content)?;
			f.close()
		});
		if let Err(error) = result {
			diag.error(ModelError::Io { file: path, error });
		}
	}

	fn makefile_text(&self, out: &mut dyn Write) -> Result<()> {
		let backend = self.ctx.backend;
		write_disclaimer(out, backend, "Makefile of this directory.")?;
		self.write_variables(out)?;

		write_divider(out, "Special targets provided by rulegen.")?;
		let mut default = Rule::new("default_target")
			.comment("Default target executed when no arguments are given to make.");
		default.depends.push("all".to_string());
		default.write(out, backend)?;
		for rule in self.project_rules() {
			rule.write(out, backend)?;
		}
		let mut rebuild = Rule::new("rebuild_cache").comment("Regenerate the build system.");
		rebuild.commands.push(self.generate_command(None));
		rebuild.write(out, backend)?;

		write_divider(out, "Rules to run the passes of this directory.")?;
		for &pass in &PASSES {
			self.pass_driver(pass).write(out, backend)?;
		}
		for rule in self.local_rules() {
			rule.write(out, backend)?;
		}

		write_divider(out, "Rules to visit the subdirectories.")?;
		for rule in self.subdirectory_rules() {
			rule.write(out, backend)?;
		}

		if !self.state.includes.is_empty() {
			write_divider(out, "Rule files of this directory.")?;
			for include in &self.state.includes {
				let include = self.style.make_target(&BuildPath::new(include));
				writeln!(out, "{} {}", backend.include_directive(), include)?;
			}
			writeln!(out)?;
		}

		if !self.state.jumps.is_empty() {
			write_divider(out, "Rules to build targets of other directories.")?;
			for rule in self.jump_rules() {
				rule.write(out, backend)?;
			}
		}

		write_divider(out, "Special rules at the end.")?;
		let mut check = Rule::new(CHECK_BUILD_SYSTEM).comment(
			"Check whether the build system has to be regenerated.\n\
			 Nothing this depends on may be generated, since it runs before regeneration.",
		);
		let manifest = self.binary_dir().join(MANIFEST);
		check.commands.push(self.generate_command(Some(&manifest)));
		check.write(out, backend)?;
		if !self.settings().verbose_makefile {
			writeln!(out, "# Suppress display of executed commands.")?;
			if backend.windows_shell() {
				writeln!(out, "!IFNDEF VERBOSE")?;
				writeln!(out, ".SILENT:")?;
				writeln!(out, "!ENDIF")?;
			} else {
				writeln!(out, "$(VERBOSE).SILENT:")?;
			}
			writeln!(out)?;
		}
		writeln!(out, "# Disable implicit rules.")?;
		writeln!(out, ".SUFFIXES:")?;
		writeln!(out)
	}

	fn write_variables(&self, out: &mut dyn Write) -> Result<()> {
		let style = self.style;
		let top = self.ctx.top();
		write_divider(out, "Set environment variables for the build.")?;
		if !self.ctx.backend.windows_shell() {
			writeln!(out, "# The shell in which to execute make rules.")?;
			writeln!(out, "SHELL = /bin/sh")?;
			writeln!(out)?;
		}
		writeln!(out, "# The command to run rulegen.")?;
		writeln!(out, "RULEGEN_COMMAND = {}", self.settings().rulegen_command)?;
		writeln!(out)?;
		writeln!(out, "# The command to remove a file.")?;
		writeln!(out, "RM = $(RULEGEN_COMMAND) remove -f")?;
		writeln!(out)?;
		writeln!(out, "# The target model this was generated from.")?;
		writeln!(out, "MODEL_FILE = {}", style.shell_arg(&self.ctx.model_file))?;
		writeln!(out)?;
		writeln!(out, "# The source and build directory of this directory.")?;
		writeln!(out, "RULEGEN_CURRENT_SOURCE = {}", style.shell_arg(&self.dir.source_dir))?;
		writeln!(out, "RULEGEN_CURRENT_BINARY = {}", style.shell_arg(self.binary_dir()))?;
		writeln!(out)?;
		writeln!(out, "# The top source and build directory.")?;
		writeln!(out, "RULEGEN_SOURCE_DIR = {}", style.shell_arg(&top.source_dir))?;
		writeln!(out, "RULEGEN_BINARY_DIR = {}", style.shell_arg(&top.binary_dir))?;
		writeln!(out)
	}

	/// The command that regenerates the build system, or with a manifest,
	/// only checks whether that is needed.
	fn generate_command(&self, manifest: Option<&BuildPath>) -> String {
		let mut command = format!(
			"$(RULEGEN_COMMAND) -C {} generate --model $(MODEL_FILE)",
			self.style.shell_arg(&self.ctx.top().binary_dir)
		);
		if let Some(manifest) = manifest {
			command.push_str(" --check-build-system ");
			command.push_str(&self.style.shell_arg(manifest));
		}
		command
	}

	/// `test` and `install`, for the first directory of a project.
	fn project_rules(&self) -> Vec<Rule> {
		let mut rules = Vec::new();
		if !self.role.project_root {
			return rules;
		}
		let settings = self.settings();
		let backend = self.ctx.backend;
		if settings.enable_testing {
			if let Some(driver) = &settings.test_driver {
				let mut test = Rule::new("test").comment("Run the tests of the project.");
				append_echo(&mut test.commands, backend, "Running tests...");
				test.commands.push(format!("{} $(ARGS)", driver));
				rules.push(test);
			}
		}
		if let Some(script) = &settings.install_script {
			let mut install = Rule::new("install").comment("Install the project.");
			if !settings.skip_install_all_dependency {
				install.depends.push("all".to_string());
			}
			append_echo(&mut install.commands, backend, "Install the project...");
			let script = self.style.shell_arg(script);
			if backend.windows_shell() {
				install.commands.push(script);
			} else {
				install.commands.push(format!("$(SHELL) {}", script));
			}
			rules.push(install);
		}
		rules
	}

	fn pass_driver(&self, pass: &str) -> Rule {
		let backend = self.ctx.backend;
		let name = self.display_name();
		let mut rule = Rule::new(pass).comment(match pass {
			"all" => "Scan dependencies and build everything.".to_string(),
			_ => format!("The {} pass.", pass),
		});
		rule.depends.push(CHECK_BUILD_SYSTEM.to_string());
		append_echo(&mut rule.commands, backend, &format!("Entering directory {}", name));
		rule.commands
			.push(self.make_call(&format!("{}.pre-order", pass)));
		if pass == "all" {
			rule.commands.push(self.make_call("depend.local"));
			rule.commands.push(self.make_call("build.local"));
		} else {
			rule.commands
				.push(self.make_call(&format!("{}.local", pass)));
		}
		rule.commands
			.push(self.make_call(&format!("{}.post-order", pass)));
		append_echo(&mut rule.commands, backend, &format!("Finished directory {}", name));
		rule
	}

	fn local_rules(&self) -> Vec<Rule> {
		let hooks = &self.state.hooks;
		let mut depend = Rule::new("depend.local").comment("Scan the dependencies of this directory.");
		depend.depends = hooks.depend.clone();
		let mut build = Rule::new("build.local").comment("Build the targets of this directory.");
		build.depends = hooks.build.clone();
		let mut clean = Rule::new("clean.local").comment("Clean this directory.");
		clean.depends = hooks.clean.clone();
		let extra: Vec<String> = self
			.dir
			.properties
			.list("ADDITIONAL_MAKE_CLEAN_FILES")
			.map(|f| self.arg(&self.binary_dir().join(f)))
			.collect();
		if !extra.is_empty() {
			clean.commands.push(self.remove_command(extra));
		}
		vec![depend, build, clean]
	}

	/// The rules recursing into subdirectories, for every pass.
	fn subdirectory_rules(&self) -> Vec<Rule> {
		let mut rules = Vec::new();
		for &pass in &PASSES {
			for &pre_order in &[true, false] {
				let order = if pre_order { "pre-order" } else { "post-order" };
				let mut previous: Option<String> = None;
				for child in &self.dir.children {
					let child_dir = match self.ctx.model.directory(child) {
						Some(d) => d,
						None => continue,
					};
					if child_dir.pre_order != pre_order
						|| (child_dir.exclude_from_all && pass != "clean")
					{
						continue;
					}
					let rel = child.relative_to(self.binary_dir());
					let name = format!("{}_{}", pass, mangle_path(rel.as_str()));
					let mut rule = Rule::new(name.clone());
					rule.depends.extend(previous.take());
					rule.commands = self.in_directory(child, vec![self.make_call(pass)]);
					rules.push(rule);
					previous = Some(name);
				}
				let mut rule = Rule::new(format!("{}.{}", pass, order));
				rule.depends.extend(previous);
				rules.push(rule);
			}
		}
		rules
	}

	/// Rules that build a target of another directory from there.
	fn jump_rules(&self) -> Vec<Rule> {
		let backend = self.ctx.backend;
		let here = self.display_name();
		let top = &self.ctx.top().binary_dir;
		self.state
			.jumps
			.values()
			.map(|jump| {
				let there = jump.directory.relative_to(top);
				let mut rule = Rule::new(self.node(&jump.output))
					.comment(format!("Build target {} of {}.", jump.target, there));
				append_echo(
					&mut rule.commands,
					backend,
					&format!("Jumping to {} to build {}", there, jump.target),
				);
				let file = self
					.style
					.make_target(&jump.output.relative_to(&jump.directory));
				let steps = vec![
					self.make_call(CHECK_BUILD_SYSTEM),
					self.make_call(&format!("{0}.dir/{0}.depends", jump.target)),
					self.make_call(&format!("{}.requires", jump.target)),
					self.make_call(&file),
				];
				rule.commands.extend(self.in_directory(&jump.directory, steps));
				append_echo(&mut rule.commands, backend, &format!("Returning to {}", here));
				rule
			})
			.collect()
	}
}
