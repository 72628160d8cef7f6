use super::makefile::{append_echo, Rule, RuleFile};
use super::{expand, join_flags, LocalGenerator};
use crate::depends::Ledger;
use crate::error::{Diagnostics, FatalError, ModelError};
use crate::model::{Language, LanguageRules, RuleKind, SourceFile, Target, TargetKind};
use crate::path::BuildPath;

impl<'a> LocalGenerator<'a> {
	/// The object file for a source of a target, relative to the build
	/// directory.
	///
	/// The source's path within the source (or build) directory is kept, so
	/// sources with the same name in different directories don't clash.
	pub(super) fn object_name(&mut self, target: &Target, source: &SourceFile) -> Result<String, FatalError> {
		let dir = self.dir;
		let path = &source.path;
		let rel = if path.starts_with(&dir.source_dir) {
			path.relative_to(&dir.source_dir)
		} else if path.starts_with(&dir.binary_dir) {
			path.relative_to(&dir.binary_dir)
		} else {
			BuildPath::new(path.file_name())
		};
		let stem = rel.parent().join(rel.file_stem());
		let name = format!(
			"{}.dir/{}{}",
			target.name, stem, self.ctx.model.toolchain.platform.object_extension
		);
		self.state
			.names
			.object_name(&name, self.settings().mangle_object_names)
	}

	fn compile_flags(&self, target: &Target, source: &SourceFile, rules: &LanguageRules) -> String {
		let platform = &self.ctx.model.toolchain.platform;
		let shared = target.kind == TargetKind::SharedLibrary || target.kind == TargetKind::ModuleLibrary;
		let mut flags: Vec<String> = Vec::new();
		if shared {
			let symbol = match target.properties.get_nonempty("DEFINE_SYMBOL") {
				Some(s) => s.to_string(),
				None => format!("{}_EXPORTS", target.name),
			};
			flags.push(format!("{}{}", platform.define_flag, symbol));
		}
		flags.extend(source.properties.get("COMPILE_FLAGS").map(String::from));
		flags.push(rules.flags.clone());
		if let Some(build_type) = &self.settings().build_type {
			flags.extend(
				rules
					.config_flags
					.get(&build_type.to_ascii_uppercase())
					.cloned(),
			);
		}
		if shared {
			flags.push(rules.shared_flags.clone());
		}
		flags.extend(self.dir.compile_definitions.iter().cloned());
		for dir in &self.dir.include_directories {
			flags.push(format!("{}{}", platform.include_flag, self.arg(dir)));
		}
		join_flags(flags.iter().map(|s| &s[..]))
	}

	/// Write the rule file of one object file.
	///
	/// It has a rule to build the object, and one to scan its dependencies,
	/// which touches the ledger's mark file. Returns whether it was written.
	pub(super) fn object_rules(
		&mut self,
		diag: &mut Diagnostics,
		target: &Target,
		source: &SourceFile,
		language: Language,
		object: &str,
	) -> Result<bool, FatalError> {
		let ctx = self.ctx;
		let toolchain = &ctx.model.toolchain;
		let template = toolchain.template(language, RuleKind::CompileObject)?;
		let rules = match toolchain.language(language) {
			Some(r) => r,
			None => return Ok(false),
		};
		let style = self.style;
		let name = format!("{}.make", object);
		let object_path = BuildPath::new(object);
		let object_node = style.make_target(&object_path);
		let object_arg = style.shell_arg(&object_path);
		let source_arg = self.arg(&source.path);

		let mut file = RuleFile::new(format!("Rule file for object file {}.", object));
		file.includes
			.push(style.make_target(&BuildPath::new(Ledger::fragment_name(object))));

		let mut depends = vec![self.node(&source.path)];
		for dep in source.properties.list("OBJECT_DEPENDS") {
			self.append_any_depend(&mut depends, dep, true);
		}

		let mark = BuildPath::new(Ledger::mark_name(object));
		let mut scan = Rule::new(style.make_target(&mark))
			.comment(format!("Rule to scan dependencies of {}.", object));
		scan.depends = depends.clone();
		self.add_rule_dependency(&mut scan, &name);
		append_echo(
			&mut scan.commands,
			ctx.backend,
			&format!("Scanning {} dependencies of {}", language, object),
		);
		let skip = if source.properties.is_on("SKIP_DEPENDS") {
			" --skip"
		} else {
			""
		};
		scan.commands.push(format!(
			"$(RULEGEN_COMMAND) depends{} \"{}\" {} {} {}",
			skip, ctx.backend, language, object_arg, source_arg
		));
		file.rules.push(scan);

		let flags = self.compile_flags(target, source, rules);
		let mut build = Rule::new(object_node.clone()).comment(format!("Rule to build {}.", object));
		build.depends = depends;
		self.add_rule_dependency(&mut build, &name);
		append_echo(
			&mut build.commands,
			ctx.backend,
			&format!("Building {} object {}", language, object),
		);
		let vars = [
			("COMPILER", &rules.compiler[..]),
			("FLAGS", &flags[..]),
			("SOURCE", &source_arg[..]),
			("OBJECT", &object_arg[..]),
		];
		build
			.commands
			.extend(template.iter().map(|line| expand(line, &vars)));
		file.rules.push(build);

		if language == Language::Fortran {
			let mut requires = Rule::new(format!("{}.requires", object_node))
				.comment(format!("Modules needed by {}.", object));
			requires.depends.push(style.make_target(&mark));
			file.rules.push(requires);
			let mut provides = Rule::new(format!("{}.provides", object_node))
				.comment(format!("Modules provided by {}.", object));
			provides.depends.push(format!("{}.requires", object_node));
			provides
				.commands
				.push(self.make_call(&format!("{}.provides.build", object_node)));
			file.rules.push(provides);
			let mut provides_build = Rule::new(format!("{}.provides.build", object_node));
			provides_build.depends.push(object_node);
			file.rules.push(provides_build);
		}

		let ledger = Ledger::new(self.binary_dir().to_path_buf(), object);
		if let Err(error) = ledger.ensure_exists() {
			diag.error(ModelError::Io {
				file: ledger.fragment(),
				error,
			});
			return Ok(false);
		}
		if !self.publish(diag, &name, &file) {
			return Ok(false);
		}
		self.state
			.output
			.objects
			.entry(language)
			.or_default()
			.push(object.to_string());
		Ok(true)
	}
}
