use super::makefile::{append_echo, Rule, RuleFile};
use super::naming::{is_bundle, output_directory, output_path, target_names};
use super::{expand, join_flags, LocalGenerator};
use crate::depends::Ledger;
use crate::error::{Diagnostics, FatalError, ModelError};
use crate::model::{Language, RuleKind, SourceFile, Target, TargetKind};
use crate::path::BuildPath;

/// A source that is compiled into an object file.
struct Object<'t> {
	source: &'t SourceFile,
	language: Language,
	name: String,
}

impl<'a> LocalGenerator<'a> {
	/// Write the rule files of an executable or library, and of its objects.
	pub(super) fn linked_target(&mut self, diag: &mut Diagnostics, target: &Target) -> Result<(), FatalError> {
		let ctx = self.ctx;
		let toolchain = &ctx.model.toolchain;
		let platform = &toolchain.platform;

		let mut objects = Vec::new();
		let mut external_objects = Vec::new();
		let mut generated = Vec::new();
		for source in &target.sources {
			let output = source
				.custom_command
				.as_ref()
				.and_then(|cc| cc.primary_output());
			if source.is_header_only() {
				generated.extend(output.cloned());
				continue;
			}
			if source.is_external_object() {
				external_objects.push(source.path.clone());
				continue;
			}
			let language = source
				.language()
				.filter(|&l| toolchain.language(l).is_some());
			let language = match language {
				Some(l) => l,
				None if output.is_some() => {
					generated.extend(output.cloned());
					continue;
				}
				None => {
					diag.warn(ModelError::UnknownSourceLanguage {
						source: source.path.to_path_buf(),
					});
					continue;
				}
			};
			let name = self.object_name(target, source)?;
			if !self.state.objects.insert(name.clone()) {
				diag.warn(ModelError::DuplicateSource {
					target: target.name.clone(),
					source: source.path.to_path_buf(),
				});
				continue;
			}
			objects.push(Object {
				source,
				language,
				name,
			});
		}

		let language = target
			.properties
			.get_nonempty("LINKER_LANGUAGE")
			.and_then(Language::from_name)
			.or_else(|| {
				objects
					.iter()
					.filter_map(|o| toolchain.language(o.language).map(|r| (o.language, r)))
					.max_by_key(|(_, r)| r.link_preference)
					.map(|(l, _)| l)
			});
		let language = match language {
			Some(l) => l,
			None => {
				diag.error(ModelError::MissingLinkLanguage {
					target: target.name.clone(),
				});
				return Ok(());
			}
		};
		let template = toolchain.template(language, RuleKind::Link(target.kind))?;
		let rules = match toolchain.language(language) {
			Some(r) => r,
			None => {
				return Err(FatalError::MissingDefinition {
					name: format!("{} compiler", language),
				})
			}
		};

		for object in &objects {
			self.object_rules(diag, target, object.source, object.language, &object.name)?;
		}

		let limit = ctx.backend.variable_size_limit();
		let objects_var = self
			.state
			.names
			.make_variable(&target.name, "_OBJECTS", limit)?;
		let external_var = self
			.state
			.names
			.make_variable(&target.name, "_EXTERNAL_OBJECTS", limit)?;

		let names = target_names(target, platform);
		let out_dir = output_directory(self.dir, target.kind);
		let bundle = is_bundle(target, platform);
		let output = output_path(self.dir, target, platform)
			.unwrap_or_else(|| out_dir.join(&names.name));
		let rel_output = self.rel(&output);
		let rule_file = format!("{0}.dir/{0}.make", target.name);
		let style = self.style;

		let mut file = RuleFile::new(format!("Rule file for target {}.", target.name));
		file.variable(
			format!("Object files for target {}", target.name),
			objects_var.clone(),
			objects
				.iter()
				.map(|o| style.quoted(&BuildPath::new(&o.name)))
				.collect(),
		);
		file.variable(
			format!("External object files for target {}", target.name),
			external_var.clone(),
			external_objects
				.iter()
				.map(|o| style.quoted(&self.rel(o)))
				.collect(),
		);

		// The link rule.
		let mut link = Rule::new(self.node(&output)).comment(format!(
			"Rule to link {} {}.",
			target.kind.description(),
			target.name
		));
		for o in &objects {
			link.depends.push(style.make_target(&BuildPath::new(&o.name)));
		}
		for path in external_objects.iter().chain(&generated) {
			link.depends.push(self.node(path));
		}
		for lib in &target.link_libraries {
			self.append_any_depend(&mut link.depends, lib, false);
		}
		for utility in &target.utilities {
			self.append_any_depend(&mut link.depends, utility, false);
		}
		for cc in target.build_commands() {
			for dep in &cc.depends {
				self.append_any_depend(&mut link.depends, dep, true);
			}
		}
		self.add_rule_dependency(&mut link, &rule_file);

		append_echo(
			&mut link.commands,
			ctx.backend,
			&format!(
				"Linking {} {} {}",
				language,
				target.kind.description(),
				rel_output
			),
		);
		let all_names: Vec<BuildPath> = names.all().iter().map(|n| out_dir.join(n)).collect();
		if target.kind.is_library() {
			link.commands
				.push(format!("$(RM) {}", self.args(&all_names).join(" ")));
		}
		if bundle {
			link.commands.push(format!(
				"$(RULEGEN_COMMAND) make-directory {}",
				self.arg(&output.parent())
			));
		}
		for cc in target.pre_build.iter().chain(&target.pre_link) {
			link.commands.extend(self.custom_command_lines(cc));
		}

		let mut flags = vec![&rules.flags[..]];
		if let Some(build_type) = &self.settings().build_type {
			if let Some(f) = rules.config_flags.get(&build_type.to_ascii_uppercase()) {
				flags.push(f);
			}
		}
		let flags = join_flags(flags);
		let mut link_flags = Vec::new();
		match target.kind {
			TargetKind::StaticLibrary => {
				link_flags.extend(target.properties.get("STATIC_LIBRARY_FLAGS"));
			}
			kind => {
				if kind == TargetKind::SharedLibrary || kind == TargetKind::ModuleLibrary {
					link_flags.push(&rules.shared_link_flags[..]);
				}
				if kind == TargetKind::Executable && target.properties.is_on("WIN32_EXECUTABLE") {
					link_flags.push(&platform.win32_executable_flags[..]);
				}
				link_flags.extend(target.properties.get("LINK_FLAGS"));
			}
		}
		let link_flags = join_flags(link_flags);
		let target_file = if bundle {
			self.arg(&output)
		} else {
			self.arg(&out_dir.join(&names.real_name))
		};
		let target_base = self.arg(&out_dir.join(&names.base_name));
		let soname_flag = match &platform.soname_flag {
			Some(flag) if target.kind == TargetKind::SharedLibrary => {
				format!("{}{}", flag, names.so_name)
			}
			_ => String::new(),
		};
		let objects_ref = format!("$({}) $({})", objects_var, external_var);
		let link_libraries = self.link_libraries(target);
		let vars = [
			("COMPILER", &rules.compiler[..]),
			("FLAGS", &flags[..]),
			("OBJECTS", &objects_ref[..]),
			("TARGET", &target_file[..]),
			("TARGET_BASE", &target_base[..]),
			("TARGET_SONAME", &names.so_name[..]),
			("SONAME_FLAG", &soname_flag[..]),
			("LINK_FLAGS", &link_flags[..]),
			("LINK_LIBRARIES", &link_libraries[..]),
		];
		link.commands
			.extend(template.iter().map(|line| expand(line, &vars)));
		if names.has_links() {
			link.commands.push(format!(
				"$(RULEGEN_COMMAND) symlink-library {} {} {}",
				self.arg(&out_dir.join(&names.real_name)),
				self.arg(&out_dir.join(&names.so_name)),
				self.arg(&out_dir.join(&names.name)),
			));
		}
		for cc in &target.post_build {
			link.commands.extend(self.custom_command_lines(cc));
		}
		file.rules.push(link);

		// Short names for the target.
		let output_node = self.node(&output);
		if output_node != target.name {
			let mut rule = Rule::new(target.name.clone())
				.comment(format!("Convenience name for target {}.", target.name));
			rule.depends.push(output_node.clone());
			file.rules.push(rule);
		}
		let file_name = output.file_name();
		if file_name != target.name && file_name != output_node {
			let mut rule = Rule::new(style.make_target(&BuildPath::new(file_name)))
				.comment(format!("Convenience name for the file of target {}.", target.name));
			rule.depends.push(output_node.clone());
			file.rules.push(rule);
		}

		// Fortran modules have to be built in order.
		let requires_target = format!("{}.requires", target.name);
		let mut requires = Rule::new(requires_target.clone())
			.comment(format!("Modules needed by target {}.", target.name));
		for o in objects.iter().filter(|o| o.language == Language::Fortran) {
			requires.depends.push(format!(
				"{}.requires",
				style.make_target(&BuildPath::new(&o.name))
			));
		}
		file.rules.push(requires);

		let depends_target = format!("{0}.dir/{0}.depends", target.name);
		let mut depends = Rule::new(depends_target.clone())
			.comment(format!("Scan the dependencies of target {}.", target.name));
		for o in &objects {
			depends.depends.push(
				style.make_target(&BuildPath::new(Ledger::mark_name(&o.name))),
			);
		}
		file.rules.push(depends);

		let clean_target = format!("{}.clean", target.name);
		let mut clean = Rule::new(clean_target.clone())
			.comment(format!("Clean the files of target {}.", target.name));
		let mut garbage = if bundle {
			vec![output.clone()]
		} else {
			all_names
		};
		garbage.extend(objects.iter().map(|o| BuildPath::new(&o.name)));
		garbage.extend(target.build_commands().flat_map(|cc| cc.outputs.iter().cloned()));
		clean.commands.push(self.remove_command(self.args(&garbage)));
		file.rules.push(clean);

		if self.publish(diag, &rule_file, &file) {
			self.state.hooks.clean.push(clean_target);
			if target.in_all {
				self.state.hooks.depend.push(depends_target);
				self.state.hooks.build.push(requires_target);
				self.state.hooks.build.push(output_node);
			}
		}
		Ok(())
	}

	fn args(&self, paths: &[BuildPath]) -> Vec<String> {
		paths.iter().map(|p| self.arg(p)).collect()
	}

	/// Library directories, and the libraries to link with.
	fn link_libraries(&self, target: &Target) -> String {
		let platform = &self.ctx.model.toolchain.platform;
		let mut out = Vec::new();
		for dir in &self.dir.link_directories {
			out.push(format!("{}{}", platform.link_directory_flag, self.arg(dir)));
		}
		for lib in &target.link_libraries {
			let project_target = self
				.ctx
				.targets
				.get(lib)
				.and_then(|t| t.output.as_ref());
			if let Some(output) = project_target {
				out.push(self.arg(output));
			} else if lib.starts_with('-') {
				out.push(lib.clone());
			} else if BuildPath::new(lib).is_absolute() {
				out.push(self.arg(&BuildPath::new(lib)));
			} else {
				out.push(format!("{}{}", platform.link_library_flag, lib));
			}
		}
		out.join(" ")
	}
}
