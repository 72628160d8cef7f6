use super::makefile::{append_echo, mangle_path, Rule, RuleFile};
use super::{LocalGenerator, CUSTOM_RULES_DIR};
use crate::error::{Diagnostics, ModelError};
use crate::model::{CustomCommand, Target};

impl<'a> LocalGenerator<'a> {
	/// Write the rule file of a custom command.
	///
	/// The first output gets the rule. Other outputs depend on it. The same
	/// command may be listed by several targets, but two different commands
	/// may not produce the same output.
	pub(super) fn custom_command(&mut self, diag: &mut Diagnostics, cc: &CustomCommand) {
		let primary = match cc.primary_output() {
			Some(p) => p.clone(),
			None => return,
		};
		let keys: Vec<String> = cc
			.outputs
			.iter()
			.map(|o| mangle_path(self.rel(o).as_str()))
			.collect();
		for (key, output) in keys.iter().zip(&cc.outputs) {
			if let Some(existing) = self.state.custom_rules.get(key) {
				if existing != cc {
					diag.error(ModelError::AmbiguousCustomOutput {
						output: output.to_path_buf(),
					});
				}
				return;
			}
		}
		for key in &keys {
			self.state.custom_rules.insert(key.clone(), cc.clone());
		}

		let rel = self.rel(&primary);
		let name = format!("{}/{}.make", CUSTOM_RULES_DIR, keys[0]);
		let target = self.node(&primary);
		let mut file = RuleFile::new(format!("Custom command rule file for {}.", rel));

		let mut rule = Rule::new(target.clone()).comment(format!("Custom command to generate {}.", rel));
		for dep in &cc.depends {
			self.append_any_depend(&mut rule.depends, dep, true);
		}
		self.add_rule_dependency(&mut rule, &name);
		if cc.comment.as_ref().map_or(true, |c| c.is_empty()) {
			append_echo(&mut rule.commands, self.ctx.backend, &format!("Generating {}", rel));
		}
		rule.commands.extend(self.custom_command_lines(cc));
		file.rules.push(rule);

		for output in &cc.outputs[1..] {
			let mut alias = Rule::new(self.node(output))
				.comment(format!("{} is generated along with {}.", self.rel(output), rel));
			alias.depends.push(target.clone());
			file.rules.push(alias);
		}

		let clean_target = format!("{}.clean", keys[0]);
		let mut clean = Rule::new(clean_target.clone())
			.comment(format!("Clean the outputs of the command generating {}.", rel));
		clean.commands.push(self.remove_command(cc.outputs.iter().map(|o| self.arg(o))));
		file.rules.push(clean);

		if self.publish(diag, &name, &file) && !self.dir.properties.is_on("CLEAN_NO_CUSTOM") {
			self.state.hooks.clean.push(clean_target);
		}
	}

	/// Write the rule file of a utility target.
	///
	/// It shares `CustomRules.dir` with the custom commands, so a utility
	/// named like the output of one is skipped.
	pub(super) fn utility_target(&mut self, diag: &mut Diagnostics, target: &Target) {
		if self.state.custom_rules.contains_key(&target.name) {
			diag.error(ModelError::AmbiguousCustomOutput {
				output: self.binary_dir().join(&target.name).to_path_buf(),
			});
			return;
		}
		let name = format!("{}/{}.make", CUSTOM_RULES_DIR, target.name);
		let mut file = RuleFile::new(format!("Rule file for utility target {}.", target.name));

		let mut rule = Rule::new(target.name.clone())
			.comment(format!("Utility rule for target {}.", target.name));
		for source in &target.sources {
			if let Some(output) = source
				.custom_command
				.as_ref()
				.and_then(|cc| cc.primary_output())
			{
				rule.depends.push(self.node(output));
			}
		}
		for cc in target.build_commands() {
			for dep in &cc.depends {
				self.append_any_depend(&mut rule.depends, dep, true);
			}
		}
		for utility in &target.utilities {
			self.append_any_depend(&mut rule.depends, utility, false);
		}
		self.add_rule_dependency(&mut rule, &name);
		for cc in target.build_commands() {
			rule.commands.extend(self.custom_command_lines(cc));
		}
		file.rules.push(rule);

		let clean_target = format!("{}.clean", target.name);
		let mut clean = Rule::new(clean_target.clone())
			.comment(format!("Clean the outputs of target {}.", target.name));
		let outputs: Vec<String> = target
			.build_commands()
			.flat_map(|cc| &cc.outputs)
			.map(|o| self.arg(o))
			.collect();
		if !outputs.is_empty() {
			clean.commands.push(self.remove_command(outputs));
		}
		file.rules.push(clean);

		if self.publish(diag, &name, &file) {
			self.state.hooks.clean.push(clean_target);
			if target.in_all {
				self.state.hooks.build.push(target.name.clone());
			}
		}
	}

	/// A command removing files, ignoring failure.
	pub(super) fn remove_command(&self, files: impl IntoIterator<Item = String>) -> String {
		let mut command = "-$(RM)".to_string();
		for f in files {
			command.push(' ');
			command.push_str(&f);
		}
		command
	}
}
