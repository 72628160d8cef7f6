//! Writing makefile syntax.

use super::backend::Backend;
use std::io::{Result, Write};

const DIVIDER: &str =
	"#=============================================================================";

/// The header of every generated makefile.
pub fn write_disclaimer(out: &mut dyn Write, backend: Backend, what: &str) -> Result<()> {
	writeln!(out, "# RULEGEN generated file: DO NOT EDIT!")?;
	writeln!(
		out,
		"# Generated by \"{}\" Generator, rulegen {}",
		backend.name(),
		env!("CARGO_PKG_VERSION")
	)?;
	writeln!(out)?;
	writeln!(out, "# {}", what)?;
	writeln!(out)
}

pub fn write_divider(out: &mut dyn Write, comment: &str) -> Result<()> {
	writeln!(out, "{}", DIVIDER)?;
	for line in comment.lines() {
		writeln!(out, "# {}", line)?;
	}
	writeln!(out)
}

/// Write a rule.
///
/// Every dependency goes on its own `target: dependency` line. A rule
/// without commands gets the backend's empty command, if it needs one.
pub fn write_rule(
	out: &mut dyn Write,
	backend: Backend,
	comment: Option<&str>,
	target: &str,
	depends: &[String],
	commands: &[String],
) -> Result<()> {
	if let Some(comment) = comment {
		for line in comment.lines() {
			writeln!(out, "# {}", line)?;
		}
	}
	if depends.is_empty() {
		writeln!(out, "{}:", target)?;
	} else {
		for dep in depends {
			writeln!(out, "{}: {}", target, dep)?;
		}
	}
	if commands.is_empty() {
		if let Some(c) = backend.empty_command() {
			writeln!(out, "\t{}", c)?;
		}
	}
	for command in commands {
		writeln!(out, "\t{}", command)?;
	}
	writeln!(out)
}

/// A rule, before it is written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rule {
	pub comment: Option<String>,
	pub target: String,
	pub depends: Vec<String>,
	pub commands: Vec<String>,
}

impl Rule {
	pub fn new(target: impl Into<String>) -> Self {
		Rule {
			target: target.into(),
			..Rule::default()
		}
	}

	pub fn comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = Some(comment.into());
		self
	}

	pub fn write(&self, out: &mut dyn Write, backend: Backend) -> Result<()> {
		write_rule(
			out,
			backend,
			self.comment.as_ref().map(|s| &s[..]),
			&self.target,
			&self.depends,
			&self.commands,
		)
	}
}

/// The contents of a rule file included by a directory's makefile.
#[derive(Clone, Debug, Default)]
pub struct RuleFile {
	/// What the file is for, written in its header.
	pub description: String,
	pub includes: Vec<String>,
	pub variables: Vec<(String, String, Vec<String>)>,
	pub rules: Vec<Rule>,
}

impl RuleFile {
	pub fn new(description: impl Into<String>) -> Self {
		RuleFile {
			description: description.into(),
			..RuleFile::default()
		}
	}

	/// Add a list variable, with a comment.
	pub fn variable(&mut self, comment: impl Into<String>, name: impl Into<String>, values: Vec<String>) {
		self.variables.push((comment.into(), name.into(), values));
	}

	pub fn write(&self, out: &mut dyn Write, backend: Backend) -> Result<()> {
		write_disclaimer(out, backend, &self.description)?;
		for include in &self.includes {
			writeln!(out, "{} {}", backend.include_directive(), include)?;
		}
		if !self.includes.is_empty() {
			writeln!(out)?;
		}
		for (comment, name, values) in &self.variables {
			writeln!(out, "# {}", comment)?;
			write_list_variable(out, name, values)?;
		}
		for rule in &self.rules {
			rule.write(out, backend)?;
		}
		Ok(())
	}

	pub fn to_bytes(&self, backend: Backend) -> Vec<u8> {
		let mut out = Vec::new();
		// Writing to a Vec can't fail.
		let _ = self.write(&mut out, backend);
		out
	}
}

/// Write a variable holding a list of values, one per line.
pub fn write_list_variable(out: &mut dyn Write, name: &str, values: &[String]) -> Result<()> {
	write!(out, "{} =", name)?;
	for v in values {
		write!(out, " \\\n{}", v)?;
	}
	writeln!(out)?;
	writeln!(out)
}

/// Append `echo` commands printing `text`, one per line.
pub fn append_echo(commands: &mut Vec<String>, backend: Backend, text: &str) {
	for line in text.lines() {
		let line = line.replace('$', "$$");
		if backend.echo_needs_quotes() {
			commands.push(format!("@echo \"{}\"", line.replace('"', "\\\"")));
		} else {
			commands.push(format!("@echo {}", line));
		}
	}
}

/// Quote a command line argument, if needed.
pub fn shell_word(arg: &str) -> String {
	if arg.is_empty() {
		"\"\"".to_string()
	} else if arg.contains(|c: char| c == ' ' || c == '\t' || c == '"') {
		format!("\"{}\"", arg.replace('"', "\\\""))
	} else {
		arg.to_string()
	}
}

/// Turn a path into something usable in a file or rule name.
///
/// `../` becomes `___`, and `/` and `:` become `_`.
pub fn mangle_path(path: &str) -> String {
	path.replace("../", "___").replace(|c: char| c == '/' || c == ':', "_")
}

#[cfg(test)]
mod test {
	use super::*;

	fn rule(backend: Backend, depends: &[&str], commands: &[&str]) -> String {
		let mut out = Vec::new();
		let depends: Vec<String> = depends.iter().map(|s| s.to_string()).collect();
		let commands: Vec<String> = commands.iter().map(|s| s.to_string()).collect();
		write_rule(&mut out, backend, Some("A rule."), "t", &depends, &commands).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn rules() {
		assert_eq!(
			rule(Backend::UnixMakefiles, &["a", "b"], &["cmd"]),
			"# A rule.\nt: a\nt: b\n\tcmd\n\n"
		);
		assert_eq!(rule(Backend::UnixMakefiles, &[], &[]), "# A rule.\nt:\n\n");
		assert_eq!(
			rule(Backend::BorlandMakefiles, &[], &[]),
			"# A rule.\nt:\n\t@REM Borland Make needs a command here.\n\n"
		);
	}

	#[test]
	fn rule_file() {
		let mut file = RuleFile::new("Rule file for object file a.o.");
		file.includes.push("a.o.depends.make".to_string());
		file.variable("Objects", "x_OBJECTS", vec!["\"a.o\"".to_string()]);
		let mut rule = Rule::new("a.o").comment("Build a.o.");
		rule.depends.push("a.c".to_string());
		rule.commands.push("cc -c a.c".to_string());
		file.rules.push(rule);
		let text = String::from_utf8(file.to_bytes(Backend::NMakeMakefiles)).unwrap();
		assert!(text.starts_with("# RULEGEN generated file: DO NOT EDIT!\n"));
		assert!(text.contains(
			"# Rule file for object file a.o.\n\n!include a.o.depends.make\n\n# Objects\nx_OBJECTS = \\\n\"a.o\"\n\n# Build a.o.\na.o: a.c\n\tcc -c a.c\n\n"
		));
	}

	#[test]
	fn echo() {
		let mut c = Vec::new();
		append_echo(&mut c, Backend::UnixMakefiles, "Linking \"x\"\n$HOME");
		assert_eq!(c, ["@echo \"Linking \\\"x\\\"\"", "@echo \"$$HOME\""]);
		let mut c = Vec::new();
		append_echo(&mut c, Backend::NMakeMakefiles, "Building x");
		assert_eq!(c, ["@echo Building x"]);
	}

	#[test]
	fn words_and_names() {
		assert_eq!(shell_word("-o"), "-o");
		assert_eq!(shell_word("a b"), "\"a b\"");
		assert_eq!(shell_word(""), "\"\"");
		assert_eq!(mangle_path("../gen/x.c"), "___gen_x.c");
		assert_eq!(mangle_path("C:/x/y"), "C__x_y");
		let mut out = Vec::new();
		write_list_variable(&mut out, "x_OBJECTS", &["\"a.o\"".to_string()]).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "x_OBJECTS = \\\n\"a.o\"\n\n");
	}
}
