use crate::path::PathStyle;
use std::fmt;
use std::str::FromStr;

/// A native build tool that rules are generated for.
///
/// All backends share the same rule structure. They differ in the details
/// of the makefile dialect and of the shell that runs the commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
	UnixMakefiles,
	NMakeMakefiles,
	BorlandMakefiles,
}

impl Backend {
	pub const ALL: [Backend; 3] = [
		Backend::UnixMakefiles,
		Backend::NMakeMakefiles,
		Backend::BorlandMakefiles,
	];

	pub fn name(self) -> &'static str {
		match self {
			Backend::UnixMakefiles => "Unix Makefiles",
			Backend::NMakeMakefiles => "NMake Makefiles",
			Backend::BorlandMakefiles => "Borland Makefiles",
		}
	}

	pub fn from_name(name: &str) -> Option<Backend> {
		Backend::ALL.iter().cloned().find(|b| b.name() == name)
	}

	/// The directive to include another makefile.
	pub fn include_directive(self) -> &'static str {
		match self {
			Backend::UnixMakefiles => "include",
			Backend::NMakeMakefiles | Backend::BorlandMakefiles => "!include",
		}
	}

	/// The command to put in a rule that would otherwise have none.
	pub fn empty_command(self) -> Option<&'static str> {
		match self {
			Backend::BorlandMakefiles => Some("@REM Borland Make needs a command here."),
			_ => None,
		}
	}

	/// Whether `echo` needs its argument quoted.
	pub fn echo_needs_quotes(self) -> bool {
		self == Backend::UnixMakefiles
	}

	/// Whether commands run in a Windows shell, where `cd` in one command
	/// line stays in effect for the next ones.
	pub fn windows_shell(self) -> bool {
		self != Backend::UnixMakefiles
	}

	/// The maximum length of a make variable name.
	pub fn variable_size_limit(self) -> Option<usize> {
		match self {
			Backend::BorlandMakefiles => Some(32),
			_ => None,
		}
	}

	/// Whether recursive make calls need `$(MAKEFLAGS)` passed explicitly.
	pub fn pass_makeflags(self) -> bool {
		self == Backend::BorlandMakefiles
	}

	/// How paths are written in rules, unless forced to Unix style.
	pub fn path_style(self, force_unix_paths: bool) -> PathStyle {
		if self.windows_shell() && !force_unix_paths {
			PathStyle::Windows
		} else {
			PathStyle::Unix
		}
	}
}

impl fmt::Display for Backend {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Backend {
	type Err = String;
	fn from_str(s: &str) -> Result<Self, String> {
		Backend::from_name(s).ok_or_else(|| {
			let names: Vec<&str> = Backend::ALL.iter().map(|b| b.name()).collect();
			format!("Unknown backend {:?} (available: {})", s, names.join(", "))
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn names() {
		for &b in &Backend::ALL {
			assert_eq!(b.name().parse::<Backend>(), Ok(b));
		}
		assert!("Ninja".parse::<Backend>().is_err());
		assert_eq!(
			Backend::BorlandMakefiles.path_style(false),
			PathStyle::Windows
		);
		assert_eq!(Backend::BorlandMakefiles.path_style(true), PathStyle::Unix);
		assert_eq!(Backend::UnixMakefiles.path_style(false), PathStyle::Unix);
	}
}
