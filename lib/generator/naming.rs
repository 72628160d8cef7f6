//! The names of the files targets produce.

use crate::model::{Directory, Platform, Target, TargetKind};
use crate::path::BuildPath;

/// The file names of a linked target.
///
/// Only shared libraries with a `VERSION` or `SOVERSION` (on platforms with
/// a `soname`) have different names: the library is created as
/// `real_name`, and `so_name` and `name` are symlinks to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetNames {
	/// The name other targets link with, e.g. `libfoo.so`.
	pub name: String,
	/// e.g. `libfoo.so.1`.
	pub so_name: String,
	/// e.g. `libfoo.so.1.2`.
	pub real_name: String,
	/// The name without suffix, e.g. `libfoo`.
	pub base_name: String,
}

impl TargetNames {
	/// Whether the library needs symlinks next to it.
	pub fn has_links(&self) -> bool {
		self.name != self.real_name
	}

	/// All distinct names, real name first.
	pub fn all(&self) -> Vec<&str> {
		let mut names = vec![&self.real_name[..]];
		for &n in [&self.so_name[..], &self.name[..]].iter() {
			if !names.contains(&n) {
				names.push(n);
			}
		}
		names
	}
}

pub fn target_names(target: &Target, platform: &Platform) -> TargetNames {
	let props = &target.properties;
	let (prefix, suffix) = match target.kind {
		TargetKind::Executable => ("", &platform.executable_suffix[..]),
		TargetKind::StaticLibrary => (
			&platform.static_library_prefix[..],
			&platform.static_library_suffix[..],
		),
		TargetKind::SharedLibrary => (
			&platform.shared_library_prefix[..],
			&platform.shared_library_suffix[..],
		),
		TargetKind::ModuleLibrary => (&platform.module_prefix[..], &platform.module_suffix[..]),
		_ => ("", ""),
	};
	let prefix = props.get("PREFIX").unwrap_or(prefix);
	let suffix = props.get("SUFFIX").unwrap_or(suffix);
	let base = props.get_nonempty("OUTPUT_NAME").unwrap_or(&target.name);

	let versioned = target.kind == TargetKind::SharedLibrary && platform.soname_flag.is_some();
	let mut version = props.get_nonempty("VERSION").filter(|_| versioned);
	let soversion = props.get_nonempty("SOVERSION").filter(|_| versioned).or(version);
	if version.is_none() {
		version = soversion;
	}

	let name = format!("{}{}{}", prefix, base, suffix);
	let with = |v: Option<&str>| match v {
		Some(v) => format!("{}.{}", name, v),
		None => name.clone(),
	};
	TargetNames {
		so_name: with(soversion),
		real_name: with(version),
		base_name: format!("{}{}", prefix, base),
		name,
	}
}

/// The directory a target's file ends up in.
pub fn output_directory(dir: &Directory, kind: TargetKind) -> BuildPath {
	let var = if kind == TargetKind::Executable {
		"EXECUTABLE_OUTPUT_PATH"
	} else {
		"LIBRARY_OUTPUT_PATH"
	};
	match dir.definitions.get_nonempty(var) {
		Some(path) => dir.binary_dir.join(path),
		None => dir.binary_dir.clone(),
	}
}

/// Whether an executable is laid out as an application bundle.
pub fn is_bundle(target: &Target, platform: &Platform) -> bool {
	platform.bundles
		&& target.kind == TargetKind::Executable
		&& target.properties.is_on("MACOSX_BUNDLE")
}

/// The full path of the file a target produces, or `None` if it produces
/// none.
pub fn output_path(dir: &Directory, target: &Target, platform: &Platform) -> Option<BuildPath> {
	if !target.kind.is_linked() {
		return None;
	}
	let out = output_directory(dir, target.kind);
	let names = target_names(target, platform);
	if is_bundle(target, platform) {
		Some(out.join(format!("{0}.app/Contents/MacOS/{0}", names.name)))
	} else {
		Some(out.join(&names.name))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn library(kind: TargetKind, props: &[(&str, &str)]) -> Target {
		let mut t = Target::new("foo", kind);
		for (k, v) in props {
			t.properties.set(*k, *v);
		}
		t
	}

	#[test]
	fn plain_names() {
		let p = Platform::default();
		let n = target_names(&library(TargetKind::StaticLibrary, &[]), &p);
		assert_eq!(n.name, "libfoo.a");
		assert_eq!(n.base_name, "libfoo");
		assert!(!n.has_links());
		assert_eq!(n.all(), ["libfoo.a"]);
		let n = target_names(&library(TargetKind::Executable, &[("OUTPUT_NAME", "bar")]), &p);
		assert_eq!(n.name, "bar");
		let n = target_names(
			&library(TargetKind::ModuleLibrary, &[("PREFIX", ""), ("SUFFIX", ".plugin")]),
			&p,
		);
		assert_eq!(n.name, "foo.plugin");
	}

	#[test]
	fn versioned_names() {
		let p = Platform::default();
		let t = library(TargetKind::SharedLibrary, &[("VERSION", "1.2"), ("SOVERSION", "1")]);
		let n = target_names(&t, &p);
		assert_eq!(n.name, "libfoo.so");
		assert_eq!(n.so_name, "libfoo.so.1");
		assert_eq!(n.real_name, "libfoo.so.1.2");
		assert_eq!(n.all(), ["libfoo.so.1.2", "libfoo.so.1", "libfoo.so"]);

		let t = library(TargetKind::SharedLibrary, &[("VERSION", "2")]);
		let n = target_names(&t, &p);
		assert_eq!(n.so_name, "libfoo.so.2");
		assert_eq!(n.real_name, "libfoo.so.2");
		assert_eq!(n.all(), ["libfoo.so.2", "libfoo.so"]);

		let t = library(TargetKind::SharedLibrary, &[("SOVERSION", "3")]);
		assert_eq!(target_names(&t, &p).real_name, "libfoo.so.3");

		let t = library(TargetKind::StaticLibrary, &[("VERSION", "1.2")]);
		assert!(!target_names(&t, &p).has_links());

		let no_soname = Platform {
			soname_flag: None,
			..Platform::default()
		};
		let t = library(TargetKind::SharedLibrary, &[("VERSION", "1.2")]);
		assert!(!target_names(&t, &no_soname).has_links());
	}

	#[test]
	fn output_paths() {
		let mut dir = Directory::new("/src", "/build", "demo");
		let p = Platform::default();
		let exe = library(TargetKind::Executable, &[]);
		let lib = library(TargetKind::StaticLibrary, &[]);
		assert_eq!(output_path(&dir, &exe, &p).unwrap().as_str(), "/build/foo");
		dir.definitions.set("LIBRARY_OUTPUT_PATH", "lib");
		dir.definitions.set("EXECUTABLE_OUTPUT_PATH", "/out/bin");
		assert_eq!(output_path(&dir, &lib, &p).unwrap().as_str(), "/build/lib/libfoo.a");
		assert_eq!(output_path(&dir, &exe, &p).unwrap().as_str(), "/out/bin/foo");
		assert_eq!(output_path(&dir, &Target::new("u", TargetKind::Utility), &p), None);

		let mac = Platform {
			bundles: true,
			..Platform::default()
		};
		let app = library(TargetKind::Executable, &[("MACOSX_BUNDLE", "ON")]);
		assert_eq!(
			output_path(&dir, &app, &mac).unwrap().as_str(),
			"/out/bin/foo.app/Contents/MacOS/foo"
		);
	}
}
