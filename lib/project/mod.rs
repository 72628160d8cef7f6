//! Generating the build system of a whole project tree.
//!
//! The coordinator visits all directories depth-first, runs a
//! [`LocalGenerator`] for each, and afterwards records what was read and
//! written in a manifest per directory. The manifests are what
//! [`check_build_system`](crate::staleness::check_build_system) uses to decide
//! whether everything has to be generated again.
//!
//! Files in the top build directory:
//!
//! - `RuleGenCache.list`: settings that must stay the same between runs,
//!   like the list of configurations.
//! - `rulegen.check_cache`: rewritten on every run, so its timestamp says
//!   when the build system was last generated.

use crate::error::{Diagnostics, FatalError, ModelError};
use crate::generator::{
	Backend, Context, DirectoryOutput, DirectoryRole, LocalGenerator, MAKEFILE, MANIFEST,
};
use crate::listfile::ListFile;
use crate::model::{Directory, Model};
use crate::path::BuildPath;
use indexmap::IndexMap;
use log::{debug, error, warn};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const CACHE_FILE: &str = "RuleGenCache.list";
pub const CHECK_CACHE: &str = "rulegen.check_cache";

const CONFIGURATION_TYPES: [&str; 4] = ["Debug", "Release", "MinSizeRel", "RelWithDebInfo"];
const DEFAULT_CONFIGURATIONS: [&str; 2] = ["Debug", "Release"];

/// The result of a generation pass.
#[derive(Debug)]
pub struct Generated {
	/// Per build directory, in the order they were generated.
	pub directories: Vec<(BuildPath, DirectoryOutput)>,
	pub configurations: Vec<String>,
	/// Whether manifests were written. Not after a pass with errors.
	pub manifests_written: bool,
}

/// All directories, depth-first from the top, children in declared order.
///
/// Directories that are nobody's child come last, in model order.
pub fn directory_order(model: &Model) -> Vec<&Directory> {
	fn visit<'m>(
		model: &'m Model,
		dir: &'m Directory,
		seen: &mut HashSet<&'m BuildPath>,
		order: &mut Vec<&'m Directory>,
	) {
		if !seen.insert(&dir.binary_dir) {
			return;
		}
		order.push(dir);
		for child in &dir.children {
			if let Some(child) = model.directory(child) {
				visit(model, child, seen, order);
			}
		}
	}
	let mut seen = HashSet::new();
	let mut order = Vec::new();
	for dir in &model.directories {
		visit(model, dir, &mut seen, &mut order);
	}
	order
}

/// The directories of every project, in traversal order.
///
/// The first one of each project is where its `install` and `test` rules
/// go.
pub fn projects<'m>(order: &[&'m Directory]) -> IndexMap<&'m str, Vec<&'m BuildPath>> {
	let mut projects: IndexMap<&str, Vec<&BuildPath>> = IndexMap::new();
	for dir in order {
		projects
			.entry(&dir.project[..])
			.or_default()
			.push(&dir.binary_dir);
	}
	projects
}

/// Decide on the configurations to support.
///
/// Those from the settings, if any. Otherwise, those used last time, or
/// the defaults.
pub fn configurations(model: &Model, cache: &ListFile, diag: &mut Diagnostics) -> Vec<String> {
	let requested = &model.settings.configuration_types;
	let mut valid = Vec::new();
	if !requested.is_empty() {
		for c in requested {
			if CONFIGURATION_TYPES.contains(&&c[..]) {
				if !valid.contains(c) {
					valid.push(c.clone());
				}
			} else {
				diag.error(ModelError::InvalidConfiguration(c.clone()));
			}
		}
	} else {
		valid.extend(
			cache
				.items("configurations")
				.iter()
				.filter(|c| CONFIGURATION_TYPES.contains(&&c[..]))
				.cloned(),
		);
	}
	if valid.is_empty() {
		valid = DEFAULT_CONFIGURATIONS.iter().map(|c| c.to_string()).collect();
	}
	valid
}

fn read_cache(path: &Path) -> ListFile {
	if !path.exists() {
		return ListFile::new();
	}
	ListFile::read(path).unwrap_or_else(|e| {
		warn!("Ignoring unreadable cache: {}", e);
		ListFile::new()
	})
}

/// Generate the build system of all directories of the model.
///
/// Errors in parts of the model are recorded in `diag`. If there were any,
/// the manifests are removed instead of written, so the next build
/// regenerates.
pub fn generate(
	model: &Model,
	model_file: &BuildPath,
	backend: Backend,
	diag: &mut Diagnostics,
) -> Result<Generated, FatalError> {
	if model.directories.is_empty() {
		return Err(FatalError::Model {
			file: model_file.to_path_buf(),
			error: std::io::Error::new(ErrorKind::InvalidData, "No directories"),
		});
	}
	let result = generate_all(model, model_file, backend, diag);
	let ok = match &result {
		Ok(_) => !diag.has_errors(),
		Err(_) => false,
	};
	if !ok {
		remove_manifests(model);
	}
	let mut generated = result?;
	if ok {
		for (dir, output) in &generated.directories {
			if let Some(dir) = model.directory(dir) {
				if let Err(error) = write_manifest(model, model_file, dir, output) {
					diag.error(ModelError::Io {
						file: manifest_path(dir),
						error,
					});
				}
			}
		}
		generated.manifests_written = !diag.has_errors();
		if !generated.manifests_written {
			remove_manifests(model);
		}
	}
	Ok(generated)
}

fn generate_all(
	model: &Model,
	model_file: &BuildPath,
	backend: Backend,
	diag: &mut Diagnostics,
) -> Result<Generated, FatalError> {
	let order = directory_order(model);
	for dir in &order {
		let path = dir.binary_dir.to_path_buf();
		fs::create_dir_all(&path).map_err(|error| FatalError::CreateDirectory { dir: path, error })?;
	}

	let top = model.top().binary_dir.to_path_buf();
	let cache_path = top.join(CACHE_FILE);
	let mut cache = read_cache(&cache_path);
	let configurations = configurations(model, &cache, diag);
	*cache.section_mut("configurations") = configurations.clone();
	*cache.section_mut("backend") = vec![backend.name().to_string()];
	if let Err(error) = cache.write_if_different(&cache_path, "Settings kept between runs of rulegen.") {
		diag.error(ModelError::Io {
			file: cache_path,
			error,
		});
	}

	let mut check = ListFile::new();
	check.push("model", model_file.to_string());
	let check_path = top.join(CHECK_CACHE);
	if let Err(error) = check.write(&check_path, "Written on every generation of the build system.") {
		diag.error(ModelError::Io {
			file: check_path,
			error,
		});
	}

	let ctx = Context::new(model, model_file.clone(), backend, diag);
	let projects = projects(&order);
	debug!(
		"Generating {} directories of {} projects, {} targets",
		order.len(),
		projects.len(),
		ctx.targets.len()
	);
	let mut directories = Vec::with_capacity(order.len());
	for dir in order {
		let role = DirectoryRole {
			project_root: projects
				.get(&dir.project[..])
				.and_then(|dirs| dirs.first())
				.map_or(false, |&first| *first == dir.binary_dir),
		};
		let output = LocalGenerator::new(&ctx, dir, role).generate(diag)?;
		directories.push((dir.binary_dir.clone(), output));
	}
	Ok(Generated {
		directories,
		configurations,
		manifests_written: false,
	})
}

pub fn manifest_path(dir: &Directory) -> PathBuf {
	dir.binary_dir.to_path_buf().join(MANIFEST)
}

/// The manifest of a directory: what generation read, what it wrote, and
/// which objects have a dependency ledger.
fn manifest(model: &Model, model_file: &BuildPath, dir: &Directory, output: &DirectoryOutput) -> ListFile {
	let top = &model.top().binary_dir;
	let mut list = ListFile::new();
	list.push("inputs", model_file.to_string());
	list.push("inputs", top.join(CACHE_FILE).to_string());
	for file in &dir.list_files {
		list.push("inputs", file.to_string());
	}
	list.push("outputs", dir.binary_dir.join(MAKEFILE).to_string());
	list.push("outputs", top.join(CHECK_CACHE).to_string());
	list.push(
		"outputs",
		BuildPath::from_path(&output.directory_information).to_string(),
	);
	for (lang, objects) in &output.objects {
		list.section_mut(format!("objects {}", lang))
			.extend(objects.iter().cloned());
	}
	list
}

fn write_manifest(
	model: &Model,
	model_file: &BuildPath,
	dir: &Directory,
	output: &DirectoryOutput,
) -> std::io::Result<()> {
	manifest(model, model_file, dir, output)
		.write(manifest_path(dir), "Inputs and outputs of the generation of this directory.")?;
	Ok(())
}

fn remove_manifests(model: &Model) {
	for dir in &model.directories {
		let path = manifest_path(dir);
		match fs::remove_file(&path) {
			Ok(()) => debug!("Removed {:?}", path),
			Err(ref e) if e.kind() == ErrorKind::NotFound => {}
			Err(e) => error!("Unable to remove {:?}: {}", path, e),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::model::{SourceFile, Target, TargetKind};
	use crate::staleness::{check_build_system, Freshness};

	fn model(root: &Path) -> Model {
		let src = BuildPath::from_path(&root.join("src"));
		let bin = BuildPath::from_path(&root.join("build"));
		let mut top = Directory::new(&src, &bin, "demo");
		top.children = vec![bin.join("lib"), bin.join("app")];
		top.list_files = vec![src.join("project.txt")];
		let mut lib = Directory::new(src.join("lib"), bin.join("lib"), "demo");
		let mut foo = Target::new("foo", TargetKind::StaticLibrary);
		foo.sources.push(SourceFile::new(src.join("lib/foo.c")));
		lib.targets.push(foo);
		let mut app = Directory::new(src.join("app"), bin.join("app"), "app");
		let mut exe = Target::new("app", TargetKind::Executable);
		exe.sources.push(SourceFile::new(src.join("app/main.c")));
		exe.link_libraries.push("foo".to_string());
		app.targets.push(exe);
		// Listed first, but visited after its parent.
		Model {
			directories: vec![top, app, lib],
			..Model::default()
		}
	}

	fn setup() -> (tempfile::TempDir, Model, BuildPath) {
		let root = tempfile::tempdir().unwrap();
		fs::create_dir_all(root.path().join("src")).unwrap();
		fs::write(root.path().join("src/project.txt"), "").unwrap();
		let model_file = root.path().join("model.json");
		fs::write(&model_file, "{}").unwrap();
		let model = model(root.path());
		(root, model, BuildPath::from_path(&model_file))
	}

	#[test]
	fn order_and_projects() {
		let root = tempfile::tempdir().unwrap();
		let mut model = model(root.path());
		model.directories.push(Directory::new("/x", "/orphan", "other"));
		let order = directory_order(&model);
		let names: Vec<&str> = order.iter().map(|d| d.binary_dir.file_name()).collect();
		assert_eq!(names, ["build", "lib", "app", "orphan"]);
		let projects = projects(&order);
		assert_eq!(projects.len(), 3);
		assert_eq!(projects["demo"].len(), 2);
		assert_eq!(projects["app"][0].file_name(), "app");
	}

	#[test]
	fn model_without_directories() {
		let mut diag = Diagnostics::new();
		let model_file = BuildPath::new("/m.json");
		match generate(&Model::default(), &model_file, Backend::UnixMakefiles, &mut diag) {
			Err(FatalError::Model { file, .. }) => assert_eq!(file, Path::new("/m.json")),
			r => panic!("{:?}", r.map(|_| ())),
		}
	}

	#[test]
	fn configuration_types() {
		let mut model = Model::default();
		let mut diag = Diagnostics::new();
		let mut cache = ListFile::new();
		assert_eq!(configurations(&model, &cache, &mut diag), ["Debug", "Release"]);
		cache.push("configurations", "MinSizeRel");
		assert_eq!(configurations(&model, &cache, &mut diag), ["MinSizeRel"]);
		model.settings.configuration_types = vec!["Release".to_string(), "Fast".to_string()];
		assert_eq!(configurations(&model, &cache, &mut diag), ["Release"]);
		assert!(diag.has_errors());
	}

	#[test]
	fn whole_project() {
		let (root, model, model_file) = setup();
		let mut diag = Diagnostics::new();
		let generated = generate(&model, &model_file, Backend::UnixMakefiles, &mut diag).unwrap();
		assert!(!diag.has_errors());
		assert!(generated.manifests_written);
		assert_eq!(generated.directories.len(), 3);
		assert_eq!(generated.configurations, ["Debug", "Release"]);

		let build = root.path().join("build");
		for dir in &[build.clone(), build.join("lib"), build.join("app")] {
			assert!(dir.join("Makefile").exists());
			assert!(dir.join("Makefile.manifest").exists());
		}
		assert!(build.join(CHECK_CACHE).exists());
		let cache = ListFile::read(build.join(CACHE_FILE)).unwrap();
		assert_eq!(cache.items("configurations"), ["Debug", "Release"]);
		assert_eq!(cache.items("backend"), ["Unix Makefiles"]);

		let manifest = ListFile::read(build.join("lib/Makefile.manifest")).unwrap();
		assert_eq!(manifest.items("objects C"), ["foo.dir/foo.o"]);
		assert_eq!(manifest.items("inputs")[0], model_file.as_str());
		let top = ListFile::read(build.join("Makefile.manifest")).unwrap();
		assert!(top.items("inputs").iter().any(|i| i.ends_with("project.txt")));

		// The install and test rules only go to the first directory of each
		// project.
		let mut model = model;
		model.settings.install_script = Some(BuildPath::new("/i.sh"));
		generate(&model, &model_file, Backend::UnixMakefiles, &mut diag).unwrap();
		assert!(fs::read_to_string(build.join("Makefile")).unwrap().contains("\ninstall: all\n"));
		assert!(fs::read_to_string(build.join("app/Makefile")).unwrap().contains("\ninstall: all\n"));
		assert!(!fs::read_to_string(build.join("lib/Makefile")).unwrap().contains("\ninstall:"));

		assert_eq!(
			check_build_system(Some(&build.join("lib/Makefile.manifest"))),
			Freshness::Fresh
		);
	}

	#[test]
	fn errors_remove_manifests() {
		let (root, mut model, model_file) = setup();
		let mut diag = Diagnostics::new();
		generate(&model, &model_file, Backend::UnixMakefiles, &mut diag).unwrap();
		let manifest = root.path().join("build/app/Makefile.manifest");
		assert!(manifest.exists());

		model.directories[2]
			.targets
			.push(Target::new("app", TargetKind::Utility));
		let mut diag = Diagnostics::new();
		let generated = generate(&model, &model_file, Backend::UnixMakefiles, &mut diag).unwrap();
		assert!(diag.has_errors());
		assert!(!generated.manifests_written);
		assert!(!manifest.exists());
		match check_build_system(Some(&manifest)) {
			Freshness::Stale(_) => {}
			f => panic!("{:?}", f),
		}
	}

	#[test]
	fn fatal_errors_remove_manifests() {
		let (root, mut model, model_file) = setup();
		let mut diag = Diagnostics::new();
		generate(&model, &model_file, Backend::UnixMakefiles, &mut diag).unwrap();
		if let Some(c) = model.toolchain.languages.get_mut("C") {
			c.link_executable = None;
		}
		match generate(&model, &model_file, Backend::UnixMakefiles, &mut diag) {
			Err(FatalError::MissingDefinition { .. }) => {}
			r => panic!("{:?}", r.map(|_| ())),
		}
		assert!(!root.path().join("build/Makefile.manifest").exists());
	}

	#[test]
	fn unwritable_build_directory_is_fatal() {
		let root = tempfile::tempdir().unwrap();
		fs::write(root.path().join("build"), "not a directory").unwrap();
		let model = model(root.path());
		let mut diag = Diagnostics::new();
		match generate(&model, &BuildPath::new("/m.json"), Backend::UnixMakefiles, &mut diag) {
			Err(FatalError::CreateDirectory { .. }) => {}
			r => panic!("{:?}", r.map(|_| ())),
		}
	}
}
