use log::{debug, info};
use rulegen::error::Diagnostics;
use rulegen::generator::Backend;
use rulegen::listfile::ListFile;
use rulegen::model::Model;
use rulegen::path::BuildPath;
use rulegen::project::{self, CACHE_FILE};
use rulegen::staleness::{check_build_system, Freshness};
use std::io::{Error, ErrorKind};
use std::path::Path;

pub(super) fn generate(
	model_file: &Path,
	backend: Option<Backend>,
	build_type: Option<&str>,
	manifest: Option<&Path>,
) -> Result<bool, Error> {
	if let Some(manifest) = manifest {
		match check_build_system(Some(manifest)) {
			Freshness::Fresh => {
				debug!("Build system is up to date.");
				return Ok(true);
			}
			Freshness::Stale(reason) => {
				println!("Regenerating the build system: {}", reason);
			}
		}
	}

	let model_file = std::env::current_dir()?.join(model_file);
	let mut model = Model::load(&model_file)?;
	if let Some(build_type) = build_type {
		model.settings.build_type = Some(build_type.to_string());
	}
	let backend = match backend {
		Some(b) => b,
		None => choose_backend(&model)?,
	};
	debug!("Generating {} for {:?}", backend, model_file);

	let mut diag = Diagnostics::new();
	let generated = project::generate(&model, &BuildPath::from_path(&model_file), backend, &mut diag)?;
	if diag.has_errors() {
		return Ok(false);
	}
	let n_rule_files: usize = generated
		.directories
		.iter()
		.map(|(_, out)| out.rule_files.len())
		.sum();
	info!(
		"{} directories, {} rule files, configurations {}",
		generated.directories.len(),
		n_rule_files,
		generated.configurations.join(";")
	);
	println!(
		"Build files have been written to: {}",
		model.top().binary_dir
	);
	Ok(true)
}

/// The backend from the model's settings, or the one used last time.
fn choose_backend(model: &Model) -> Result<Backend, Error> {
	let cache = model.top().binary_dir.to_path_buf().join(CACHE_FILE);
	let cached = ListFile::read(&cache)
		.ok()
		.and_then(|list| list.items("backend").first().cloned());
	match model.settings.backend.clone().or(cached) {
		Some(name) => name
			.parse()
			.map_err(|e: String| Error::new(ErrorKind::InvalidInput, e)),
		None => Ok(Backend::UnixMakefiles),
	}
}

pub(super) fn check(manifest: &Path) -> Result<bool, Error> {
	match check_build_system(Some(manifest)) {
		Freshness::Fresh => Ok(true),
		Freshness::Stale(reason) => {
			println!("Build system is out of date: {}", reason);
			Ok(false)
		}
	}
}
