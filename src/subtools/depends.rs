use log::{debug, warn};
use rulegen::depends::{scan_and_write, write_empty, DirectoryInformation};
use rulegen::error::ModelError;
use rulegen::generator::Backend;
use rulegen::model::Language;
use rulegen::path::BuildPath;
use std::io::Error;
use std::path::Path;

/// Scan the dependencies of `object`, from the build directory it is in.
///
/// A language without a scanner gets an empty ledger.
pub(super) fn depends(
	skip: bool,
	backend: Backend,
	language: &str,
	object: &str,
	source: &Path,
) -> Result<bool, Error> {
	let dir = std::env::current_dir()?;
	let info = DirectoryInformation::read(&dir).unwrap_or_else(|e| {
		warn!("{}", e);
		DirectoryInformation::default()
	});
	let style = backend.path_style(info.force_unix_paths);
	if skip {
		write_empty(&dir, object, style)?;
		return Ok(true);
	}
	let language = match Language::from_name(language) {
		Some(l) => l,
		None => {
			warn!(
				"{}",
				ModelError::NoDependsChecker {
					language: language.to_string()
				}
			);
			write_empty(&dir, object, style)?;
			return Ok(true);
		}
	};
	let n = scan_and_write(&dir, &info, language, object, &BuildPath::from_path(source), style)?;
	debug!("{} has {} dependencies", object, n);
	Ok(true)
}
