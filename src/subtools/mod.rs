mod depends;
mod files;
mod generate;

use super::Command;
use std::io::Error;

/// Run a command. Returns whether it succeeded.
///
/// Errors that were already reported return `Ok(false)`.
pub(super) fn run(command: &Command) -> Result<bool, Error> {
	match command {
		Command::Generate {
			model,
			backend,
			build_type,
			check_build_system,
		} => generate::generate(
			model,
			*backend,
			build_type.as_ref().map(|s| &s[..]),
			check_build_system.as_ref().map(|p| p.as_path()),
		),
		Command::CheckBuildSystem { manifest } => generate::check(manifest),
		Command::Depends {
			skip,
			backend,
			language,
			object,
			source,
		} => depends::depends(*skip, *backend, language, object, source),
		Command::Remove { force, files } => files::remove(files, *force),
		Command::SymlinkLibrary {
			real_name,
			so_name,
			name,
		} => files::symlink_library(real_name, so_name, name).map(|()| true),
		Command::CopyIfDifferent {
			source,
			destination,
		} => files::copy(source, destination).map(|()| true),
		Command::MakeDirectory { directories } => files::make_directories(directories).map(|()| true),
	}
}
