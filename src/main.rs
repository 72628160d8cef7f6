mod logger;
mod subtools;

use self::logger::Logger;
use log::{debug, error};
use rulegen::generator::Backend;
use std::path::PathBuf;
use std::process::exit;
use structopt::StructOpt;

#[derive(StructOpt)]
struct Options {
	/// Change directory before doing anything else.
	#[structopt(short = "C", parse(from_os_str))]
	directory: Option<PathBuf>,

	/// Enable debug messages.
	#[structopt(long)]
	debug: bool,

	#[structopt(subcommand)]
	command: Command,
}

#[derive(StructOpt)]
enum Command {
	/// Generate the build system from a target model.
	#[structopt(name = "generate")]
	Generate {
		/// The target model, as written by the project interpreter.
		#[structopt(long = "model", parse(from_os_str))]
		model: PathBuf,

		/// The backend to generate for. Overrides the model's settings.
		#[structopt(long = "backend")]
		backend: Option<Backend>,

		/// The active build type. Overrides the model's settings.
		#[structopt(long = "build-type")]
		build_type: Option<String>,

		/// Only regenerate if this manifest says the build system is stale.
		#[structopt(long = "check-build-system", parse(from_os_str))]
		check_build_system: Option<PathBuf>,
	},

	/// Check whether the build system is up to date. Exits with 1 if not.
	#[structopt(name = "check-build-system")]
	CheckBuildSystem {
		#[structopt(parse(from_os_str))]
		manifest: PathBuf,
	},

	/// Scan the dependencies of an object file, from its build directory.
	#[structopt(name = "depends")]
	Depends {
		/// Don't scan, only write an empty ledger.
		#[structopt(long = "skip")]
		skip: bool,
		backend: Backend,
		language: String,
		object: String,
		#[structopt(parse(from_os_str))]
		source: PathBuf,
	},

	/// Remove files.
	#[structopt(name = "remove")]
	Remove {
		/// Ignore files that don't exist.
		#[structopt(short = "f")]
		force: bool,
		#[structopt(parse(from_os_str))]
		files: Vec<PathBuf>,
	},

	/// Create the symbolic links of a versioned library.
	#[structopt(name = "symlink-library")]
	SymlinkLibrary {
		#[structopt(parse(from_os_str))]
		real_name: PathBuf,
		#[structopt(parse(from_os_str))]
		so_name: PathBuf,
		#[structopt(parse(from_os_str))]
		name: PathBuf,
	},

	/// Copy a file, unless the destination already has the same content.
	#[structopt(name = "copy-if-different")]
	CopyIfDifferent {
		#[structopt(parse(from_os_str))]
		source: PathBuf,
		#[structopt(parse(from_os_str))]
		destination: PathBuf,
	},

	/// Create directories, including their parents.
	#[structopt(name = "make-directory")]
	MakeDirectory {
		#[structopt(parse(from_os_str))]
		directories: Vec<PathBuf>,
	},
}

fn main() {
	log::set_logger(&Logger).unwrap();
	log::set_max_level(log::LevelFilter::Warn);

	let opt = Options::from_args();

	if let Some(dir) = opt.directory.as_ref() {
		std::env::set_current_dir(dir).unwrap_or_else(|e| {
			error!("Unable to change directory to {:?}: {}", dir, e);
			exit(1);
		});
	}

	if opt.debug {
		log::set_max_level(log::LevelFilter::Debug);
		debug!("Debug messages enabled.");
	}

	let ok = subtools::run(&opt.command).unwrap_or_else(|e| {
		error!("{}", e);
		false
	});

	if !ok || logger::n_errors() > 0 {
		exit(1);
	}
}
