//! Errors, and where they happened.
//!
//! Three kinds of problems are distinguished:
//!
//! - [`ErrorWithLocation`]: a problem at a specific line of a file we read
//!   back (manifests, directory information files, caches).
//! - [`ModelError`]: a problem with (part of) the target model, or with
//!   writing one generated file. These are *soft*: they are recorded in
//!   [`Diagnostics`], and generation of everything else continues.
//! - [`FatalError`]: a problem after which the whole generation pass is
//!   aborted.

use log::{error, warn};
use std::error::Error;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// A line in a file: The place where something went wrong.
///
/// Both fields are optional, in case they are not known.
#[derive(Copy, Clone, Debug)]
pub struct Location<'a> {
	pub file: Option<&'a Path>,
	pub line: Option<NonZeroU32>,
}

/// An error which happened at a specific line in some file.
#[derive(Debug)]
pub struct ErrorWithLocation<T> {
	pub file: Option<PathBuf>,
	pub line: Option<NonZeroU32>,
	pub error: T,
}

impl<'a> Location<'a> {
	/// A location at the given (1-based) line in a file.
	pub fn at_line(file: &'a Path, line: usize) -> Self {
		Location {
			file: Some(file),
			line: NonZeroU32::new(line as u32),
		}
	}

	/// Create an error containing location information.
	pub fn error<E>(&self, error: E) -> ErrorWithLocation<E> {
		ErrorWithLocation {
			file: self.file.map(|p| p.to_path_buf()),
			line: self.line,
			error,
		}
	}
}

/// Extension trait: Adds [`err_at()`][Self::err_at] to [`Result`].
pub trait AddLocationToResult {
	type WithLocation;
	/// Add location information to the error.
	fn err_at(self, location: Location) -> Self::WithLocation;
}

impl<T, E> AddLocationToResult for Result<T, E> {
	type WithLocation = Result<T, ErrorWithLocation<E>>;
	fn err_at(self, location: Location) -> Self::WithLocation {
		self.map_err(|e| location.error(e))
	}
}

impl<T: fmt::Display> fmt::Display for ErrorWithLocation<T> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		if self.file.is_some() || self.line.is_some() {
			if let Some(file) = self.file.as_ref() {
				write!(f, "{}", file.display())?;
			}
			if let Some(line) = self.line {
				write!(f, ":{}", line)?;
			}
			write!(f, ": ")?;
		}
		write!(f, "{}", self.error)
	}
}

impl<T: Error> Error for ErrorWithLocation<T> {}

/// A problem with the target model, or with writing a single rule file.
///
/// Never fatal: the affected rule or file is skipped.
#[derive(Debug)]
pub enum ModelError {
	/// The same source file was listed more than once for a target.
	DuplicateSource { target: String, source: PathBuf },
	/// Two custom commands claim the same output.
	AmbiguousCustomOutput { output: PathBuf },
	/// The language to link a target with could not be determined.
	MissingLinkLanguage { target: String },
	/// A compiled source file has an extension of no known language.
	UnknownSourceLanguage { source: PathBuf },
	/// No dependency scanner exists for the language of an object file.
	NoDependsChecker { language: String },
	/// A target with the same name was already declared elsewhere.
	DuplicateTarget { target: String, directory: PathBuf },
	/// An entry of the configuration types was not recognized.
	InvalidConfiguration(String),
	/// A generated file could not be written.
	Io { file: PathBuf, error: std::io::Error },
}

impl fmt::Display for ModelError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ModelError::DuplicateSource { target, source } => write!(
				f,
				"Source file {:?} is listed multiple times for target {:?}",
				source, target
			),
			ModelError::AmbiguousCustomOutput { output } => write!(
				f,
				"An output was found with multiple rules on how to build it: {:?}",
				output
			),
			ModelError::MissingLinkLanguage { target } => {
				write!(f, "Cannot determine link language for target {:?}", target)
			}
			ModelError::UnknownSourceLanguage { source } => {
				write!(f, "Source file {:?} has unknown type", source)
			}
			ModelError::NoDependsChecker { language } => write!(
				f,
				"No dependency checker available for language {:?}",
				language
			),
			ModelError::DuplicateTarget { target, directory } => write!(
				f,
				"Target {:?} is already defined in {:?}",
				target, directory
			),
			ModelError::InvalidConfiguration(c) => write!(
				f,
				"Invalid configuration type {:?} (valid types are Debug, Release, MinSizeRel, RelWithDebInfo)",
				c
			),
			ModelError::Io { file, error } => {
				write!(f, "Unable to write {:?}: {}", file, error)
			}
		}
	}
}

impl Error for ModelError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ModelError::Io { error, .. } => Some(error),
			_ => None,
		}
	}
}

/// A problem after which the generation pass cannot continue.
#[derive(Debug)]
pub enum FatalError {
	/// An output directory could not be created.
	CreateDirectory { dir: PathBuf, error: std::io::Error },
	/// A rule template the toolchain must provide is missing.
	MissingDefinition { name: String },
	/// No unique name was found within the configured number of attempts.
	NamesExhausted { name: String, attempts: u32 },
	/// The target model could not be read.
	Model { file: PathBuf, error: std::io::Error },
}

impl fmt::Display for FatalError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			FatalError::CreateDirectory { dir, error } => {
				write!(f, "Unable to create directory {:?}: {}", dir, error)
			}
			FatalError::MissingDefinition { name } => write!(
				f,
				"Required toolchain definition {} is missing",
				name
			),
			FatalError::NamesExhausted { name, attempts } => write!(
				f,
				"No unique name found for {:?} after {} attempts",
				name, attempts
			),
			FatalError::Model { file, error } => {
				write!(f, "Unable to read target model {:?}: {}", file, error)
			}
		}
	}
}

impl Error for FatalError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			FatalError::CreateDirectory { error, .. } => Some(error),
			FatalError::Model { error, .. } => Some(error),
			_ => None,
		}
	}
}

impl From<FatalError> for std::io::Error {
	fn from(src: FatalError) -> std::io::Error {
		std::io::Error::new(std::io::ErrorKind::Other, src)
	}
}

/// How bad a [`ModelError`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
	Warning,
	Error,
}

/// The soft errors collected during one generation pass.
///
/// Owned by the driver, and handed to every generator by reference. The
/// driver checks [`has_errors`][Self::has_errors] at pass boundaries.
#[derive(Debug, Default)]
pub struct Diagnostics {
	entries: Vec<(Severity, ModelError)>,
}

impl Diagnostics {
	pub fn new() -> Self {
		Diagnostics {
			entries: Vec::new(),
		}
	}

	/// Record (and log) a warning.
	pub fn warn(&mut self, e: ModelError) {
		warn!("{}", e);
		self.entries.push((Severity::Warning, e));
	}

	/// Record (and log) an error.
	pub fn error(&mut self, e: ModelError) {
		error!("{}", e);
		self.entries.push((Severity::Error, e));
	}

	pub fn has_errors(&self) -> bool {
		self.entries.iter().any(|(s, _)| *s == Severity::Error)
	}

	pub fn n_warnings(&self) -> usize {
		self.entries
			.iter()
			.filter(|(s, _)| *s == Severity::Warning)
			.count()
	}
}
