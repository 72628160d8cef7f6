//! This library crate contains all the re-usable parts of `rulegen`, a
//! generator of makefile-based build systems.
//!
//! `rulegen` takes a target model (directories, targets, sources and custom
//! commands, as produced by an interpreter of the project description) and
//! writes a tree of makefiles for a native `make` tool.
//!
//! # Generating
//!
//! - **The target model**
//!
//!   The [`model`] module describes what is read: [`Model`](model::Model)
//!   with its directories and targets, and the toolchain's rule templates.
//!
//! - **Rule generation**
//!
//!   The [`generator`] module writes the `Makefile` of a directory and the
//!   rule files of its targets, objects and custom commands.
//!
//! - **The whole tree**
//!
//!   [`project::generate`] generates all directories in order, and records
//!   a manifest for each.
//!
//! # During the build
//!
//! - **Staleness**
//!
//!   [`staleness::check_build_system`] compares a manifest's inputs and
//!   outputs, to decide whether everything must be generated again.
//!
//! - **Dependency scanning**
//!
//!   The [`depends`] module scans sources for includes and keeps a ledger
//!   of the dependencies of every object file.
//!
//! # Utilities
//!
//! - [`listfile`]: the simple sectioned list format of all bookkeeping
//!   files.
//! - [`genfile`]: writing generated files atomically, optionally only when
//!   their content changes.
//! - [`mtime`]: reading modification times, with a
//!   [`StatCache`](mtime::StatCache).
//! - [`path`]: paths as they appear in rules and commands.

pub mod depends;
pub mod error;
pub mod generator;
pub mod genfile;
pub mod listfile;
pub mod model;
pub mod mtime;
pub mod path;
pub mod project;
pub mod staleness;
