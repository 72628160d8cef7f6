//! Reading and writing list files.
//!
//! List files are the small text files `rulegen` leaves behind for later
//! invocations: the generation manifest, the directory information used by
//! dependency scans, and the configuration cache. They look like this:
//!
//! ```text
//! # Comment.
//! [inputs]
//! "/src/CMakeLists.txt"
//! [objects C]
//! "app.dir/a.o"
//! ```
//!
//! A file consists of sections, each with a name and a list of quoted items.
//! Inside quotes, `\\` and `\"` are the only escapes.

use crate::error::{AddLocationToResult, ErrorWithLocation, Location};
use crate::genfile::{GeneratedFile, Published};
use indexmap::IndexMap;
use raw_string::RawString;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Error, Write};
use std::path::Path;

/// The contents of a list file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFile {
	sections: IndexMap<String, Vec<String>>,
}

/// A problem in the syntax of a list file.
#[derive(Debug)]
pub enum ParseError {
	Io(Error),
	InvalidUtf8,
	ItemOutsideSection,
	UnterminatedSection,
	UnterminatedItem,
	TrailingCharacters,
	InvalidEscape(char),
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ParseError::Io(e) => write!(f, "{}", e),
			ParseError::InvalidUtf8 => write!(f, "Invalid UTF-8"),
			ParseError::ItemOutsideSection => write!(f, "Item before the first section"),
			ParseError::UnterminatedSection => write!(f, "Missing `]'"),
			ParseError::UnterminatedItem => write!(f, "Missing closing quote"),
			ParseError::TrailingCharacters => write!(f, "Unexpected characters after item"),
			ParseError::InvalidEscape(c) => write!(f, "Invalid escape sequence `\\{}'", c),
		}
	}
}

impl std::error::Error for ParseError {}

impl From<Error> for ParseError {
	fn from(e: Error) -> Self {
		ParseError::Io(e)
	}
}

impl ListFile {
	pub fn new() -> Self {
		ListFile {
			sections: IndexMap::new(),
		}
	}

	/// Get the items of a section, if the section exists.
	pub fn get(&self, section: &str) -> Option<&[String]> {
		self.sections.get(section).map(|v| &v[..])
	}

	/// Get the items of a section, or an empty list.
	pub fn items(&self, section: &str) -> &[String] {
		self.get(section).unwrap_or(&[])
	}

	/// Iterate over all sections, in order.
	pub fn sections(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.sections.iter().map(|(k, v)| (&k[..], &v[..]))
	}

	/// Add a section (if it doesn't exist yet), and return its items.
	pub fn section_mut(&mut self, section: impl Into<String>) -> &mut Vec<String> {
		self.sections.entry(section.into()).or_insert_with(Vec::new)
	}

	/// Add an item to a section.
	pub fn push(&mut self, section: &str, item: impl Into<String>) {
		self.section_mut(section).push(item.into());
	}

	/// Read a list file.
	pub fn read(file: impl AsRef<Path>) -> Result<ListFile, ErrorWithLocation<ParseError>> {
		let path = file.as_ref();
		let file = File::open(path)
			.map_err(ParseError::Io)
			.err_at(Location {
				file: Some(path),
				line: None,
			})?;
		ListFile::read_from(BufReader::new(file), path)
	}

	/// Read a list file from a reader. `path` is only used in errors.
	pub fn read_from(
		mut file: impl BufRead,
		path: &Path,
	) -> Result<ListFile, ErrorWithLocation<ParseError>> {
		let mut list = ListFile::new();
		let mut current: Option<String> = None;
		let mut line = RawString::new();
		let mut line_number = 0;

		loop {
			line.clear();
			line_number += 1;
			let loc = Location::at_line(path, line_number);
			let n = file
				.read_until(b'\n', line.as_mut_bytes())
				.map_err(ParseError::Io)
				.err_at(loc)?;
			if n == 0 {
				break;
			}
			while line.last() == Some(b'\n') || line.last() == Some(b'\r') {
				line.pop();
			}
			let text = line
				.to_str()
				.map_err(|_| ParseError::InvalidUtf8)
				.err_at(loc)?
				.trim();
			if text.is_empty() || text.starts_with('#') {
				continue;
			}
			if text.starts_with('[') {
				if !text.ends_with(']') {
					return Err(loc.error(ParseError::UnterminatedSection));
				}
				let name = text[1..text.len() - 1].trim().to_string();
				list.section_mut(name.clone());
				current = Some(name);
			} else {
				let section = current
					.as_ref()
					.ok_or(ParseError::ItemOutsideSection)
					.err_at(loc)?;
				let item = parse_item(text).err_at(loc)?;
				list.push(section, item);
			}
		}

		Ok(list)
	}

	/// Render the list file.
	pub fn to_text(&self, header: &str) -> String {
		let mut out = String::new();
		for line in header.lines() {
			out.push_str("# ");
			out.push_str(line);
			out.push('\n');
		}
		for (name, items) in &self.sections {
			out.push('[');
			out.push_str(name);
			out.push_str("]\n");
			for item in items {
				out.push('"');
				for c in item.chars() {
					if c == '"' || c == '\\' {
						out.push('\\');
					}
					out.push(c);
				}
				out.push_str("\"\n");
			}
		}
		out
	}

	/// Write the list file, replacing whatever was there.
	pub fn write(&self, file: impl AsRef<Path>, header: &str) -> Result<Published, Error> {
		self.publish(file.as_ref(), header, false)
	}

	/// Write the list file, only touching it if its content changes.
	pub fn write_if_different(
		&self,
		file: impl AsRef<Path>,
		header: &str,
	) -> Result<Published, Error> {
		self.publish(file.as_ref(), header, true)
	}

	fn publish(&self, file: &Path, header: &str, copy_if_different: bool) -> Result<Published, Error> {
		let mut out = GeneratedFile::create(file)?;
		out.set_copy_if_different(copy_if_different);
		out.write_all(self.to_text(header).as_bytes())?;
		out.close()
	}
}

fn parse_item(text: &str) -> Result<String, ParseError> {
	let mut chars = text.chars();
	if chars.next() != Some('"') {
		return Err(ParseError::UnterminatedItem);
	}
	let mut item = String::new();
	loop {
		match chars.next() {
			None => return Err(ParseError::UnterminatedItem),
			Some('"') => break,
			Some('\\') => match chars.next() {
				Some(c @ '"') | Some(c @ '\\') => item.push(c),
				Some(c) => return Err(ParseError::InvalidEscape(c)),
				None => return Err(ParseError::UnterminatedItem),
			},
			Some(c) => item.push(c),
		}
	}
	if chars.as_str().trim().is_empty() {
		Ok(item)
	} else {
		Err(ParseError::TrailingCharacters)
	}
}
