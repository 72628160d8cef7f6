use crate::error::FatalError;
use std::collections::{HashMap, HashSet};

/// Hands out unique names within one directory.
///
/// Both object file names (which may need mangling) and make variable names
/// (which some backends limit in length) can collide after being rewritten.
/// Collisions are resolved by trying numbered variants, at most `attempts`
/// times.
#[derive(Debug)]
pub struct UniqueNames {
	attempts: u32,
	objects: HashMap<String, String>,
	used_objects: HashSet<String>,
	variables: HashMap<String, String>,
	used_variables: HashSet<String>,
}

impl UniqueNames {
	pub fn new(attempts: u32) -> Self {
		UniqueNames {
			attempts: attempts.max(1),
			objects: HashMap::new(),
			used_objects: HashSet::new(),
			variables: HashMap::new(),
			used_variables: HashSet::new(),
		}
	}

	/// The (possibly mangled) name of an object file.
	///
	/// With `mangle`, every `+` becomes `_p_`. If that name was already given
	/// to another object, `_p1_`, `_p2_`, ... are tried instead (or `_1`,
	/// `_2`, ... before the extension, if there was no `+`).
	pub fn object_name(&mut self, name: &str, mangle: bool) -> Result<String, FatalError> {
		if !mangle {
			return Ok(name.to_string());
		}
		if let Some(n) = self.objects.get(name) {
			return Ok(n.clone());
		}
		let (dir, file) = match name.rfind('/') {
			Some(i) => name.split_at(i + 1),
			None => ("", name),
		};
		let candidate = |n: u32| -> String {
			if n == 0 {
				format!("{}{}", dir, file.replace('+', "_p_"))
			} else if file.contains('+') {
				format!("{}{}", dir, file.replace('+', &format!("_p{}_", n)))
			} else {
				match file.rfind('.') {
					Some(i) if i > 0 => format!("{}{}_{}{}", dir, &file[..i], n, &file[i..]),
					_ => format!("{}{}_{}", dir, file, n),
				}
			}
		};
		let unique = pick(self.attempts, &self.used_objects, candidate).ok_or_else(|| {
			FatalError::NamesExhausted {
				name: name.to_string(),
				attempts: self.attempts,
			}
		})?;
		self.used_objects.insert(unique.clone());
		self.objects.insert(name.to_string(), unique.clone());
		Ok(unique)
	}

	/// A make variable name for `base` followed by `suffix`.
	///
	/// Characters that can't be in a variable name become `_`. With a length
	/// `limit`, long names are shortened and numbered.
	pub fn make_variable(
		&mut self,
		base: &str,
		suffix: &str,
		limit: Option<usize>,
	) -> Result<String, FatalError> {
		let key = format!("{}{}", base, suffix);
		if let Some(v) = self.variables.get(&key) {
			return Ok(v.clone());
		}
		let clean: String = base
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
			.collect();
		let fits = limit.map_or(true, |limit| clean.len() + suffix.len() <= limit);
		let unique = if fits {
			pick(self.attempts, &self.used_variables, |n| {
				if n == 0 {
					format!("{}{}", clean, suffix)
				} else {
					format!("{}_{}{}", clean, n, suffix)
				}
			})
		} else {
			let limit = limit.unwrap_or(0);
			let keep = limit.saturating_sub(suffix.len() + 4);
			let prefix = &clean[..keep.min(clean.len())];
			pick(self.attempts, &self.used_variables, |n| {
				format!("{}{:04}{}", prefix, n, suffix)
			})
		};
		let unique = unique.ok_or_else(|| FatalError::NamesExhausted {
			name: key.clone(),
			attempts: self.attempts,
		})?;
		self.used_variables.insert(unique.clone());
		self.variables.insert(key, unique.clone());
		Ok(unique)
	}
}

fn pick(attempts: u32, used: &HashSet<String>, candidate: impl Fn(u32) -> String) -> Option<String> {
	(0..attempts).map(candidate).find(|c| !used.contains(c))
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn object_names() {
		let mut names = UniqueNames::new(1000);
		assert_eq!(names.object_name("t.dir/a++.o", false).unwrap(), "t.dir/a++.o");
		assert_eq!(names.object_name("t.dir/a++.o", true).unwrap(), "t.dir/a_p__p_.o");
		assert_eq!(names.object_name("t.dir/a++.o", true).unwrap(), "t.dir/a_p__p_.o");
		assert_eq!(names.object_name("t.dir/a_p__p_.o", true).unwrap(), "t.dir/a_p__p__1.o");
		assert_eq!(names.object_name("x+/b+.o", true).unwrap(), "x+/b_p_.o");
	}

	#[test]
	fn probing_on_collision() {
		let mut names = UniqueNames::new(1000);
		assert_eq!(names.object_name("a_p_.o", true).unwrap(), "a_p_.o");
		assert_eq!(names.object_name("a+.o", true).unwrap(), "a_p1_.o");
	}

	#[test]
	fn retry_cap_is_fatal() {
		let mut names = UniqueNames::new(2);
		names.object_name("a_p_.o", true).unwrap();
		names.object_name("a_p1_.o", true).unwrap();
		match names.object_name("a+.o", true) {
			Err(FatalError::NamesExhausted { name, attempts }) => {
				assert_eq!(name, "a+.o");
				assert_eq!(attempts, 2);
			}
			r => panic!("{:?}", r),
		}
	}

	#[test]
	fn variables() {
		let mut names = UniqueNames::new(1000);
		assert_eq!(names.make_variable("my-app", "_OBJECTS", None).unwrap(), "my_app_OBJECTS");
		assert_eq!(names.make_variable("my.app", "_OBJECTS", None).unwrap(), "my_app_1_OBJECTS");
		assert_eq!(names.make_variable("my-app", "_OBJECTS", None).unwrap(), "my_app_OBJECTS");
		let long = "a_very_long_target_name_indeed";
		let v1 = names.make_variable(long, "_OBJECTS", Some(32)).unwrap();
		let v2 = names.make_variable("a_very_long_target_name_indeed2", "_OBJECTS", Some(32)).unwrap();
		assert_eq!(v1, "a_very_long_target_n0000_OBJECTS");
		assert_eq!(v2, "a_very_long_target_n0001_OBJECTS");
		assert_eq!(names.make_variable(long, "_OBJECTS", Some(32)).unwrap(), v1);
	}
}
