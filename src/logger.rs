use log::{Level, Metadata, Record};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Logger;

static ERRORS: AtomicUsize = AtomicUsize::new(0);

/// The number of errors logged so far.
pub fn n_errors() -> usize {
	ERRORS.load(Ordering::Relaxed)
}

impl log::Log for Logger {
	fn enabled(&self, _: &Metadata) -> bool {
		true
	}

	fn log(&self, record: &Record) {
		if record.level() == Level::Error {
			ERRORS.fetch_add(1, Ordering::Relaxed);
		}
		eprintln!(
			"[{}] {}: {}",
			record.level(),
			record.target(),
			record.args()
		);
	}

	fn flush(&self) {}
}
