/// File persistence for log lines
///
/// One file per day under the logs directory; writes are buffered and
/// flushed on every line so a crash loses at most the current line.
use crate::paths;
use chrono::Local;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

static LOG_FILE: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

pub fn init_file_logging() {
    let dir = paths::get_logs_directory();
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }

    let path = dir.join(format!("meterlink_{}.log", Local::now().format("%Y-%m-%d")));
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            *LOG_FILE.lock() = Some(BufWriter::new(file));
        }
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
        }
    }
}

pub fn write_to_file(line: &str) {
    let mut guard = LOG_FILE.lock();
    if let Some(writer) = guard.as_mut() {
        if writeln!(writer, "{}", line).is_err() || writer.flush().is_err() {
            // Disk full or file removed; stop trying
            *guard = None;
        }
    }
}

pub fn flush_file_logging() {
    if let Some(writer) = LOG_FILE.lock().as_mut() {
        let _ = writer.flush();
    }
}
