/// Logger that writes through env_logger to stderr and appends every
/// accepted record to `<data_dir>/logs/backend.log`.
use env_logger::Logger;
use log::{Log, Metadata, Record, SetLoggerError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct LogEntry {
    timestamp: String,
    level: String,
    target: String,
    message: String,
}

struct BackendLogFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl BackendLogFile {
    fn new(data_dir: &Path) -> Self {
        let path = data_dir.join("logs").join("backend.log");
        let file = match Self::open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("[reelboard.log] Cannot open {}: {}", path.display(), e);
                None
            }
        };
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append_entry(&self, entry: &LogEntry) {
        let mut guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            match Self::open(&self.path) {
                Ok(file) => *guard = Some(file),
                Err(_) => return,
            }
        }
        if let Some(file) = guard.as_mut() {
            let mut line = format_log_line(entry);
            line.push('\n');
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }
}

fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "{} [{}] [{}] {}",
        entry.timestamp,
        entry.level.to_uppercase(),
        entry.target,
        entry.message.replace('\n', "\\n")
    )
}

struct TeeLogger {
    inner: Logger,
    file: BackendLogFile,
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);
        self.file.append_entry(&LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level: record.level().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the logger. `RUST_LOG` overrides the default `info` filter.
pub fn init(data_dir: &Path) -> Result<PathBuf, SetLoggerError> {
    let inner = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .build();
    let max_level = inner.filter();
    let file = BackendLogFile::new(data_dir);
    let path = file.path.clone();
    let logger = Box::leak(Box::new(TeeLogger { inner, file }));
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(path)
}
