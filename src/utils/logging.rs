use chrono::Local;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A log entry with timestamp and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S.%3f").to_string(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message,
        }
    }

    /// Parse one line of compact fmt output: "LEVEL target: message"
    pub fn parse_compact(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (level, rest) = [
            Level::TRACE,
            Level::DEBUG,
            Level::INFO,
            Level::WARN,
            Level::ERROR,
        ]
        .into_iter()
        .find_map(|level| {
            let prefix = level.as_str();
            line.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(' '))
                .map(|rest| (level, rest.trim_start()))
        })
        .unwrap_or((Level::INFO, line));

        // A target never contains spaces
        let (target, message) = match rest.split_once(": ") {
            Some((target, message)) if !target.contains(' ') => (target, message.trim()),
            _ => ("general", rest),
        };

        Some(Self::new(level, target, message.to_string()))
    }

    pub fn format_for_display(&self) -> String {
        format!(
            "[{}] {} [{}] {}",
            self.timestamp, self.level, self.target, self.message
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Thread-safe ring buffer for log entries
#[derive(Clone, Default)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogRingBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = lock(&self.entries);
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The newest `count` entries, oldest first
    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = lock(&self.entries);
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

/// Writer that feeds the ring buffer and, when enabled, a log file
#[derive(Clone)]
pub struct DualWriter {
    buffer: LogRingBuffer,
    file: Option<Arc<Mutex<File>>>,
}

impl DualWriter {
    pub fn new(buffer: LogRingBuffer, file: Option<File>) -> Self {
        Self {
            buffer,
            file: file.map(|f| Arc::new(Mutex::new(f))),
        }
    }
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = std::str::from_utf8(buf) {
            for line in text.lines() {
                if let Some(entry) = LogEntry::parse_compact(line) {
                    if let Some(file) = &self.file {
                        let _ = writeln!(lock(file), "{}", entry.format_for_display());
                    }
                    self.buffer.push(entry);
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.file {
            Some(file) => lock(file).flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for DualWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Global log buffer accessible throughout the application
static LOG_BUFFER: OnceLock<LogRingBuffer> = OnceLock::new();

/// Get the global log buffer
pub fn get_log_buffer() -> Option<LogRingBuffer> {
    LOG_BUFFER.get().cloned()
}

/// Open a timestamped log file in `dir`
fn open_log_file(dir: &Path) -> std::io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("job-tracker_{}.log", timestamp));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Install the tracing subscriber. `RUST_LOG` wins over `default_level`.
/// Returns the log file path when one was opened.
pub fn init_logging(default_level: &str, log_dir: Option<&Path>) -> Option<PathBuf> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let buffer = LOG_BUFFER.get_or_init(LogRingBuffer::new).clone();

    let (file, log_path) = match log_dir.map(open_log_file) {
        Some(Ok((file, path))) => (Some(file), Some(path)),
        Some(Err(e)) => {
            eprintln!("Could not open log file: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    let fmt_layer = fmt::layer()
        .with_writer(DualWriter::new(buffer, file))
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .without_time() // LogEntry adds its own timestamp
        .compact();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        return log_path;
    }

    tracing::info!(target: "system", "Logging initialized at level {}", default_level);
    log_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_line() {
        let entry = LogEntry::parse_compact(
            " INFO job_tracker::data::csv_codec: Load complete: 3 rows, 3 columns",
        )
        .unwrap();
        assert_eq!(entry.level, "INFO");
        assert_eq!(entry.target, "job_tracker::data::csv_codec");
        assert_eq!(entry.message, "Load complete: 3 rows, 3 columns");
    }

    #[test]
    fn test_parse_line_without_target() {
        let entry = LogEntry::parse_compact("WARN update 'Acme': no records match").unwrap();
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.target, "general");
        assert_eq!(entry.message, "update 'Acme': no records match");

        assert!(LogEntry::parse_compact("   ").is_none());
    }

    #[test]
    fn test_ring_buffer_caps_entries() {
        let buffer = LogRingBuffer::new();
        for i in 0..(MAX_LOG_ENTRIES + 5) {
            buffer.push(LogEntry::new(Level::DEBUG, "test", format!("entry {}", i)));
        }
        assert_eq!(buffer.len(), MAX_LOG_ENTRIES);

        let recent = buffer.get_recent(2);
        assert_eq!(recent[0].message, format!("entry {}", MAX_LOG_ENTRIES + 3));
        assert_eq!(recent[1].message, format!("entry {}", MAX_LOG_ENTRIES + 4));
    }

    #[test]
    fn test_dual_writer_fills_buffer_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let (file, path) = open_log_file(dir.path()).unwrap();
        let buffer = LogRingBuffer::new();
        let mut writer = DualWriter::new(buffer.clone(), Some(file));

        writer
            .write_all(b"DEBUG job_tracker::data::data_store: insert: new record at #3\n")
            .unwrap();
        writer.flush().unwrap();

        assert_eq!(buffer.len(), 1);
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("DEBUG [job_tracker::data::data_store] insert: new record at #3"));
    }
}
