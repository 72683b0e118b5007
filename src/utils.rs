use anyhow::Result;
use chrono::Local;
use std::io::{self, Write};
use std::sync::Mutex;

/// Formats byte count in human-readable form (e.g., "128.00 KB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Timestamped diagnostic log. Disabled unless `--verbose` is given.
pub struct Logger {
    sink: Option<Mutex<Box<dyn Write + Send>>>,
}

impl Logger {
    pub fn stderr() -> Self {
        Self::to_writer(Box::new(io::stderr()))
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Some(Mutex::new(writer)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let mut writer = sink
            .lock()
            .map_err(|_| anyhow::anyhow!("log sink poisoned"))?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(writer, "[{}] {}", timestamp, message)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Cloneable in-memory writer for capturing log output.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_logger() -> Result<()> {
        let buf = SharedBuf::default();
        let logger = Logger::to_writer(Box::new(buf.clone()));
        logger.log("Test message 1")?;
        logger.log("Test message 2")?;

        let content = buf.contents();
        assert!(content.contains("Test message 1"));
        assert!(content.contains("Test message 2"));
        assert!(content.starts_with('[')); // Timestamp check
        assert_eq!(content.lines().count(), 2);
        Ok(())
    }

    #[test]
    fn test_disabled_logger() -> Result<()> {
        let logger = Logger::disabled();
        assert!(!logger.is_enabled());
        logger.log("dropped")?;
        Ok(())
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1 << 17), "128.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 << 30), "3.00 GB");
    }
}
