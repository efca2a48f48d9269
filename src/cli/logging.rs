use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::writer::MakeWriter;

/// Output of a program run: every log line goes to stdout and, with `--log`, is appended
/// to a run log shared by successive runs.
#[derive(Clone, Default)]
pub struct RunLog {
    file: Option<Arc<Mutex<File>>>,
}

impl RunLog {
    /// Stdout only.
    #[must_use]
    pub fn stdout() -> Self {
        Self::default()
    }

    /// Append to `path` (created if missing), starting with a `header` line that separates
    /// this run from earlier ones.
    ///
    /// # Errors
    /// Returns the I/O error if `path` cannot be opened or written.
    pub fn append(path: &Path, header: &str) -> io::Result<Self> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "=== {header} ===")?;
        Ok(Self {
            file: Some(Arc::new(Mutex::new(file))),
        })
    }
}

/// One log event being written.
pub struct RunLogLine {
    file: Option<Arc<Mutex<File>>>,
}

impl<'a> MakeWriter<'a> for RunLog {
    type Writer = RunLogLine;

    fn make_writer(&'a self) -> Self::Writer {
        RunLogLine {
            file: self.file.clone(),
        }
    }
}

fn lock(file: &Mutex<File>) -> io::Result<MutexGuard<'_, File>> {
    file.lock()
        .map_err(|_| io::Error::other("run log lock poisoned"))
}

impl Write for RunLogLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().lock().write_all(buf)?;
        if let Some(file) = &self.file {
            lock(file)?.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        if let Some(file) = &self.file {
            lock(file)?.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_line(log: &RunLog, line: &str) {
        let mut writer = log.make_writer();
        writer.write_all(line.as_bytes()).unwrap();
        writer.flush().unwrap();
    }

    #[test]
    fn runs_append_under_their_own_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let first = RunLog::append(&path, "orm-demo sqlite").unwrap();
        log_line(&first, "Products: [foo:Foo]\n");
        drop(first);
        let second = RunLog::append(&path, "builder-demo sqlite").unwrap();
        log_line(&second, "Specs: [fspec:1]\n");

        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "=== orm-demo sqlite ===\nProducts: [foo:Foo]\n\
             === builder-demo sqlite ===\nSpecs: [fspec:1]\n"
        );
    }
}
