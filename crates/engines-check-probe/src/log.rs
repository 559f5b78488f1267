//! Debug log of probe executions.
//!
//! The log is a side artifact: wrapping a runner never changes what it returns.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use engines_check_types::EnginesError;

use crate::{CmdOutput, CommandRunner};

pub const LOG_HEADER: &str = "# engines-check probe debug log";

/// Longest stdout/stderr excerpt kept per probe.
const EXCERPT_CHARS: usize = 200;

/// Line sink for the debug log.
pub trait DebugLogWriter: Send + Sync {
    fn write_line(&self, line: &str);
    fn flush(&self);
}

/// Debug log backed by a file, created (with parents) up front.
pub struct FileLogWriter {
    file: Mutex<File>,
}

impl FileLogWriter {
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            file: Mutex::new(File::create(path)?),
        })
    }
}

impl DebugLogWriter for FileLogWriter {
    fn write_line(&self, line: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

// Lets tests keep ownership of the writer they inspect.
impl<W: DebugLogWriter> DebugLogWriter for &W {
    fn write_line(&self, line: &str) {
        (*self).write_line(line)
    }

    fn flush(&self) {
        (*self).flush()
    }
}

/// [`CommandRunner`] decorator that records every probe it forwards.
pub struct LoggingCommandRunner<R: CommandRunner, W: DebugLogWriter> {
    inner: R,
    writer: W,
}

impl<R: CommandRunner, W: DebugLogWriter> LoggingCommandRunner<R, W> {
    /// Wrap `inner`, writing the log header immediately.
    pub fn new(inner: R, writer: W) -> Self {
        writer.write_line(LOG_HEADER);
        writer.write_line(&format!("# started: {}", now()));
        writer.write_line("");
        Self { inner, writer }
    }

    fn record(&self, cwd: &Path, argv: &[String], result: &Result<CmdOutput, EnginesError>) {
        let mut entry = vec![
            format!("[{}] EXEC: {}", now(), argv.join(" ")),
            format!("  cwd: {}", cwd.display()),
        ];

        match result {
            Ok(out) => {
                entry.push(format!("  exit: {:?}", out.exit));
                for (label, stream) in [("stdout", &out.stdout), ("stderr", &out.stderr)] {
                    let excerpt = excerpt(stream, EXCERPT_CHARS);
                    if !excerpt.is_empty() {
                        entry.push(format!("  {}: {}", label, excerpt));
                    }
                }
            }
            Err(err) => entry.push(format!("  error: {}", err)),
        }
        entry.push(String::new());

        for line in &entry {
            self.writer.write_line(line);
        }
        self.writer.flush();
    }
}

impl<R: CommandRunner, W: DebugLogWriter> CommandRunner for LoggingCommandRunner<R, W> {
    fn run(&self, cwd: &Path, argv: &[String]) -> Result<CmdOutput, EnginesError> {
        let result = self.inner.run(cwd, argv);
        self.record(cwd, argv, &result);
        result
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Single-line, length-capped view of process output.
fn excerpt(s: &str, max_chars: usize) -> String {
    let flat: String = s.chars().map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c }).collect();
    let flat = flat.trim();
    if flat.chars().count() <= max_chars {
        return flat.to_string();
    }
    let head: String = flat.chars().take(max_chars).collect();
    format!("{}...", head)
}
