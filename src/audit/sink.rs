//! Audit log sinks.
//!
//! Every sink owns its writer behind a mutex and writes each record with a
//! single `write_all`, so concurrent callers never interleave partial lines.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::{Color, Colorize};
use parking_lot::Mutex;

/// Sink identity, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    ConsoleMirror,
    DataFile,
    StatusFile,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::ConsoleMirror => "console mirror",
            SinkKind::DataFile => "data",
            SinkKind::StatusFile => "status",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line-oriented, append-only log destination.
pub struct LogSink {
    kind: SinkKind,
    path: Option<PathBuf>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
}

impl LogSink {
    /// Open (or create) `path` for appending.
    pub fn open(kind: SinkKind, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            kind,
            path: Some(path.to_path_buf()),
            writer: Mutex::new(Some(Box::new(file))),
        })
    }

    /// Wrap an arbitrary writer.
    pub fn from_writer(kind: SinkKind, writer: impl Write + Send + 'static) -> Self {
        Self {
            kind,
            path: None,
            writer: Mutex::new(Some(Box::new(writer))),
        }
    }

    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    /// Append one complete line. `line` must already end with a newline.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink is closed"))?;
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    /// Flush and release the writer. Later writes fail with `BrokenPipe`.
    pub fn close(&self) -> io::Result<()> {
        match self.writer.lock().take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.lock().is_none()
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Console output with an optional uncolored mirror file.
#[derive(Debug)]
pub struct ConsoleSink {
    out: LogSink,
    mirror: Option<LogSink>,
    colors: bool,
}

impl ConsoleSink {
    pub fn stdout(colors: bool) -> Self {
        Self::new(LogSink::from_writer(SinkKind::Console, io::stdout()), colors)
    }

    pub fn new(out: LogSink, colors: bool) -> Self {
        Self {
            out,
            mirror: None,
            colors,
        }
    }

    pub fn with_mirror(mut self, mirror: LogSink) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Write `[time] [code] message` to the console and the mirror.
    ///
    /// The mirror is attempted even if the console write fails; the first
    /// error is returned together with the sink that produced it.
    pub fn write(&self, time: &str, code: char, message: &str) -> Result<(), (SinkKind, io::Error)> {
        let plain = format!("{} [{}] {}\n", time, code, single_line(message));

        let console_result = if self.colors {
            let colored = format!("{}\n", plain.trim_end().color(code_color(code)));
            self.out.write_line(&colored)
        } else {
            self.out.write_line(&plain)
        };

        let mirror_result = match &self.mirror {
            Some(mirror) => mirror.write_line(&plain),
            None => Ok(()),
        };

        console_result.map_err(|e| (self.out.kind(), e))?;
        mirror_result.map_err(|e| (SinkKind::ConsoleMirror, e))
    }

    pub fn close(&self) -> io::Result<()> {
        let out = self.out.close();
        if let Some(mirror) = &self.mirror {
            mirror.close()?;
        }
        out
    }
}

fn single_line(message: &str) -> std::borrow::Cow<'_, str> {
    if message.contains(['\r', '\n']) {
        std::borrow::Cow::Owned(super::record::single_line(message))
    } else {
        std::borrow::Cow::Borrowed(message)
    }
}

fn code_color(code: char) -> Color {
    match code {
        'I' => Color::Cyan,
        'C' => Color::Blue,
        'X' | 'E' => Color::Red,
        'L' => Color::Green,
        'D' => Color::Yellow,
        'S' | 'U' => Color::Magenta,
        _ => Color::White,
    }
}

/// A cloneable in-memory writer, for capturing sink output.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuffer(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents so far, as text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    /// A writer that always fails.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.csv");
        std::fs::write(&path, "existing\n").unwrap();

        let sink = LogSink::open(SinkKind::StatusFile, &path).unwrap();
        sink.write_line("\"a\",\"b\",\"c\"\n").unwrap();
        sink.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "existing\n\"a\",\"b\",\"c\"\n");
    }

    #[test]
    fn test_write_after_close_fails() {
        let sink = LogSink::from_writer(SinkKind::DataFile, SharedBuffer::new());
        sink.close().unwrap();
        assert!(sink.is_closed());
        let err = sink.write_line("late\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        // Closing twice is harmless.
        sink.close().unwrap();
    }

    #[test]
    fn test_concurrent_lines_do_not_interleave() {
        let buffer = SharedBuffer::new();
        let sink = Arc::new(LogSink::from_writer(SinkKind::DataFile, buffer.clone()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..200 {
                        let line = format!("{}:{}:{}\n", t, i, "x".repeat(64));
                        sink.write_line(&line).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = buffer.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8 * 200);
        for line in lines {
            let parts: Vec<&str> = line.split(':').collect();
            assert_eq!(parts.len(), 3);
            assert_eq!(parts[2].len(), 64);
        }
    }

    #[test]
    fn test_console_mirror_is_uncolored() {
        let console = SharedBuffer::new();
        let mirror = SharedBuffer::new();
        let sink = ConsoleSink::new(LogSink::from_writer(SinkKind::Console, console.clone()), true)
            .with_mirror(LogSink::from_writer(SinkKind::ConsoleMirror, mirror.clone()));

        sink.write("12:00:00", 'M', "Message: a,\nb").unwrap();
        assert_eq!(mirror.contents(), "12:00:00 [M] Message: a, b\n");
        assert!(console.contents().contains("[M] Message: a, b"));
    }

    #[test]
    fn test_console_failure_still_mirrors() {
        let mirror = SharedBuffer::new();
        let sink = ConsoleSink::new(LogSink::from_writer(SinkKind::Console, Broken), false)
            .with_mirror(LogSink::from_writer(SinkKind::ConsoleMirror, mirror.clone()));

        let (kind, _) = sink.write("t", 'I', "hello").unwrap_err();
        assert_eq!(kind, SinkKind::Console);
        assert_eq!(mirror.contents(), "t [I] hello\n");
    }
}
