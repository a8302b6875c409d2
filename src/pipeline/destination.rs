use crate::error::PipelineError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Where a finished document is written.
pub enum Destination<'w> {
    /// A file, created (or truncated) when the build starts writing.
    Path(PathBuf),
    /// An already-open sink owned by the caller; it is flushed but not closed.
    Writer(&'w mut dyn Write),
}

impl<'w> Destination<'w> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Destination::Path(path.into())
    }

    pub fn writer(writer: &'w mut dyn Write) -> Self {
        Destination::Writer(writer)
    }

    pub(crate) fn open(self) -> Result<Sink<'w>, PipelineError> {
        match self {
            Destination::Path(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = File::create(&path).map_err(|e| {
                    std::io::Error::new(
                        e.kind(),
                        format!("Failed to create output file '{}': {}", path.display(), e),
                    )
                })?;
                Ok(Sink::File(BufWriter::new(file)))
            }
            Destination::Writer(writer) => Ok(Sink::Borrowed(writer)),
        }
    }
}

impl std::fmt::Debug for Destination<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Destination::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// An opened destination.
pub(crate) enum Sink<'w> {
    File(BufWriter<File>),
    Borrowed(&'w mut dyn Write),
}

impl Write for Sink<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::File(file) => file.write(buf),
            Sink::Borrowed(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::File(file) => file.flush(),
            Sink::Borrowed(writer) => writer.flush(),
        }
    }
}
