//! Output destinations.
//!
//! `-` selects standard output; any other value names a file that is created
//! (or truncated). Both are buffered. Rust's standard output performs no
//! newline translation, so frame bytes reach a pipe unchanged on every
//! platform.

use std::{
    fs::File,
    io::{BufWriter, Stdout, Write, stdout},
    path::{Path, PathBuf},
};

use crate::error::Avs2YuvError;

/// Buffer size for output writes; large enough to hold a few HD planes' rows.
const OUTPUT_BUFFER_SIZE: usize = 1 << 20;

/// Where the stream goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// The process's standard output.
    Stdout,
    /// A file, created or truncated on open.
    File(PathBuf),
}

impl OutputTarget {
    /// Interpret a command-line output argument.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(arg))
        }
    }

    /// Open the destination for writing.
    ///
    /// # Errors
    ///
    /// Returns [`Avs2YuvError::OutputOpen`] if the file cannot be created.
    pub fn open(&self) -> Result<Output, Avs2YuvError> {
        match self {
            OutputTarget::Stdout => Ok(Output::Stdout(BufWriter::with_capacity(
                OUTPUT_BUFFER_SIZE,
                stdout(),
            ))),
            OutputTarget::File(path) => {
                let file = File::create(path).map_err(|error| Avs2YuvError::OutputOpen {
                    path: path.clone(),
                    reason: error.to_string(),
                })?;
                log::debug!("Writing to {}", path.display());
                Ok(Output::File(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file)))
            }
        }
    }

    /// The file path, if the target is a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path),
        }
    }
}

/// An opened, buffered destination.
#[derive(Debug)]
pub enum Output {
    /// Standard output.
    Stdout(BufWriter<Stdout>),
    /// A regular file.
    File(BufWriter<File>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File(writer) => writer.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdout() {
        assert_eq!(OutputTarget::from_arg("-"), OutputTarget::Stdout);
        assert_eq!(OutputTarget::Stdout.path(), None);
    }

    #[test]
    fn anything_else_is_a_file() {
        let target = OutputTarget::from_arg("out.y4m");
        assert_eq!(target, OutputTarget::File(PathBuf::from("out.y4m")));
        assert_eq!(target.path(), Some(Path::new("out.y4m")));
    }

    #[test]
    fn file_is_created_and_written() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let path = directory.path().join("out.y4m");

        let mut output = OutputTarget::File(path.clone()).open().unwrap();
        output.write_all(b"FRAME\n").unwrap();
        output.flush().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"FRAME\n");
    }

    #[test]
    fn unopenable_file_is_output_error() {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let path = directory.path().join("missing").join("out.y4m");

        let error = OutputTarget::File(path).open().unwrap_err();
        assert!(matches!(error, Avs2YuvError::OutputOpen { .. }));
        assert_eq!(error.exit_code(), 1);
    }
}
