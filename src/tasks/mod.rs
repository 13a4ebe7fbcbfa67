//! Ready-made units of work built on the typed core.

pub mod clean_directory;
pub mod copy_directory;
pub mod extract_words;
pub mod json_formatter;
pub mod run_command;
pub mod translate;

pub use clean_directory::{CleanDirectory, CleanSpec};
pub use copy_directory::{CopyDirectory, CopySpec};
pub use extract_words::{ExtractWords, WordSearch};
pub use json_formatter::JsonFormatter;
pub use run_command::{RunCommand, run_shell};
pub use translate::{FileCache, KvCache, MemoryCache, Translate, Translator};

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the reference tasks themselves.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("command '{command}' exited with status {code}: {output}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> TaskError {
        let path = path.into();
        move |source| TaskError::Io { path, source }
    }
}
