use crate::core::describe::{Fields, Model, Parameters};
use crate::core::error::WorkError;
use crate::core::task::{Returned, WorkLogic};
use crate::describe_model;
use crate::tasks::TaskError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanSpec {
    pub directory: PathBuf,
    /// Entry names (files or directories) that survive the clean.
    pub keep: Vec<String>,
}

impl Model for CleanSpec {
    fn fields(fields: Fields) -> Fields {
        fields
            .required::<PathBuf>("directory")
            .with_default("keep", Vec::<String>::new())
    }
}

describe_model!(CleanSpec);

#[derive(Debug, Deserialize)]
pub struct CleanDirectoryParams {
    pub data: CleanSpec,
}

impl Parameters for CleanDirectoryParams {
    fn declare(params: Fields) -> Fields {
        params.required::<CleanSpec>("data")
    }
}

/// Empties a directory, leaving the directory itself and any kept entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanDirectory;

impl WorkLogic for CleanDirectory {
    type Params = CleanDirectoryParams;
    type Output = ();

    fn name(&self) -> &str {
        "clean_directory"
    }

    fn run(&self, params: CleanDirectoryParams) -> Result<Returned<()>, WorkError> {
        let spec = params.data;
        log::info!("Clean Directory: {}", spec.directory.display());

        for entry in fs::read_dir(&spec.directory).map_err(TaskError::io(&spec.directory))? {
            let entry = entry.map_err(TaskError::io(&spec.directory))?;
            let name = entry.file_name();
            if spec.keep.iter().any(|kept| name.as_os_str() == kept.as_str()) {
                continue;
            }

            let path = entry.path();
            // Links are removed themselves, never their targets.
            let file_type = entry.file_type().map_err(TaskError::io(&path))?;
            if file_type.is_dir() {
                fs::remove_dir_all(&path).map_err(TaskError::io(&path))?;
            } else {
                fs::remove_file(&path).map_err(TaskError::io(&path))?;
            }
        }
        Ok(().into())
    }
}
