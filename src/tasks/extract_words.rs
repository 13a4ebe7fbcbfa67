use crate::core::describe::{Fields, Model, Parameters};
use crate::core::error::WorkError;
use crate::core::task::{Returned, WorkLogic};
use crate::describe_model;
use crate::tasks::TaskError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSearch {
    /// Matched case-insensitively, anywhere inside a word.
    pub word: String,
    pub search_directory: PathBuf,
}

impl Model for WordSearch {
    fn fields(fields: Fields) -> Fields {
        fields
            .required::<String>("word")
            .required::<PathBuf>("search_directory")
    }
}

describe_model!(WordSearch);

#[derive(Debug, Deserialize)]
pub struct ExtractWordsParams {
    pub data: WordSearch,
}

impl Parameters for ExtractWordsParams {
    fn declare(params: Fields) -> Fields {
        params.required::<WordSearch>("data")
    }
}

/// Collects every distinct word containing a given word, across all text
/// files under a directory.
///
/// A word is a run of letters, digits, `_` and inner `-`. Files that are not
/// UTF-8 are skipped and symlinks are not followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractWords;

impl WorkLogic for ExtractWords {
    type Params = ExtractWordsParams;
    type Output = BTreeSet<String>;

    fn name(&self) -> &str {
        "extract-words"
    }

    fn run(&self, params: ExtractWordsParams) -> Result<Returned<Self::Output>, WorkError> {
        let search = params.data;
        log::info!(
            "Extracting words containing '{}' under {}",
            search.word,
            search.search_directory.display()
        );

        let needle = search.word.to_lowercase();
        let mut found = BTreeSet::new();
        scan(&search.search_directory, &needle, &mut found)?;
        log::info!("Found {} distinct word(s)", found.len());
        Ok(found.into())
    }
}

fn scan(path: &Path, needle: &str, found: &mut BTreeSet<String>) -> Result<(), TaskError> {
    for entry in fs::read_dir(path).map_err(TaskError::io(path))? {
        let entry = entry.map_err(TaskError::io(path))?;
        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(TaskError::io(&entry_path))?;
        if file_type.is_dir() {
            scan(&entry_path, needle, found)?;
        } else if file_type.is_file() {
            match fs::read_to_string(&entry_path) {
                Ok(text) => found.extend(matching_words(&text, needle)),
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    log::debug!("Skipping non UTF-8 file {}", entry_path.display());
                }
                Err(e) => return Err(TaskError::io(&entry_path)(e)),
            }
        }
    }
    Ok(())
}

/// Words of `text` whose lowercase form contains `needle`.
fn matching_words<'a>(text: &'a str, needle: &'a str) -> impl Iterator<Item = String> + 'a {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .map(|word| word.trim_matches('-'))
        .filter(move |word| !word.is_empty() && word.to_lowercase().contains(needle))
        .map(str::to_string)
}
