use crate::core::ConfigValue;
use crate::core::describe::{Fields, Parameters};
use crate::core::error::WorkError;
use crate::core::task::{Returned, WorkLogic};
use crate::tasks::TaskError;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct JsonFormatterParams {
    pub input_file_path: PathBuf,
    pub output_file_path: Option<PathBuf>,
}

impl Parameters for JsonFormatterParams {
    fn declare(params: Fields) -> Fields {
        params
            .required::<PathBuf>("input_file_path")
            .with_default("output_file_path", None::<PathBuf>)
    }
}

/// Pretty-prints a JSON file, in place unless an output path is given.
///
/// Object keys come out sorted.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl WorkLogic for JsonFormatter {
    type Params = JsonFormatterParams;
    type Output = ();

    fn name(&self) -> &str {
        "json-formatter"
    }

    fn run(&self, params: JsonFormatterParams) -> Result<Returned<()>, WorkError> {
        let input = &params.input_file_path;
        let content = fs::read_to_string(input).map_err(TaskError::io(input))?;
        let document: ConfigValue =
            serde_json::from_str(&content).map_err(|source| TaskError::Json {
                path: input.clone(),
                source,
            })?;

        let mut pretty = serde_json::to_string_pretty(&document).map_err(|source| TaskError::Json {
            path: input.clone(),
            source,
        })?;
        pretty.push('\n');

        let output = params.output_file_path.as_ref().unwrap_or(input);
        fs::write(output, pretty).map_err(TaskError::io(output))?;

        if output == input {
            log::info!("JSON file [{}] is formatted inline successfully.", input.display());
        } else {
            log::info!(
                "JSON file [{}] is formatted successfully and output is written to: {}",
                input.display(),
                output.display()
            );
        }
        Ok(().into())
    }
}
