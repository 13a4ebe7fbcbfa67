//! A flow that publishes a directory: the target is cleaned, the source is
//! copied over it, and a JSON manifest in the target is pretty-printed.
//!
//! This demo shows:
//! - Declaring a structured config for a flow
//! - Composing the built-in tasks inside a flow
//! - Running the flow through the generated command line
//!
//! Try:
//! ```text
//! RUST_LOG=debug cargo run --example publish_flow -- --help
//! cargo run --example publish_flow -- config.source=site config.target=/tmp/site
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use typeflow::prelude::*;
use typeflow::tasks::clean_directory::CleanDirectoryParams;
use typeflow::tasks::copy_directory::CopyDirectoryParams;
use typeflow::tasks::json_formatter::JsonFormatterParams;
use typeflow::tasks::{CleanDirectory, CleanSpec, CopyDirectory, CopySpec, JsonFormatter};

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PublishConfig {
    source: PathBuf,
    target: PathBuf,
    exclude: Vec<String>,
    manifest: Option<String>,
}

impl Model for PublishConfig {
    fn fields(fields: Fields) -> Fields {
        fields
            .required::<PathBuf>("source")
            .required::<PathBuf>("target")
            .with_default("exclude", vec![".git".to_string()])
            .with_default("manifest", Some("manifest.json".to_string()))
    }
}

typeflow::describe_model!(PublishConfig);

#[derive(Deserialize)]
struct PublishParams {
    config: PublishConfig,
}

impl Parameters for PublishParams {
    fn declare(params: Fields) -> Fields {
        params.required::<PublishConfig>("config")
    }
}

// ============================================================================
// Flow
// ============================================================================

struct Publish {
    clean: Task<CleanDirectory>,
    copy: Task<CopyDirectory>,
    format: Task<JsonFormatter>,
}

impl WorkLogic for Publish {
    type Params = PublishParams;
    type Output = ();

    fn name(&self) -> &str {
        "publish"
    }

    fn run(&self, params: PublishParams) -> Result<Returned<()>, WorkError> {
        let config = params.config;
        std::fs::create_dir_all(&config.target)?;

        self.clean.call(CleanDirectoryParams {
            data: CleanSpec {
                directory: config.target.clone(),
                keep: Vec::new(),
            },
        })?;

        self.copy.call(CopyDirectoryParams {
            data: CopySpec {
                src_directory: config.source,
                dest_directory: config.target.clone(),
                exclude: config.exclude,
            },
        })?;

        if let Some(manifest) = config.manifest {
            let path = config.target.join(manifest);
            if path.exists() {
                self.format.call(JsonFormatterParams {
                    input_file_path: path,
                    output_file_path: None,
                })?;
            }
        }

        Ok(().into())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let publish = Publish {
        clean: Task::new(CleanDirectory)?,
        copy: Task::new(CopyDirectory)?,
        format: Task::new(JsonFormatter)?,
    };

    let mut app = App::new("publisher");
    app.register(Flow::new(publish)?)?;
    std::process::exit(app.main());
}
