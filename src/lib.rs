//! # Typeflow
//!
//! A small, strongly-typed task and flow orchestration framework. Units of
//! work declare their parameters and output; the framework derives a schema
//! from the declaration, binds loosely-typed configuration (YAML plus
//! `key.path=value` overrides) into typed arguments, and validates what the
//! work returns. Flows are registered in an [`App`], which generates the
//! command-line surface from their schemas.
//!
//! ## Features
//!
//! - **Declared signatures**: parameter lists and nested models are described once and checked before anything runs
//! - **Coercing binder**: strings from the command line become ints, paths, lists or whole models
//! - **Validated results**: loosely-shaped return values are reconciled with the declared output type
//! - **Generated CLI**: one sub-command per flow, with its configuration schema in the help text
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typeflow::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct SyncConfig {
//!     path: String,
//!     retries: i64,
//! }
//!
//! impl Model for SyncConfig {
//!     fn fields(fields: Fields) -> Fields {
//!         fields.required::<String>("path").with_default("retries", 3i64)
//!     }
//! }
//!
//! typeflow::describe_model!(SyncConfig);
//!
//! #[derive(Deserialize)]
//! struct SyncParams {
//!     config: SyncConfig,
//! }
//!
//! impl Parameters for SyncParams {
//!     fn declare(params: Fields) -> Fields {
//!         params.required::<SyncConfig>("config")
//!     }
//! }
//!
//! struct SyncFiles;
//!
//! impl WorkLogic for SyncFiles {
//!     type Params = SyncParams;
//!     type Output = ();
//!
//!     fn name(&self) -> &str {
//!         "sync"
//!     }
//!
//!     fn run(&self, params: SyncParams) -> Result<Returned<()>, WorkError> {
//!         println!("syncing {} ({} retries)", params.config.path, params.config.retries);
//!         Ok(().into())
//!     }
//! }
//!
//! let mut app = App::new("synctool");
//! app.register(Flow::new(SyncFiles).expect("valid signature")).expect("unique name");
//! std::process::exit(app.main());
//! ```
//!
//! ## Module Organization
//!
//! - [`app`]: flow registry, config loading and the generated CLI
//! - [`tasks`]: ready-made units of work (shell commands, directory copy/clean, word extraction, JSON formatting, translation)
//! - [`prelude`]: Commonly used types and traits (import with `use typeflow::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

pub mod app;
pub mod tasks;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Declarations
pub use crate::core::describe::{Describe, Element, Fields, Model, Parameters, Primitive, TypeClass};
pub use crate::core::schema::{ParamDescriptor, SchemaNode, Signature, derive, signature_of};
pub use crate::core::compact::{CompactEntry, CompactSchema, render};

// Execution
pub use crate::core::binder::{BoundArguments, bind};
pub use crate::core::flow::{Dispatch, Flow};
pub use crate::core::task::{Phase, Returned, Task, WorkLogic};
pub use crate::core::validation::validate;
pub use crate::core::{ConfigValue, RawConfig};

// Errors
pub use crate::core::error::{
    BindingError, ExecuteError, RegistrationError, ResultValidationError, SchemaDerivationError,
    WorkError,
};

// App
pub use app::App;
pub use app::config::{ConfigError, apply_override, load_yaml, merge, set_nested_value};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// Imports everything needed to declare units of work and run them.
///
/// # Example
/// ```rust
/// use typeflow::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // App
        App,
        BindingError,
        ConfigValue,
        // Declarations
        Describe,
        ExecuteError,
        Fields,
        Flow,
        Model,
        Parameters,
        RawConfig,
        Returned,
        // Execution
        Task,
        TypeClass,
        WorkError,
        WorkLogic,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
