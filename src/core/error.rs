use thiserror::Error;

/// An error raised by a unit of work's own logic. Never reclassified.
pub type WorkError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of work whose declared signature cannot be classified.
#[derive(Debug, Clone, Error)]
#[error("ERROR in function implementation of '{unit}': {}", .errors.join("; "))]
pub struct SchemaDerivationError {
    pub unit: String,
    pub errors: Vec<String>,
}

/// Raw configuration that cannot satisfy a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("Missing required parameter: '{name}'")]
    Missing { name: String },

    #[error("Parameter validation failed for '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("Bound arguments do not decode into the parameters of '{unit}': {reason}")]
    Decode { unit: String, reason: String },
}

/// A return value that cannot be reconciled with the declared output type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Result data validation failed: {reason}")]
pub struct ResultValidationError {
    pub reason: String,
}

/// Everything `execute` can fail with.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Validation(#[from] ResultValidationError),

    #[error("{unit} failed: {source}")]
    Work {
        unit: String,
        #[source]
        source: WorkError,
    },
}

impl ExecuteError {
    /// Binding and validation problems are user-input problems; the App
    /// reports them instead of propagating.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ExecuteError::Binding(_) | ExecuteError::Validation(_))
    }
}

/// Registering a flow into an App.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("A flow with the name '{name}' already exists.")]
    Duplicate { name: String },
}
