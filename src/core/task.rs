use crate::core::binder;
use crate::core::compact::CompactSchema;
use crate::core::describe::{Describe, Parameters};
use crate::core::error::{BindingError, ExecuteError, SchemaDerivationError, WorkError};
use crate::core::schema::{self, Signature};
use crate::core::validation;
use crate::core::{ConfigValue, RawConfig};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// What a unit of work hands back from [`WorkLogic::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Returned<T> {
    /// An already-correct instance of the declared output type.
    Value(T),
    /// A loosely-typed value to be reconciled with the declared output type.
    Fields(ConfigValue),
}

impl<T> From<T> for Returned<T> {
    fn from(value: T) -> Self {
        Returned::Value(value)
    }
}

/// Defines the behaviour of a unit of work (a Task or a Flow).
pub trait WorkLogic: Send + Sync + 'static {
    /// The declared parameter list.
    type Params: Parameters;
    /// The declared output; `()` when nothing is returned.
    type Output: Describe + DeserializeOwned;

    fn name(&self) -> &str;

    /// The single entry point, called with fully bound arguments.
    fn run(&self, params: Self::Params) -> Result<Returned<Self::Output>, WorkError>;
}

/// Lifecycle of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Binding,
    Invoking,
    Validating,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Phase::Binding => "binding",
            Phase::Invoking => "invoking",
            Phase::Validating => "validating",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(phase)
    }
}

/// An atomic unit of work: logic plus its cached signature.
pub struct Task<L: WorkLogic> {
    logic: L,
    signature: Arc<Signature>,
}

impl<L: WorkLogic> Task<L> {
    /// Wraps the logic, deriving its signature on the first use of `L`.
    ///
    /// A malformed signature fails here, before any invocation is possible.
    pub fn new(logic: L) -> Result<Self, SchemaDerivationError> {
        let signature = schema::signature_of::<L>()?;
        Ok(Self { logic, signature })
    }

    pub fn name(&self) -> &str {
        self.logic.name()
    }

    pub fn logic(&self) -> &L {
        &self.logic
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn compact_schema(&self) -> &CompactSchema {
        &self.signature.compact
    }

    /// Binds `raw`, invokes the logic, and validates what it returns.
    pub fn execute(&self, raw: &RawConfig) -> Result<Option<L::Output>, ExecuteError> {
        let run_id = Uuid::new_v4();
        self.trace(run_id, Phase::Binding);

        let params = binder::bind(&self.signature.inputs, raw)
            .and_then(|bound| {
                L::Params::from_bound(bound).map_err(|e| BindingError::Decode {
                    unit: self.name().to_string(),
                    reason: e.to_string(),
                })
            })
            .inspect_err(|_| self.trace(run_id, Phase::Failed))?;

        self.invoke(run_id, params)
    }

    /// Invokes the logic with already-typed parameters, skipping binding.
    pub fn call(&self, params: L::Params) -> Result<Option<L::Output>, ExecuteError> {
        self.invoke(Uuid::new_v4(), params)
    }

    fn invoke(&self, run_id: Uuid, params: L::Params) -> Result<Option<L::Output>, ExecuteError> {
        self.trace(run_id, Phase::Invoking);
        let returned = self.logic.run(params).map_err(|source| {
            self.trace(run_id, Phase::Failed);
            ExecuteError::Work {
                unit: self.name().to_string(),
                source,
            }
        })?;

        self.trace(run_id, Phase::Validating);
        let output = validation::validate(&self.signature.output, returned)
            .inspect_err(|_| self.trace(run_id, Phase::Failed))?;

        self.trace(run_id, Phase::Done);
        Ok(output)
    }

    fn trace(&self, run_id: Uuid, phase: Phase) {
        log::debug!("[{run_id}] {}: {phase}", self.name());
    }
}

impl<L: WorkLogic + Clone> Clone for Task<L> {
    fn clone(&self) -> Self {
        Self {
            logic: self.logic.clone(),
            signature: Arc::clone(&self.signature),
        }
    }
}
