use crate::core::RawConfig;
use crate::core::compact::CompactSchema;
use crate::core::error::{ExecuteError, SchemaDerivationError};
use crate::core::task::{Task, WorkLogic};

/// A flow is a Task that can be registered in an App and exposed on the CLI.
/// The NewType keeps plain Tasks out of the registry.
pub struct Flow<L: WorkLogic>(Task<L>);

/// The Derefs give access to the inner `Task` (`execute`, `call`, ...).
impl<L: WorkLogic> std::ops::Deref for Flow<L> {
    type Target = Task<L>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<L: WorkLogic> Flow<L> {
    pub fn new(logic: L) -> Result<Self, SchemaDerivationError> {
        Task::new(logic).map(Flow)
    }

    pub fn into_task(self) -> Task<L> {
        self.0
    }
}

impl<L: WorkLogic> From<Task<L>> for Flow<L> {
    fn from(task: Task<L>) -> Self {
        Flow(task)
    }
}

/// The type-erased view of a flow that the App dispatches to.
pub trait Dispatch: Send + Sync {
    fn name(&self) -> &str;

    fn compact_schema(&self) -> &CompactSchema;

    /// Executes the flow, discarding its (validated) result.
    fn dispatch(&self, raw: &RawConfig) -> Result<(), ExecuteError>;
}

impl<L: WorkLogic> Dispatch for Flow<L> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn compact_schema(&self) -> &CompactSchema {
        self.0.compact_schema()
    }

    fn dispatch(&self, raw: &RawConfig) -> Result<(), ExecuteError> {
        self.0.execute(raw).map(|_| ())
    }
}
