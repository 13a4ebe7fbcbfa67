//! The App: a registry of named flows and the dispatcher in front of them.

pub mod cli;
pub mod config;

use crate::core::error::{ExecuteError, RegistrationError};
use crate::core::flow::{Dispatch, Flow};
use crate::core::task::WorkLogic;
use crate::core::{ConfigValue, RawConfig};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Holds named flows and runs them by name.
///
/// Diagnostics for failed runs go to the error stream (stderr unless
/// replaced with [`App::with_error_stream`]).
pub struct App {
    name: String,
    flows: BTreeMap<String, Box<dyn Dispatch>>,
    error_stream: Mutex<Box<dyn Write + Send>>,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flows: BTreeMap::new(),
            error_stream: Mutex::new(Box::new(io::stderr())),
        }
    }

    /// Replaces the stream diagnostics are written to.
    pub fn with_error_stream(mut self, stream: impl Write + Send + 'static) -> Self {
        self.error_stream = Mutex::new(Box::new(stream));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `flow` under its own name. Names are unique; a duplicate
    /// leaves the registry unchanged.
    pub fn register<L: WorkLogic>(&mut self, flow: Flow<L>) -> Result<(), RegistrationError> {
        let name = Dispatch::name(&flow).to_string();
        if self.flows.contains_key(&name) {
            return Err(RegistrationError::Duplicate { name });
        }
        log::debug!("Registered flow '{name}' in {}", self.name);
        self.flows.insert(name, Box::new(flow));
        Ok(())
    }

    pub fn flow_names(&self) -> impl Iterator<Item = &str> {
        self.flows.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Dispatch> {
        self.flows.get(name).map(|flow| flow.as_ref())
    }

    /// Runs the flow called `flow_name` with `raw` and returns the exit status.
    ///
    /// An unknown flow, a binding failure or a result validation failure is
    /// reported on the error stream and yields `Ok(1)`. Errors raised by the
    /// flow's own logic are returned as they are.
    pub fn run(&self, flow_name: &str, raw: &RawConfig) -> Result<i32, ExecuteError> {
        let Some(flow) = self.get(flow_name) else {
            self.report(&format!("No flow found with the name '{flow_name}'."));
            return Ok(1);
        };

        log::info!(
            "Invoking flow:{flow_name} with args: {}",
            ConfigValue::Object(raw.clone())
        );
        match flow.dispatch(raw) {
            Ok(()) => Ok(0),
            Err(e) if e.is_input_error() => {
                self.report(&format!("Error in flow execution: {e}"));
                Ok(1)
            }
            Err(e) => Err(e),
        }
    }

    /// Command-line entry point over the process arguments.
    pub fn main(&self) -> i32 {
        self.main_from(std::env::args_os())
    }

    /// Command-line entry point over `args` (including the program name).
    pub fn main_from<I, T>(&self, args: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        if self.flows.is_empty() {
            self.report("ERROR: No flow registered");
            return 1;
        }

        let command = self.command();
        let invocation = match cli::parse(command, args) {
            Ok(invocation) => invocation,
            Err(e) => {
                // Help and version requests land here too, with status 0.
                if let Err(io_err) = e.print() {
                    log::warn!("Failed to print command-line message: {io_err}");
                }
                return e.exit_code();
            }
        };

        let raw = match config::merge(invocation.config_path.as_deref(), &invocation.overrides) {
            Ok(raw) => raw,
            Err(e) => {
                self.report(&format!("Configuration error: {e}"));
                return 1;
            }
        };

        let flow_name = match (invocation.flow, self.flows.keys().next()) {
            (Some(name), _) => name,
            (None, Some(only)) if self.flows.len() == 1 => only.clone(),
            _ => {
                self.report("Specify a flow or use --help for more information.");
                return 1;
            }
        };

        match self.run(&flow_name, &raw) {
            Ok(status) => status,
            Err(e) => {
                log::error!("Flow '{flow_name}' failed: {e}");
                self.report(&format!("Error in flow execution: {e}"));
                1
            }
        }
    }

    /// The command-line surface for the registered flows.
    pub fn command(&self) -> clap::Command {
        cli::build_command(&self.name, self.flows.values().map(|flow| flow.as_ref()))
    }

    fn report(&self, message: &str) {
        let mut stream = self
            .error_stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(stream, "{message}") {
            log::warn!("Failed to write to the error stream: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::describe::{Fields, Model, Parameters};
    use crate::core::error::WorkError;
    use crate::core::task::Returned;
    use crate::describe_model;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct DbConfig {
        host: String,
        port: u16,
    }

    impl Model for DbConfig {
        fn fields(fields: Fields) -> Fields {
            fields.required::<String>("host").with_default("port", 5432u16)
        }
    }

    describe_model!(DbConfig);

    #[derive(Debug, Deserialize)]
    struct MigrateParams {
        db: DbConfig,
    }

    impl Parameters for MigrateParams {
        fn declare(params: Fields) -> Fields {
            params.required::<DbConfig>("db")
        }
    }

    #[derive(Default)]
    struct Migrate {
        seen: Arc<Mutex<Vec<DbConfig>>>,
    }

    impl WorkLogic for Migrate {
        type Params = MigrateParams;
        type Output = ();

        fn name(&self) -> &str {
            "migrate"
        }

        fn run(&self, params: MigrateParams) -> Result<Returned<()>, WorkError> {
            if params.db.host == "unreachable" {
                return Err("connection refused".into());
            }
            self.seen.lock().map_err(|e| e.to_string())?.push(params.db);
            Ok(().into())
        }
    }

    struct Seed;

    impl WorkLogic for Seed {
        type Params = ();
        type Output = ();

        fn name(&self) -> &str {
            "seed"
        }

        fn run(&self, _params: ()) -> Result<Returned<()>, WorkError> {
            Ok(().into())
        }
    }

    fn app_with(buffer: &SharedBuffer) -> (App, Arc<Mutex<Vec<DbConfig>>>) {
        let migrate = Migrate::default();
        let seen = Arc::clone(&migrate.seen);
        let mut app = App::new("dbtool").with_error_stream(buffer.clone());
        app.register(Flow::new(migrate).unwrap()).unwrap();
        (app, seen)
    }

    fn raw(value: ConfigValue) -> RawConfig {
        match value {
            ConfigValue::Object(map) => map,
            _ => panic!("test configs are mappings"),
        }
    }

    #[test]
    fn test_run_success_is_status_zero() {
        let buffer = SharedBuffer::default();
        let (app, seen) = app_with(&buffer);
        let status = app.run("migrate", &raw(json!({"db": {"host": "localhost"}}))).unwrap();
        assert_eq!(status, 0);
        assert_eq!(seen.lock().unwrap()[0].port, 5432);
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_run_unknown_flow_reports() {
        let buffer = SharedBuffer::default();
        let (app, _) = app_with(&buffer);
        assert_eq!(app.run("F", &RawConfig::new()).unwrap(), 1);
        assert_eq!(buffer.contents(), "No flow found with the name 'F'.\n");
    }

    #[test]
    fn test_run_binding_error_reports() {
        let buffer = SharedBuffer::default();
        let (app, _) = app_with(&buffer);
        let status = app
            .run("migrate", &raw(json!({"db": {"host": "h", "port": "many"}})))
            .unwrap();
        assert_eq!(status, 1);
        assert!(buffer.contents().starts_with("Error in flow execution:"));
    }

    #[test]
    fn test_run_propagates_work_errors() {
        let buffer = SharedBuffer::default();
        let (app, _) = app_with(&buffer);
        let err = app
            .run("migrate", &raw(json!({"db": {"host": "unreachable"}})))
            .unwrap_err();
        assert!(matches!(err, ExecuteError::Work { .. }));
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let buffer = SharedBuffer::default();
        let (mut app, _) = app_with(&buffer);
        let err = app.register(Flow::new(Migrate::default()).unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "A flow with the name 'migrate' already exists.");
        assert_eq!(app.flow_names().collect::<Vec<_>>(), vec!["migrate"]);
    }

    #[test]
    fn test_main_without_flows() {
        let buffer = SharedBuffer::default();
        let app = App::new("empty").with_error_stream(buffer.clone());
        assert_eq!(app.main_from(["empty"]), 1);
        assert_eq!(buffer.contents(), "ERROR: No flow registered\n");
    }

    #[test]
    fn test_main_single_flow_runs_unnamed() {
        let buffer = SharedBuffer::default();
        let (app, seen) = app_with(&buffer);
        let status = app.main_from(["dbtool", "db.host=localhost", "db.port=6543"]);
        assert_eq!(status, 0);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[DbConfig {
                host: "localhost".into(),
                port: 6543
            }]
        );
    }

    #[test]
    fn test_main_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db:\n  host: filehost\n  port: 1000").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let buffer = SharedBuffer::default();
        let (app, seen) = app_with(&buffer);
        let status = app.main_from(["dbtool", "migrate", "--config", &path, "db.port=2000"]);
        assert_eq!(status, 0);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].host, "filehost");
        assert_eq!(seen[0].port, 2000);
    }

    #[test]
    fn test_main_many_flows_needs_a_name() {
        let buffer = SharedBuffer::default();
        let (mut app, _) = app_with(&buffer);
        app.register(Flow::new(Seed).unwrap()).unwrap();
        assert_eq!(app.main_from(["dbtool"]), 1);
        assert_eq!(
            buffer.contents(),
            "Specify a flow or use --help for more information.\n"
        );
        assert_eq!(app.main_from(["dbtool", "seed"]), 0);
    }

    #[test]
    fn test_main_config_error_is_status_one() {
        let buffer = SharedBuffer::default();
        let (app, _) = app_with(&buffer);
        assert_eq!(app.main_from(["dbtool", "migrate", "db..host=x"]), 1);
        assert!(buffer.contents().starts_with("Configuration error: malformed override"));
    }

    #[test]
    fn test_main_work_error_is_status_one() {
        let buffer = SharedBuffer::default();
        let (app, _) = app_with(&buffer);
        assert_eq!(app.main_from(["dbtool", "db.host=unreachable"]), 1);
        assert!(buffer.contents().contains("connection refused"));
    }
}
