use crate::core::describe::{Fields, Parameters};
use crate::core::error::WorkError;
use crate::core::task::{Returned, WorkLogic};
use crate::tasks::TaskError;
use serde::Deserialize;
use std::process::Command;

#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd", "/C");
#[cfg(not(windows))]
const SHELL: (&str, &str) = ("sh", "-c");

/// Runs `command` through the platform shell.
///
/// Returns the trimmed stdout followed by stderr, and the exit code
/// (`-1` when the process was killed by a signal).
pub fn run_shell(command: &str) -> Result<(String, i32), TaskError> {
    let (program, flag) = SHELL;
    let output = Command::new(program)
        .arg(flag)
        .arg(command)
        .output()
        .map_err(TaskError::io(program))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok((text.trim().to_string(), output.status.code().unwrap_or(-1)))
}

/// Runs a shell command and returns its output.
///
/// A non-zero exit is an error unless the task is `silent`.
#[derive(Debug, Clone, Default)]
pub struct RunCommand {
    pub silent: bool,
}

impl RunCommand {
    pub fn silent() -> Self {
        Self { silent: true }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunCommandParams {
    pub command: String,
}

impl Parameters for RunCommandParams {
    fn declare(params: Fields) -> Fields {
        params.required::<String>("command")
    }
}

impl WorkLogic for RunCommand {
    type Params = RunCommandParams;
    type Output = String;

    fn name(&self) -> &str {
        "run-command"
    }

    fn run(&self, params: RunCommandParams) -> Result<Returned<String>, WorkError> {
        log::info!("Running command: {}", params.command);
        let (output, code) = run_shell(&params.command)?;
        if code != 0 && !self.silent {
            log::error!("Command failed with status {code}: {output}");
            return Err(TaskError::CommandFailed {
                command: params.command,
                code,
                output,
            }
            .into());
        }
        Ok(output.into())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::RawConfig;
    use crate::core::error::ExecuteError;
    use crate::core::task::Task;
    use serde_json::json;

    fn raw(command: &str) -> RawConfig {
        let mut raw = RawConfig::new();
        raw.insert("command".into(), json!(command));
        raw
    }

    #[test]
    fn test_run_shell_captures_both_streams() {
        let (output, code) = run_shell("echo out; echo err 1>&2; exit 3").unwrap();
        assert_eq!(output, "out\nerr");
        assert_eq!(code, 3);
    }

    #[test]
    fn test_output_is_trimmed() {
        let task = Task::new(RunCommand::default()).unwrap();
        let out = task.execute(&raw("printf '  hello  \\n'")).unwrap();
        assert_eq!(out.as_deref(), Some("hello"));
    }

    #[test]
    fn test_failure_is_a_work_error() {
        let task = Task::new(RunCommand::default()).unwrap();
        let err = task.execute(&raw("echo broken; exit 2")).unwrap_err();
        let ExecuteError::Work { source, .. } = err else {
            panic!("expected a work error");
        };
        let task_error = source.downcast_ref::<TaskError>().unwrap();
        assert!(matches!(
            task_error,
            TaskError::CommandFailed { code: 2, output, .. } if output == "broken"
        ));
    }

    #[test]
    fn test_silent_returns_output_on_failure() {
        let task = Task::new(RunCommand::silent()).unwrap();
        let out = task.execute(&raw("echo partial; exit 1")).unwrap();
        assert_eq!(out.as_deref(), Some("partial"));
    }

    #[test]
    fn test_command_is_required() {
        let task = Task::new(RunCommand::default()).unwrap();
        assert!(matches!(
            task.execute(&RawConfig::new()),
            Err(ExecuteError::Binding(_))
        ));
    }
}
