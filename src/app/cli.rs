//! The generated command-line surface: one sub-command per registered flow.

use crate::core::flow::Dispatch;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// What the command line asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub flow: Option<String>,
    pub config_path: Option<PathBuf>,
    pub overrides: Vec<String>,
}

/// Builds the command for `app_name` and its flows.
///
/// With a single flow the config options are accepted at the top level too,
/// so the flow can run without being named.
pub fn build_command<'a>(app_name: &str, flows: impl IntoIterator<Item = &'a dyn Dispatch>) -> Command {
    let flows: Vec<&dyn Dispatch> = flows.into_iter().collect();

    let mut command = Command::new(app_name.to_string())
        .about(format!("{app_name} flows"))
        .subcommand_value_name("FLOW")
        .subcommand_help_heading("Flows");

    for flow in &flows {
        let sub = Command::new(flow.name().to_string())
            .about(format!("Run the '{}' flow", flow.name()))
            .after_help(schema_help(*flow));
        command = command.subcommand(config_args(sub));
    }

    if let [only] = flows.as_slice() {
        command = config_args(command)
            .args_conflicts_with_subcommands(true)
            .after_help(schema_help(*only));
    }

    command
}

fn config_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("YAML file with the flow configuration"),
        )
        .arg(
            Arg::new("overrides")
                .value_name("KEY=VALUE")
                .num_args(0..)
                .action(ArgAction::Append)
                .help("Dotted-path overrides, applied after the config file in order"),
        )
}

fn schema_help(flow: &dyn Dispatch) -> String {
    format!(
        "Specify following in config or as x=y on commandline:\n{}",
        flow.compact_schema().to_yaml()
    )
}

/// Parses `args` (including the program name) against `command`.
pub fn parse<I, T>(command: Command, args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command.try_get_matches_from(args)?;
    Ok(match matches.subcommand() {
        Some((flow, sub)) => Invocation {
            flow: Some(flow.to_string()),
            ..read_config_args(sub)
        },
        None => read_config_args(&matches),
    })
}

// `try_get_*` because the top level only defines these args for single-flow apps.
fn read_config_args(matches: &ArgMatches) -> Invocation {
    let config_path = matches
        .try_get_one::<PathBuf>("config")
        .ok()
        .flatten()
        .cloned();
    let overrides = matches
        .try_get_many::<String>("overrides")
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    Invocation {
        flow: None,
        config_path,
        overrides,
    }
}
