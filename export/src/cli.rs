// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Command-line interface to export and register objects without going through the REST API.

use crate::agency::{DepositError, DepositOutcome};
use crate::driver::{CommandAction, CommandOutcome, CommandRequest, Driver};
use crate::messages::{CLI_ERROR, INVALID_XML, REGISTER_SUCCESS, translate};
use clap::{Parser, Subcommand};
use pubexport_core::driver::{DriverError, DriverResult};
use pubexport_core::template;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Name of the program as shown in the usage text.
const SCRIPT_NAME: &str = "pubexport";

/// Usage text of the export and register commands.
const USAGE: &str = "Usage:
%script% [--plugin %plugin%] export [outputFile] [serverPath] preprints|galleys [ids...]
%script% [--plugin %plugin%] register [serverPath] preprints|galleys [ids...]
%script% serve [--bind address]";

/// Preprint metadata export and DOI deposit service.
#[derive(Debug, Parser)]
#[command(name = "pubexport")]
pub struct Cli {
    /// Registration agency plugin to act on.
    #[arg(long, global = true, default_value = "crossref")]
    pub plugin: String,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Commands offered by the program.
#[derive(Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Starts the REST server.
    Serve {
        /// Address on which to listen for requests.
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },

    /// Exports objects of a server into a file.
    Export {
        /// File to write the exported document to.
        output_file: PathBuf,

        /// Path of the server that owns the objects.
        server_path: String,

        /// Kind of the objects: preprints or galleys.
        object_type: String,

        /// Identifiers of the objects.
        ids: Vec<String>,
    },

    /// Deposits objects of a server with the agency of the plugin.
    Register {
        /// Path of the server that owns the objects.
        server_path: String,

        /// Kind of the objects: preprints or galleys.
        object_type: String,

        /// Identifiers of the objects.
        ids: Vec<String>,
    },
}

impl Command {
    /// Converts the command into a request for the driver, if it is one the driver handles.
    fn into_request(self) -> Option<CommandRequest> {
        match self {
            Command::Serve { .. } => None,
            Command::Export { output_file, server_path, object_type, ids } => Some(CommandRequest {
                action: CommandAction::Export(output_file),
                server_path,
                object_type,
                ids,
            }),
            Command::Register { server_path, object_type, ids } => Some(CommandRequest {
                action: CommandAction::Register,
                server_path,
                object_type,
                ids,
            }),
        }
    }
}

/// Returns the usage text for `plugin`.
fn usage(plugin: &str) -> String {
    template::apply(USAGE, &[("script", SCRIPT_NAME), ("plugin", plugin)])
}

/// Prints an error made of `lines` followed by the usage text for `plugin`.
fn write_error(out: &mut dyn Write, lines: &[String], plugin: &str) -> io::Result<()> {
    writeln!(out, "{}", translate(CLI_ERROR, None))?;
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    writeln!(out)?;
    writeln!(out, "{}", usage(plugin))
}

/// Prints the human-readable form of `outcome` for `plugin` to `out`.
fn write_outcome(out: &mut dyn Write, outcome: CommandOutcome, plugin: &str) -> io::Result<()> {
    match outcome {
        CommandOutcome::Usage => writeln!(out, "{}", usage(plugin)),

        CommandOutcome::Error(message) => write_error(out, &[message], plugin),

        CommandOutcome::Invalid(exported) => {
            writeln!(out, "{}", translate(INVALID_XML, None))?;
            for diagnostic in exported.diagnostics {
                writeln!(out, "- Line {}: {}", diagnostic.line, diagnostic.message)?;
            }
            Ok(())
        }

        CommandOutcome::Exported(_) => Ok(()),

        CommandOutcome::Deposited(DepositOutcome::Registered) => {
            writeln!(out, "{}", translate(REGISTER_SUCCESS, None))
        }

        CommandOutcome::Deposited(DepositOutcome::Errors(errors))
        | CommandOutcome::Deposited(DepositOutcome::Partial { errors, .. }) => {
            writeln!(out, "{}", translate(CLI_ERROR, None))?;
            for error in errors {
                writeln!(out, "*** {}", translate(&error.key, error.param.as_deref()))?;
            }
            writeln!(out)?;
            writeln!(out, "{}", usage(plugin))
        }

        CommandOutcome::Deposited(DepositOutcome::Failed(_)) => {
            let error = DepositError::opaque();
            write_error(out, &[translate(&error.key, error.param.as_deref())], plugin)
        }
    }
}

/// Runs `command` for `plugin` against `driver` and prints its outcome to `out`.
///
/// Relative output files are resolved against `cwd`.  Problems with the command line are printed
/// and are not errors.
pub(crate) async fn run_command(
    driver: Driver,
    plugin: &str,
    command: Command,
    cwd: &Path,
    out: &mut dyn Write,
) -> DriverResult<()> {
    let outcome = match command.into_request() {
        Some(req) => match driver.execute_command(plugin, req, cwd).await {
            Ok(outcome) => outcome,
            Err(DriverError::NotFound(message)) => CommandOutcome::Error(message),
            Err(e) => return Err(e),
        },
        None => CommandOutcome::Usage,
    };

    write_outcome(out, outcome, plugin)
        .map_err(|e| DriverError::BackendError(format!("Cannot write output: {}", e)))
}
