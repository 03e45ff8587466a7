use std::io::Write;
use std::str::FromStr;

use derive_more::Display;
use snafu::Snafu;

use crate::commands::handlers;
use crate::filesystem::{FilesystemError, FilesystemTree};

/// What the shell should do once a command has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// Stop reading input. `None` keeps the current exit status.
    Exit(Option<i32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Command {
    #[display("cat")]
    Cat,
    #[display("cd")]
    Cd,
    #[display("echo")]
    Echo,
    #[display("exit")]
    Exit,
    #[display("ls")]
    Ls,
    #[display("lsr")]
    Lsr,
    #[display("make")]
    Make,
    #[display("mkdir")]
    Mkdir,
    #[display("prompt")]
    Prompt,
    #[display("pwd")]
    Pwd,
    #[display("rm")]
    Rm,
    #[display("rmr")]
    Rmr,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let command = match name {
            "cat" => Command::Cat,
            "cd" => Command::Cd,
            "echo" => Command::Echo,
            "exit" => Command::Exit,
            "ls" => Command::Ls,
            "lsr" => Command::Lsr,
            "make" => Command::Make,
            "mkdir" => Command::Mkdir,
            "prompt" => Command::Prompt,
            "pwd" => Command::Pwd,
            "rm" => Command::Rm,
            "rmr" => Command::Rmr,
            _ => return NoSuchFunctionSnafu { name }.fail(),
        };
        Ok(command)
    }
}

impl Command {
    /// Runs the command against `tree` with the words following the command
    /// name, writing regular output to `out`.
    pub fn run(
        self,
        tree: &mut FilesystemTree,
        operands: &[String],
        out: &mut dyn Write,
    ) -> Result<Outcome, CommandError> {
        match self {
            Command::Cat => handlers::cat(tree, operands, out),
            Command::Cd => handlers::cd(tree, operands),
            Command::Echo => handlers::echo(operands, out),
            Command::Exit => handlers::exit(operands),
            Command::Ls => handlers::ls(tree, operands, out),
            Command::Lsr => handlers::lsr(tree, operands, out),
            Command::Make => handlers::make(tree, operands),
            Command::Mkdir => handlers::mkdir(tree, operands),
            Command::Prompt => handlers::prompt(tree, operands),
            Command::Pwd => handlers::pwd(tree, out),
            Command::Rm => handlers::rm(tree, operands),
            Command::Rmr => handlers::rmr(tree, operands),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommandError {
    #[snafu(display("{name}: No such function"))]
    NoSuchFunction { name: String },
    #[snafu(display("missing operand"))]
    MissingOperand,
    #[snafu(display("too many operands"))]
    TooManyOperands,
    #[snafu(display("{source}"))]
    FilesystemError { source: FilesystemError },
    #[snafu(display("Failed to write command output"))]
    OutputError { source: std::io::Error },
    #[snafu(display("{} operands failed", errors.len()))]
    SeveralErrors { errors: Vec<CommandError> },
}

impl CommandError {
    /// Splits an aggregate of per-operand failures back into its parts.
    pub fn flatten(self) -> Vec<CommandError> {
        match self {
            CommandError::SeveralErrors { errors } => {
                errors.into_iter().flat_map(CommandError::flatten).collect()
            }
            other => vec![other],
        }
    }

    pub fn filesystem_error(&self) -> Option<&FilesystemError> {
        match self {
            CommandError::FilesystemError { source } => Some(source),
            _ => None,
        }
    }
}
