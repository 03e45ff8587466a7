mod command;
mod handlers;

pub use command::{Command, CommandError, Outcome};
