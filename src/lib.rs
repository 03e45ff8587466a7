//! A small shell over a simulated, in-memory filesystem.
//!
//! [`filesystem`] holds the tree of files and directories; [`commands`] and
//! [`shell`] turn input lines into operations on it.

#![allow(clippy::enum_variant_names)]

pub mod application;
pub mod cli;
pub mod commands;
pub mod config;
pub mod filesystem;
pub mod shell;
