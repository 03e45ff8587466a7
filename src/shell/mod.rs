//! The interpreter loop driving a [`crate::filesystem::FilesystemTree`].

mod shell;
mod tokenizer;

pub use shell::{Shell, ShellError, ShellOptions, lossy_lines};
pub use tokenizer::split_words;
