use std::io::{self, BufRead, Write};

use colored::Colorize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::commands::{Command, CommandError, Outcome};
use crate::filesystem::FilesystemTree;
use crate::shell::tokenizer::split_words;

/// Exit status after any command failure.
const FAILURE_STATUS: i32 = 1;

/// Name the shell reports itself under in its closing `exit(N)` line.
const EXEC_NAME: &str = env!("CARGO_PKG_NAME");

/// Splits `reader` into lines, replacing invalid UTF-8 with U+FFFD instead of
/// failing. Line terminators (`\n` or `\r\n`) are stripped.
pub fn lossy_lines<R: BufRead>(mut reader: R) -> impl Iterator<Item = io::Result<String>> {
    let mut buffer = Vec::new();
    std::iter::from_fn(move || {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => None,
            Ok(_) => {
                if buffer.ends_with(b"\n") {
                    buffer.pop();
                    if buffer.ends_with(b"\r") {
                        buffer.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&buffer).into_owned()))
            }
            Err(error) => Some(Err(error)),
        }
    })
}

#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// Prompt to start with. `None` keeps the tree's default.
    pub prompt: Option<String>,
    /// Echo every line read back after the prompt.
    pub echo: bool,
    /// Paint error messages red.
    pub color: bool,
}

/// A session of the interpreter: one filesystem tree plus the exit status
/// accumulated so far.
#[derive(Debug)]
pub struct Shell {
    tree: FilesystemTree,
    exit_status: i32,
    options: ShellOptions,
}

impl Shell {
    pub fn new(options: ShellOptions) -> Self {
        let mut tree = FilesystemTree::new();
        if let Some(prompt) = &options.prompt {
            tree.set_prompt(prompt.clone());
        }
        Self {
            tree,
            exit_status: 0,
            options,
        }
    }

    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    /// Reads lines until end of input or `exit`, then prints the
    /// `yshell: exit(N)` status line. The prompt is shown before each read
    /// when `interactive` is set or echoing is on.
    pub fn run<I>(
        &mut self,
        lines: I,
        interactive: bool,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<(), ShellError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let show_prompt = interactive || self.options.echo;
        let mut lines = lines.into_iter();

        loop {
            if show_prompt {
                write!(out, "{}", self.tree.prompt()).context(OutputSnafu)?;
                out.flush().context(OutputSnafu)?;
            }
            let Some(line) = lines.next() else {
                if show_prompt {
                    writeln!(out).context(OutputSnafu)?;
                }
                debug!("End of input reached");
                return self.exit_status_message(out);
            };
            let line = line.context(InputSnafu)?;
            if self.options.echo {
                writeln!(out, "{line}").context(OutputSnafu)?;
            }

            if let Outcome::Exit(status) = self.execute_line(&line, out, err)? {
                if let Some(status) = status {
                    self.exit_status = status;
                }
                info!("exit({})", self.exit_status);
                return self.exit_status_message(out);
            }
        }
    }

    /// Runs a single input line. Command failures are reported on `err` and
    /// recorded in the exit status; only I/O failures of the sinks come back
    /// as errors.
    pub fn execute_line(
        &mut self,
        line: &str,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<Outcome, ShellError> {
        let words = split_words(line);
        let Some((name, operands)) = words.split_first() else {
            return Ok(Outcome::Continue);
        };
        debug!("Executing '{}' with operands {:?}", name, operands);

        let result = name
            .parse::<Command>()
            .and_then(|command| command.run(&mut self.tree, operands, out));
        match result {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.exit_status = FAILURE_STATUS;
                self.report(name, error, err)?;
                Ok(Outcome::Continue)
            }
        }
    }

    /// Tears the tree down and hands back the final exit status.
    pub fn finish(self) -> i32 {
        let released = self.tree.teardown();
        debug!("Shell finished, {} nodes released", released);
        self.exit_status
    }

    fn exit_status_message(&self, out: &mut dyn Write) -> Result<(), ShellError> {
        writeln!(out, "{}: exit({})", EXEC_NAME, self.exit_status).context(OutputSnafu)
    }

    fn report(&self, name: &str, error: CommandError, err: &mut dyn Write) -> Result<(), ShellError> {
        for failure in error.flatten() {
            let message = match failure {
                CommandError::NoSuchFunction { .. } => failure.to_string(),
                _ => format!("{name}: {failure}"),
            };
            if self.options.color {
                writeln!(err, "{}", message.red()).context(OutputSnafu)?;
            } else {
                writeln!(err, "{message}").context(OutputSnafu)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ShellError {
    #[snafu(display("Failed to read input"))]
    InputError { source: io::Error },
    #[snafu(display("Failed to write shell output"))]
    OutputError { source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    struct Transcript {
        out: String,
        err: String,
        status: i32,
    }

    fn run_script(options: ShellOptions, script: &str) -> Transcript {
        let mut shell = Shell::new(options);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let lines = script.lines().map(|line| Ok::<_, io::Error>(line.to_string()));
        shell.run(lines, false, &mut out, &mut err).unwrap();

        Transcript {
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
            status: shell.finish(),
        }
    }

    #[test]
    fn script_runs_until_exit() {
        let transcript = run_script(
            ShellOptions::default(),
            "# build a tree\nmkdir /a\nmake /a/f.txt hello world\ncat /a/f.txt\nexit 4\necho unreachable\n",
        );
        assert_eq!(transcript.out, "hello world\nyshell: exit(4)\n");
        assert_eq!(transcript.err, "");
        assert_eq!(transcript.status, 4);
    }

    #[test]
    fn failures_are_reported_and_set_status() {
        let transcript = run_script(ShellOptions::default(), "cat nothing\nbogus arg\npwd\n");

        assert_eq!(transcript.out, "/\nyshell: exit(1)\n");
        assert_eq!(
            transcript.err,
            "cat: nothing: No such file or directory\nbogus: No such function\n"
        );
        assert_eq!(transcript.status, 1);
    }

    #[test]
    fn exit_without_status_keeps_current_one() {
        let transcript = run_script(ShellOptions::default(), "rm missing\nexit\n");
        assert_eq!(transcript.status, 1);
    }

    #[test]
    fn end_of_input_reports_exit_status() {
        let transcript = run_script(ShellOptions::default(), "mkdir /a\n");
        assert_eq!(transcript.out, "yshell: exit(0)\n");
        assert_eq!(transcript.status, 0);
    }

    #[test]
    fn echo_mode_shows_prompt_and_line() {
        let options = ShellOptions {
            prompt: Some("$ ".into()),
            echo: true,
            color: false,
        };
        let transcript = run_script(options, "pwd\n");
        assert_eq!(transcript.out, "$ pwd\n/\n$ \nyshell: exit(0)\n");
    }

    #[test]
    fn prompt_command_changes_prompt() {
        let options = ShellOptions {
            echo: true,
            ..ShellOptions::default()
        };
        let transcript = run_script(options, "prompt >>\npwd\n");
        assert_eq!(transcript.out, "% prompt >>\n>> pwd\n/\n>> \nyshell: exit(0)\n");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("#only a comment")]
    fn blank_and_comment_lines_do_nothing(#[case] line: &str) {
        let mut shell = Shell::new(ShellOptions::default());
        let mut out = Vec::new();
        let mut err = Vec::new();

        let outcome = shell.execute_line(line, &mut out, &mut err).unwrap();
        assert_eq!(outcome, Outcome::Continue);
        assert!(out.is_empty() && err.is_empty());
        assert_eq!(shell.exit_status(), 0);
    }

    #[test]
    fn input_errors_stop_the_loop() {
        let mut shell = Shell::new(ShellOptions::default());
        let lines = vec![Err(io::Error::other("broken pipe"))];
        let result = shell.run(lines, false, &mut io::sink(), &mut io::sink());
        assert!(matches!(result, Err(ShellError::InputError { .. })));
        assert_eq!(shell.finish(), 0);
    }

    #[test]
    fn invalid_utf8_input_is_decoded_lossily() {
        let input: &[u8] = b"mkdir /a\necho \xff\xfe\r\npwd\n";
        let mut shell = Shell::new(ShellOptions::default());
        let mut out = Vec::new();
        let mut err = Vec::new();

        shell.run(lossy_lines(input), false, &mut out, &mut err).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\u{FFFD}\u{FFFD}\n/\nyshell: exit(0)\n"
        );
        assert!(err.is_empty());
        assert_eq!(shell.finish(), 0);
    }

    #[test]
    fn lossy_lines_keeps_a_last_line_without_terminator() {
        let input: &[u8] = b"pwd\n\nls";
        let lines: Vec<String> = lossy_lines(input).map(Result::unwrap).collect();
        assert_eq!(lines, vec!["pwd", "", "ls"]);
    }
}
