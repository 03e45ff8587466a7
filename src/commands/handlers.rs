//! One function per shell command. Commands taking several paths process
//! every one of them and report the failures together.

use std::io::Write;

use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::commands::command::{
    CommandError, FilesystemSnafu, MissingOperandSnafu, Outcome, OutputSnafu,
    TooManyOperandsSnafu,
};
use crate::filesystem::{FilesystemTree, Inode};

/// Exit status used when `exit` gets something that is not a number.
const INVALID_EXIT_STATUS: i32 = 127;

type CommandResult = Result<Outcome, CommandError>;

pub fn cat(tree: &FilesystemTree, operands: &[String], out: &mut dyn Write) -> CommandResult {
    ensure!(!operands.is_empty(), MissingOperandSnafu);
    for_each_operand(operands, |path| {
        let inode = tree.resolve(path).context(FilesystemSnafu)?;
        let words = tree.read(inode).context(FilesystemSnafu)?;
        writeln!(out, "{}", words.join(" ")).context(OutputSnafu)
    })
}

pub fn cd(tree: &mut FilesystemTree, operands: &[String]) -> CommandResult {
    let target = match operands {
        [] => None,
        [path] => Some(tree.resolve(path).context(FilesystemSnafu)?),
        _ => return TooManyOperandsSnafu.fail(),
    };
    tree.change_directory(target).context(FilesystemSnafu)?;
    Ok(Outcome::Continue)
}

pub fn echo(operands: &[String], out: &mut dyn Write) -> CommandResult {
    writeln!(out, "{}", operands.join(" ")).context(OutputSnafu)?;
    Ok(Outcome::Continue)
}

pub fn exit(operands: &[String]) -> CommandResult {
    let status = operands
        .first()
        .map(|word| word.parse::<i32>().unwrap_or(INVALID_EXIT_STATUS));
    debug!("exit requested with status {:?}", status);
    Ok(Outcome::Exit(status))
}

pub fn ls(tree: &FilesystemTree, operands: &[String], out: &mut dyn Write) -> CommandResult {
    for_each_directory(tree, operands, |inode| {
        let block = tree.list(inode).context(FilesystemSnafu)?;
        write!(out, "{block}").context(OutputSnafu)
    })
}

pub fn lsr(tree: &FilesystemTree, operands: &[String], out: &mut dyn Write) -> CommandResult {
    for_each_directory(tree, operands, |inode| {
        for block in tree.list_recursive(inode).context(FilesystemSnafu)? {
            write!(out, "{block}").context(OutputSnafu)?;
        }
        Ok(())
    })
}

pub fn make(tree: &mut FilesystemTree, operands: &[String]) -> CommandResult {
    let Some((path, words)) = operands.split_first() else {
        return MissingOperandSnafu.fail();
    };
    let (parent, name) = tree.resolve_parent(path).context(FilesystemSnafu)?;
    tree.make_file(parent, &name, words.to_vec())
        .context(FilesystemSnafu)?;
    Ok(Outcome::Continue)
}

pub fn mkdir(tree: &mut FilesystemTree, operands: &[String]) -> CommandResult {
    ensure!(!operands.is_empty(), MissingOperandSnafu);
    for_each_operand(operands, |path| {
        let (parent, name) = tree.resolve_parent(path).context(FilesystemSnafu)?;
        tree.make_directory(parent, &name).context(FilesystemSnafu)?;
        Ok(())
    })
}

pub fn prompt(tree: &mut FilesystemTree, operands: &[String]) -> CommandResult {
    ensure!(!operands.is_empty(), MissingOperandSnafu);
    tree.set_prompt(format!("{} ", operands.join(" ")));
    Ok(Outcome::Continue)
}

pub fn pwd(tree: &FilesystemTree, out: &mut dyn Write) -> CommandResult {
    writeln!(out, "{}", tree.pwd()).context(OutputSnafu)?;
    Ok(Outcome::Continue)
}

pub fn rm(tree: &mut FilesystemTree, operands: &[String]) -> CommandResult {
    ensure!(!operands.is_empty(), MissingOperandSnafu);
    for_each_operand(operands, |path| {
        let (parent, name) = tree.resolve_parent(path).context(FilesystemSnafu)?;
        tree.remove(parent, &name).context(FilesystemSnafu)
    })
}

pub fn rmr(tree: &mut FilesystemTree, operands: &[String]) -> CommandResult {
    ensure!(!operands.is_empty(), MissingOperandSnafu);
    for_each_operand(operands, |path| {
        let (parent, name) = tree.resolve_parent(path).context(FilesystemSnafu)?;
        let removed = tree
            .remove_recursive(parent, &name)
            .context(FilesystemSnafu)?;
        debug!("rmr {} released {} nodes", path, removed);
        Ok(())
    })
}

/// Runs `action` on each operand, keeping on after a failure.
fn for_each_operand<F>(operands: &[String], mut action: F) -> CommandResult
where
    F: FnMut(&str) -> Result<(), CommandError>,
{
    let mut errors: Vec<CommandError> = operands
        .iter()
        .filter_map(|operand| action(operand).err())
        .collect();

    match errors.len() {
        0 => Ok(Outcome::Continue),
        1 => Err(errors.remove(0)),
        _ => Err(CommandError::SeveralErrors { errors }),
    }
}

/// Resolves each operand to a directory, defaulting to the current one.
fn for_each_directory<F>(tree: &FilesystemTree, operands: &[String], mut action: F) -> CommandResult
where
    F: FnMut(Inode) -> Result<(), CommandError>,
{
    if operands.is_empty() {
        action(tree.cwd())?;
        return Ok(Outcome::Continue);
    }
    for_each_operand(operands, |path| {
        let inode = tree.resolve(path).context(FilesystemSnafu)?;
        action(inode)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::filesystem::FilesystemError;
    use rstest::*;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    /// Runs a command line against `tree`, returning what it printed.
    fn run(tree: &mut FilesystemTree, line: &str) -> Result<(Outcome, String), CommandError> {
        let words = words(line);
        let (name, operands) = words.split_first().unwrap();
        let command: Command = name.parse()?;
        let mut out = Vec::new();
        let outcome = command.run(tree, operands, &mut out)?;
        Ok((outcome, String::from_utf8(out).unwrap()))
    }

    fn output(tree: &mut FilesystemTree, line: &str) -> String {
        run(tree, line).unwrap().1
    }

    #[fixture]
    fn tree() -> FilesystemTree {
        FilesystemTree::new()
    }

    #[rstest]
    fn make_then_cat(mut tree: FilesystemTree) {
        output(&mut tree, "mkdir /a");
        output(&mut tree, "make /a/f.txt hello world");
        assert_eq!(output(&mut tree, "cat /a/f.txt"), "hello world\n");
    }

    #[rstest]
    fn ls_prints_header_and_entries(mut tree: FilesystemTree) {
        output(&mut tree, "mkdir /a");
        output(&mut tree, "make /a/f.txt hello world");

        assert_eq!(
            output(&mut tree, "ls /a"),
            "/a:\n     2       3  ./\n     1       3  ../\n     3      10  f.txt\n"
        );
    }

    #[rstest]
    fn ls_defaults_to_current_directory(mut tree: FilesystemTree) {
        output(&mut tree, "mkdir sub");
        output(&mut tree, "cd sub");
        assert!(output(&mut tree, "ls").starts_with("/sub:\n"));
    }

    #[rstest]
    fn lsr_lists_every_directory(mut tree: FilesystemTree) {
        output(&mut tree, "mkdir /a");
        output(&mut tree, "mkdir /a/b");
        let printed = output(&mut tree, "lsr /");
        let headers: Vec<&str> = printed.lines().filter(|l| l.ends_with(':')).collect();
        assert_eq!(headers, vec!["/:", "/a:", "/a/b:"]);
    }

    #[rstest]
    fn cat_reports_every_failed_operand(mut tree: FilesystemTree) {
        output(&mut tree, "make ok word");
        output(&mut tree, "mkdir dir");

        let err = run(&mut tree, "cat missing ok dir").unwrap_err();
        let failures: Vec<FilesystemError> = err
            .flatten()
            .iter()
            .filter_map(CommandError::filesystem_error)
            .cloned()
            .collect();
        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[0], FilesystemError::NotFound { .. }));
        assert!(matches!(failures[1], FilesystemError::NotAFile { .. }));
    }

    #[rstest]
    fn cd_and_pwd(mut tree: FilesystemTree) {
        output(&mut tree, "mkdir /a");
        output(&mut tree, "mkdir /a/b");
        output(&mut tree, "cd /a/b");
        assert_eq!(output(&mut tree, "pwd"), "/a/b\n");
        output(&mut tree, "cd ..");
        assert_eq!(output(&mut tree, "pwd"), "/a\n");
        output(&mut tree, "cd");
        assert_eq!(output(&mut tree, "pwd"), "/\n");
    }

    #[rstest]
    fn cd_into_file_fails(mut tree: FilesystemTree) {
        output(&mut tree, "make f x");
        let err = run(&mut tree, "cd f").unwrap_err();
        assert!(matches!(
            err.filesystem_error(),
            Some(FilesystemError::NotADirectory { .. })
        ));
        assert!(matches!(
            run(&mut tree, "cd a b"),
            Err(CommandError::TooManyOperands)
        ));
    }

    #[rstest]
    #[case("exit", Outcome::Exit(None))]
    #[case("exit 3", Outcome::Exit(Some(3)))]
    #[case("exit nope", Outcome::Exit(Some(127)))]
    fn exit_statuses(mut tree: FilesystemTree, #[case] line: &str, #[case] expected: Outcome) {
        assert_eq!(run(&mut tree, line).unwrap().0, expected);
    }

    #[rstest]
    fn echo_and_prompt(mut tree: FilesystemTree) {
        assert_eq!(output(&mut tree, "echo a  b c"), "a b c\n");
        output(&mut tree, "prompt my shell>");
        assert_eq!(tree.prompt(), "my shell> ");
    }

    #[rstest]
    #[case("cat")]
    #[case("make")]
    #[case("mkdir")]
    #[case("prompt")]
    #[case("rm")]
    #[case("rmr")]
    fn operands_are_required(mut tree: FilesystemTree, #[case] line: &str) {
        assert!(matches!(
            run(&mut tree, line),
            Err(CommandError::MissingOperand)
        ));
    }

    #[rstest]
    fn rm_and_rmr(mut tree: FilesystemTree) {
        output(&mut tree, "mkdir /a");
        output(&mut tree, "mkdir /a/b");
        output(&mut tree, "make /a/b/f x");

        let err = run(&mut tree, "rm /a").unwrap_err();
        assert!(matches!(
            err.filesystem_error(),
            Some(FilesystemError::DirectoryNotEmpty { .. })
        ));

        output(&mut tree, "rm /a/b/f");
        output(&mut tree, "rmr /a");
        assert_eq!(tree.list(tree.root()).unwrap().lines.len(), 2);
    }

    #[rstest]
    fn rmr_refuses_current_directory(mut tree: FilesystemTree) {
        output(&mut tree, "mkdir /a");
        output(&mut tree, "cd /a");
        let err = run(&mut tree, "rmr /a").unwrap_err();
        assert!(matches!(
            err.filesystem_error(),
            Some(FilesystemError::IsCurrentDirectory { .. })
        ));
    }
}
