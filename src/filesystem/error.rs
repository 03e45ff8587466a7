use snafu::Snafu;

/// Failures of the simulated filesystem. Every variant carries the name of the
/// entry (or path) the operation choked on.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FilesystemError {
    #[snafu(display("{name}: No such file or directory"))]
    NotFound { name: String },
    #[snafu(display("{name}: File exists"))]
    AlreadyExists { name: String },
    #[snafu(display("{name}: Not a directory"))]
    NotADirectory { name: String },
    #[snafu(display("{name}: Not a plain file"))]
    NotAFile { name: String },
    #[snafu(display("{name}: Is a directory"))]
    IsADirectory { name: String },
    #[snafu(display("{name}: Directory not empty"))]
    DirectoryNotEmpty { name: String },
    #[snafu(display("{name}: Cannot delete the current directory"))]
    IsCurrentDirectory { name: String },
    #[snafu(display("{name}: Refusing to delete '.', '..' or '/'"))]
    RefusesToDeleteDotDotOrRoot { name: String },
}
