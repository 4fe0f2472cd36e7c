use std::{io, path::PathBuf};

use strum_macros::{Display, EnumIter};

use crate::{ctffind::ParseError, mrc::MrcError, render::RenderError};

/// The kind of failure, as reported on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ErrorKind {
    DirectoryError,
    MissingCompanionFile,
    FormatError,
    ParseError,
    RenderError,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot read target directory {1:?}")]
    Directory(#[source] io::Error, PathBuf),
    #[error("target {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("invalid glob pattern for {0:?}")]
    Pattern(#[source] glob::PatternError, PathBuf),
    #[error("missing companion file {0:?}")]
    MissingCompanionFile(PathBuf),
    #[error("failed to load micrograph")]
    Format(#[from] MrcError),
    #[error("failed to parse CTFFIND4 output")]
    Parse(#[from] ParseError),
    #[error("failed to render montage")]
    Render(#[from] RenderError),
}
impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Directory(..) | Error::NotADirectory(_) | Error::Pattern(..) => {
                ErrorKind::DirectoryError
            }
            Error::MissingCompanionFile(_) => ErrorKind::MissingCompanionFile,
            Error::Format(_) => ErrorKind::FormatError,
            Error::Parse(_) => ErrorKind::ParseError,
            Error::Render(_) => ErrorKind::RenderError,
        }
    }
    /// Only directory errors abort a batch
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::DirectoryError
    }
}

/// Formats an error followed by its chain of causes
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut current = e.source();
    while let Some(cause) = current {
        msg.push_str(&format!(": {}", cause));
        current = cause.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn kind_names() {
        let names: Vec<_> = ErrorKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "DirectoryError",
                "MissingCompanionFile",
                "FormatError",
                "ParseError",
                "RenderError"
            ]
        );
    }

    #[test]
    fn only_directory_errors_are_fatal() {
        let e = Error::NotADirectory(PathBuf::from("foo.mrc"));
        assert!(e.is_fatal());
        let e = Error::MissingCompanionFile(PathBuf::from("foo.txt"));
        assert!(!e.is_fatal());
        assert_eq!(e.kind(), ErrorKind::MissingCompanionFile);
    }

    #[test]
    fn chain_includes_causes() {
        let e = Error::Directory(
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
            PathBuf::from("data"),
        );
        assert_eq!(
            error_chain(&e),
            r#"cannot read target directory "data": no such file"#
        );
    }
}
