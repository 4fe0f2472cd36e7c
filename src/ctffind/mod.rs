//! CTFFIND4 text outputs
//!
//! CTFFIND4 writes two text files next to its diagnostic image:
//!  - `X_avrot.txt`, the 1D rotational averages of the spectrum and of the fit,
//!  - `X.txt`, the fitted CTF parameters.
//!
//! Both layouts are fixed by CTFFIND4 and are parsed as is.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

mod avrot;
mod params;
pub use avrot::AvrotSeries;
pub use params::CtfParams;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("{0:?}: missing line #{1}")]
    MissingLine(PathBuf, usize),
    #[error("{0:?}: missing field `{1}`")]
    MissingField(PathBuf, &'static str),
    #[error("{path:?}: line #{line}: `{token}` is not a number")]
    Number {
        path: PathBuf,
        line: usize,
        token: String,
    },
    #[error("{0:?}: series `{1}` has {2} samples instead of {3}")]
    Length(PathBuf, &'static str, usize, usize),
    #[error("invalid header pattern")]
    Regex(#[from] regex::Error),
}
type Result<T> = std::result::Result<T, ParseError>;

fn read_to_string(path: &Path) -> Result<String> {
    log::info!("Loading {:?}...", path);
    fs::read_to_string(path).map_err(|e| ParseError::Io(e, path.to_path_buf()))
}

/// Parses a whitespace separated line of numbers; `line` is 1-based
fn parse_numbers(path: &Path, line: usize, content: &str) -> Result<Vec<f64>> {
    content
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| ParseError::Number {
                path: path.to_path_buf(),
                line,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Loads the rotational averages from a CTFFIND4 `_avrot.txt` file
pub fn load_avrot(path: impl AsRef<Path>) -> Result<AvrotSeries> {
    let path = path.as_ref();
    AvrotSeries::parse(path, &read_to_string(path)?)
}

/// Loads the fitted CTF parameters from a CTFFIND4 `.txt` file
pub fn load_params(path: impl AsRef<Path>) -> Result<CtfParams> {
    let path = path.as_ref();
    CtfParams::parse(path, &read_to_string(path)?)
}
