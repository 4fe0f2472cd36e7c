//! Input groups discovery
//!
//! An input group is the set of files sharing the base name `X`:
//! `X.mrc`, `X_avrot.txt` and `X.txt`.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use glob::{glob_with, MatchOptions, Paths, Pattern};

use crate::{
    ctffind::{load_avrot, load_params, AvrotSeries, CtfParams},
    error::Error,
    mrc::{load_image, Micrograph},
};

type Result<T> = std::result::Result<T, Error>;

/// Files sharing a base name in the target directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InputGroup {
    dir: PathBuf,
    basename: String,
}
impl fmt::Display for InputGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.basename)
    }
}
impl InputGroup {
    pub fn new(dir: impl AsRef<Path>, basename: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            basename: basename.into(),
        }
    }
    /// Builds the group of a `X.mrc` file
    pub fn from_mrc(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if path.extension()? != "mrc" {
            return None;
        }
        let basename = path.file_stem()?.to_str()?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Some(Self::new(dir, basename))
    }
    pub fn basename(&self) -> &str {
        &self.basename
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    pub fn mrc_path(&self) -> PathBuf {
        self.dir.join(format!("{}.mrc", self.basename))
    }
    pub fn avrot_path(&self) -> PathBuf {
        self.dir.join(format!("{}_avrot.txt", self.basename))
    }
    pub fn params_path(&self) -> PathBuf {
        self.dir.join(format!("{}.txt", self.basename))
    }
    /// Path to the montage written in `output_dir`
    pub fn montage_path(&self, output_dir: impl AsRef<Path>) -> PathBuf {
        output_dir
            .as_ref()
            .join(format!("{}_montage.png", self.basename))
    }
    /// Loads the micrograph and the CTFFIND4 outputs
    pub fn load(&self) -> Result<LoadedGroup> {
        for path in [self.mrc_path(), self.avrot_path(), self.params_path()] {
            if !path.is_file() {
                return Err(Error::MissingCompanionFile(path));
            }
        }
        let avrot = load_avrot(self.avrot_path())?;
        let params = load_params(self.params_path())?;
        let micrograph = load_image(self.mrc_path())?;
        Ok(LoadedGroup {
            group: self.clone(),
            micrograph,
            avrot,
            params,
        })
    }
}

/// A group with all its inputs loaded
#[derive(Debug, Clone)]
pub struct LoadedGroup {
    pub group: InputGroup,
    pub micrograph: Micrograph,
    pub avrot: AvrotSeries,
    pub params: CtfParams,
}

/// Lazy iterator over the input groups of a directory, in alphabetical order
pub struct InputGroups {
    paths: Paths,
}
impl Iterator for InputGroups {
    type Item = InputGroup;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.paths.next()? {
                Ok(path) if path.is_file() => {
                    if let Some(group) = InputGroup::from_mrc(&path) {
                        return Some(group);
                    }
                }
                Ok(path) => log::debug!("skipping {:?}", path),
                Err(e) => log::warn!("skipping unreadable entry: {}", e),
            }
        }
    }
}

/// Scans `dir` for `*.mrc` files
///
/// Fails if `dir` does not exist, is not a directory or cannot be read.
pub fn scan(dir: impl AsRef<Path>) -> Result<InputGroups> {
    let dir = dir.as_ref();
    let metadata = fs::metadata(dir).map_err(|e| Error::Directory(e, dir.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(Error::NotADirectory(dir.to_path_buf()));
    }
    fs::read_dir(dir).map_err(|e| Error::Directory(e, dir.to_path_buf()))?;

    let pattern = Path::new(&Pattern::escape(&dir.to_string_lossy())).join("*.mrc");
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let paths = glob_with(&pattern.to_string_lossy(), options)
        .map_err(|e| Error::Pattern(e, dir.to_path_buf()))?;
    log::info!("Scanning {:?}...", dir);
    Ok(InputGroups { paths })
}
