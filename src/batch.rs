//! Batch montage generation
//!
//! Every input group of the target directory is loaded, rendered and written
//! in turn. A group that fails is reported and skipped, only an invalid
//! target directory aborts the batch.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    error::{error_chain, Error, ErrorKind},
    render::{Layout, Montage},
    scanner::{scan, InputGroup},
};

type Result<T> = std::result::Result<T, Error>;

/// Outcome of a batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Summary {
    /// base names of the groups with a montage
    pub processed: Vec<String>,
    /// base names and error kinds of the skipped groups
    pub failed: Vec<(String, ErrorKind)>,
}
impl Summary {
    pub fn n_success(&self) -> usize {
        self.processed.len()
    }
    pub fn n_failure(&self) -> usize {
        self.failed.len()
    }
    pub fn len(&self) -> usize {
        self.n_success() + self.n_failure()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SUMMARY: {} succeeded, {} failed",
            self.n_success(),
            self.n_failure()
        )?;
        for (name, kind) in &self.failed {
            write!(f, "\n - {:16}: {}", name, kind)?;
        }
        Ok(())
    }
}

/// Batch montage generator
pub struct Batch {
    data_path: PathBuf,
    output_path: Option<PathBuf>,
    layout: Layout,
}
impl Default for Batch {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            output_path: None,
            layout: Layout::default(),
        }
    }
}
impl Batch {
    /// Sets the directory with the micrographs and the CTFFIND4 outputs
    pub fn data_path<P: AsRef<Path>>(self, data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Sets the directory the montages are written to, defaults to the data directory
    pub fn output_path<P: AsRef<Path>>(self, output_path: P) -> Self {
        Self {
            output_path: Some(output_path.as_ref().to_path_buf()),
            ..self
        }
    }
    pub fn layout(self, layout: Layout) -> Self {
        Self { layout, ..self }
    }
    /// Loads, renders and writes the montage of one group
    pub fn process(&self, group: &InputGroup, output_dir: &Path) -> Result<PathBuf> {
        let loaded = group.load()?;
        let montage = Montage::render(&loaded, &self.layout)?;
        let path = group.montage_path(output_dir);
        montage.save(&path)?;
        Ok(path)
    }
    /// Processes all the groups of the data directory
    pub fn run(&self) -> Result<Summary> {
        let groups: Vec<InputGroup> = scan(&self.data_path)?.collect();
        let output_dir = match &self.output_path {
            Some(path) => {
                fs::create_dir_all(path).map_err(|e| Error::Directory(e, path.clone()))?;
                path.clone()
            }
            None => self.data_path.clone(),
        };
        let n_group = groups.len();
        println!("Found {} micrograph(s) in {:?}", n_group, self.data_path);

        let pb = ProgressBar::new(n_group as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message("Generating montage(s)");

        let summary = groups
            .iter()
            .enumerate()
            .fold(Summary::default(), |mut summary, (i, group)| {
                log::info!("[{}/{}] {}", i + 1, n_group, group);
                match self.process(group, &output_dir) {
                    Ok(path) => {
                        log::info!("{}: montage saved to {:?}", group, path);
                        summary.processed.push(group.to_string());
                    }
                    Err(e) => {
                        let kind = e.kind();
                        let chain = error_chain(&e);
                        log::warn!("{}: {}", group, chain);
                        pb.suspend(|| println!("{}: {}: {}", group, kind, chain));
                        summary.failed.push((group.to_string(), kind));
                    }
                }
                pb.inc(1);
                summary
            });
        pb.finish_with_message("Done");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs::File};

    use super::*;

    #[test]
    fn summary_display() {
        let summary = Summary {
            processed: vec!["foo".into()],
            failed: vec![("bar".into(), ErrorKind::MissingCompanionFile)],
        };
        assert_eq!(summary.len(), 2);
        assert_eq!(
            summary.to_string(),
            "SUMMARY: 1 succeeded, 1 failed\n - bar             : MissingCompanionFile"
        );
    }

    #[test]
    fn missing_directory_is_fatal() {
        let err = Batch::default()
            .data_path("does/not/exist")
            .run()
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_directory() -> std::result::Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let summary = Batch::default().data_path(dir.path()).run()?;
        assert!(summary.is_empty());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn lone_micrograph_is_skipped() -> std::result::Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        File::create(dir.path().join("bar.mrc"))?;
        let summary = Batch::default().data_path(dir.path()).run()?;
        assert_eq!(
            summary.failed,
            vec![("bar".to_string(), ErrorKind::MissingCompanionFile)]
        );
        assert!(!dir.path().join("bar_montage.png").exists());
        Ok(())
    }
}
