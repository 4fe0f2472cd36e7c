use std::path::Path;

use super::{parse_numbers, ParseError, Result};

const COLUMNS: [&str; 7] = [
    "micrograph number",
    "defocus 1",
    "defocus 2",
    "azimuth of astigmatism",
    "additional phase shift",
    "cross correlation",
    "fit spacing",
];

/// CTFFIND4 fitted parameters of one micrograph
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CtfParams {
    pub micrograph_number: f64,
    /// defocus 1 [Å]
    pub defocus_1: f64,
    /// defocus 2 [Å]
    pub defocus_2: f64,
    /// azimuth of astigmatism [deg]
    pub azimuth: f64,
    /// additional phase shift [rad]
    pub phase_shift: f64,
    pub cross_correlation: f64,
    /// spacing up to which CTF rings were fit successfully [Å]
    pub fit_spacing: f64,
}
impl CtfParams {
    /// Parses the first row that is neither blank nor a `#` comment
    pub(crate) fn parse(path: &Path, contents: &str) -> Result<Self> {
        let (k, line) = contents
            .lines()
            .enumerate()
            .find(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .ok_or_else(|| {
                ParseError::MissingLine(path.to_path_buf(), contents.lines().count() + 1)
            })?;
        let values = parse_numbers(path, k + 1, line)?;
        if let Some(&missing) = COLUMNS.get(values.len()) {
            return Err(ParseError::MissingField(path.to_path_buf(), missing));
        }
        Ok(Self {
            micrograph_number: values[0],
            defocus_1: values[1],
            defocus_2: values[2],
            azimuth: values[3],
            phase_shift: values[4],
            cross_correlation: values[5],
            fit_spacing: values[6],
        })
    }
}
