use std::path::Path;

use regex::Regex;

use super::{parse_numbers, ParseError, Result};

const SERIES: [&str; 5] = [
    "spatial frequency",
    "rotational average (no astigmatism)",
    "rotational average",
    "CTF fit",
    "cross-correlation",
];

/// CTFFIND4 rotational averages
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AvrotSeries {
    /// input micrograph file name, without its directory
    pub mrc_name: String,
    /// pixel size [Å]
    pub pixel_size: f64,
    /// acceleration voltage [kV]
    pub voltage: f64,
    /// spherical aberration [mm]
    pub spherical_aberration: f64,
    pub amplitude_contrast: Option<f64>,
    /// spatial frequency [1/Å]
    pub spatial_frequency: Vec<f64>,
    /// rotational average of the spectrum assuming no astigmatism
    pub rot_avg_no_astig: Vec<f64>,
    /// rotational average of the spectrum
    pub rot_avg: Vec<f64>,
    pub ctf_fit: Vec<f64>,
    /// cross-correlation between the spectrum and the CTF fit
    pub cross_correlation: Vec<f64>,
}
impl AvrotSeries {
    /// Number of samples in each series
    pub fn len(&self) -> usize {
        self.spatial_frequency.len()
    }
    pub fn is_empty(&self) -> bool {
        self.spatial_frequency.is_empty()
    }
    /// Iterator over the `(name, samples)` of the series that are plotted
    pub fn plotted(&self) -> impl Iterator<Item = (&'static str, &[f64])> {
        [
            (SERIES[2], self.rot_avg.as_slice()),
            (SERIES[3], self.ctf_fit.as_slice()),
            (SERIES[4], self.cross_correlation.as_slice()),
        ]
        .into_iter()
    }
    pub(crate) fn parse(path: &Path, contents: &str) -> Result<Self> {
        let re_input = Regex::new(r"Input file:\s*(.*?)\s*;")?;
        let re_pixel = Regex::new(r"Pixel size:\s*([^\s;]+)")?;
        let re_voltage = Regex::new(r"acceleration voltage:\s*([^\s;]+)")?;
        let re_cs = Regex::new(r"spherical aberration:\s*([^\s;]+)")?;
        let re_ac = Regex::new(r"amplitude contrast:\s*([^\s;]+)")?;

        let (header, rows): (Vec<_>, Vec<_>) = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .partition(|(_, line)| line.trim_start().starts_with('#'));

        let capture = |re: &Regex| {
            header
                .iter()
                .find_map(|(k, line)| re.captures(line).map(|c| (*k + 1, c[1].to_string())))
        };
        let number = |re: &Regex, field: &'static str| -> Result<f64> {
            let (line, token) =
                capture(re).ok_or_else(|| ParseError::MissingField(path.to_path_buf(), field))?;
            token.parse::<f64>().map_err(|_| ParseError::Number {
                path: path.to_path_buf(),
                line,
                token,
            })
        };

        let mrc_name = capture(&re_input)
            .map(|(_, name)| name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or_default().to_string())
            .ok_or_else(|| ParseError::MissingField(path.to_path_buf(), "input file"))?;
        let pixel_size = number(&re_pixel, "pixel size")?;
        let voltage = number(&re_voltage, "acceleration voltage")?;
        let spherical_aberration = number(&re_cs, "spherical aberration")?;
        let amplitude_contrast = if capture(&re_ac).is_some() {
            Some(number(&re_ac, "amplitude contrast")?)
        } else {
            None
        };

        let mut series: Vec<Vec<f64>> = Vec::with_capacity(SERIES.len());
        for (i, &name) in SERIES.iter().enumerate() {
            let (k, line) = rows
                .get(i)
                .ok_or_else(|| ParseError::MissingLine(path.to_path_buf(), header.len() + i + 1))?;
            let samples = parse_numbers(path, k + 1, line)?;
            if let Some(first) = series.first() {
                let n = first.len();
                if samples.len() != n {
                    return Err(ParseError::Length(path.to_path_buf(), name, samples.len(), n));
                }
            } else if samples.is_empty() {
                return Err(ParseError::Length(path.to_path_buf(), name, 0, 1));
            }
            series.push(samples);
        }
        if rows.len() > SERIES.len() {
            log::debug!("{:?}: ignoring {} trailing row(s)", path, rows.len() - SERIES.len());
        }

        let mut series = series.into_iter();
        let mut next = || series.next().unwrap_or_default();
        Ok(Self {
            mrc_name,
            pixel_size,
            voltage,
            spherical_aberration,
            amplitude_contrast,
            spatial_frequency: next(),
            rot_avg_no_astig: next(),
            rot_avg: next(),
            ctf_fit: next(),
            cross_correlation: next(),
        })
    }
}
