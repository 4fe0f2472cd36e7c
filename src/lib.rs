//! # CTF montage
//!
//! Batch composition of cryo-EM micrograph montages from CTFFIND4 outputs.
//!
//! For every base name `X` found in a target directory, the crate reads
//!  - `X.mrc`: the micrograph,
//!  - `X_avrot.txt`: the CTFFIND4 rotational average table,
//!  - `X.txt`: the CTFFIND4 fit parameters,
//!
//! and writes `X_montage.png` with the micrograph, its power spectrum, the
//! rotational average plot and the fitted parameters.
//!
//! ```no_run
//! use ctf_montage::Batch;
//!
//! let summary = Batch::default().data_path("/path/to/target").run()?;
//! println!("{summary}");
//! # Ok::<(), ctf_montage::Error>(())
//! ```

pub mod batch;
pub mod ctffind;
pub mod error;
pub mod mrc;
pub mod render;
pub mod scanner;

pub use batch::{Batch, Summary};
pub use ctffind::{load_avrot, load_params, AvrotSeries, CtfParams, ParseError};
pub use error::{Error, ErrorKind};
pub use mrc::{load_image, Micrograph, MrcError};
pub use render::{Layout, Montage, RenderError};
pub use scanner::{scan, InputGroup, InputGroups, LoadedGroup};

/// Contrast enhancement factor applied to the micrograph panel
pub const CONTRAST_FACTOR: f32 = 2.5;
/// Brightness factor applied to the micrograph panel
pub const BRIGHTNESS_FACTOR: f32 = 1.0;
/// Micrograph box-reduction factor before resizing
pub const BIN_FACTOR: u32 = 4;
/// Upper bound of the spatial frequency axis [1/Å]
pub const MAX_SPAT_FREQ: f64 = 0.35;
/// Margin around and between the montage panels [px]
pub const MARGIN: u32 = 10;
/// Largest tile side used to average the power spectrum [px]
pub const SPECTRUM_BOX: usize = 512;
