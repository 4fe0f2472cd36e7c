/*!
# Montage rendering

A montage stacks, from top to bottom:
 - the micrograph and its power spectrum, side by side,
 - the rotational average plot with the CTF fit,
 - the annotation panel with the fitted parameters.

The layout is fixed by [`Layout`], so rendering the same inputs twice gives
identical images.
*/

use std::{fs, path::Path, path::PathBuf};

use image::{imageops, DynamicImage, GrayImage, ImageError, Rgb, RgbImage};

use crate::{
    scanner::LoadedGroup, BIN_FACTOR, BRIGHTNESS_FACTOR, CONTRAST_FACTOR, MARGIN, MAX_SPAT_FREQ,
    SPECTRUM_BOX,
};

mod annotation;
mod micrograph;
mod plot;
mod spectrum;
pub use annotation::annotation_panel;
pub use micrograph::micrograph_panel;
pub use plot::rotational_average_plot;
pub use spectrum::{power_spectrum, spectrum_panel};

/// Font used for all the montage text
pub(crate) const DEJAVU_SANS: &[u8] =
    include_bytes!("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid layout: {0} must be finite and positive")]
    Layout(&'static str),
    #[error("series `{0}` has non-finite samples")]
    NonFinite(&'static str),
    #[error("micrograph has non-finite pixels")]
    NonFinitePixels,
    #[error("micrograph is too small ({0}x{1}) for a power spectrum")]
    TooSmall(usize, usize),
    #[error("failed to load font")]
    Font,
    #[error("failed to draw the rotational average plot: {0}")]
    Plot(String),
    #[error("failed to create image buffer")]
    Buffer,
    #[error("failed to save montage to {1:?}")]
    Save(#[source] ImageError, PathBuf),
}
type Result<T> = std::result::Result<T, RenderError>;

/// Montage geometry and display settings
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub(crate) contrast_factor: f32,
    pub(crate) brightness_factor: f32,
    pub(crate) bin_factor: u32,
    pub(crate) max_spat_freq: f64,
    pub(crate) margin: u32,
    pub(crate) spectrum_box: usize,
    pub(crate) plot_size: (u32, u32),
    pub(crate) annotation_height: u32,
}
impl Default for Layout {
    fn default() -> Self {
        Self {
            contrast_factor: CONTRAST_FACTOR,
            brightness_factor: BRIGHTNESS_FACTOR,
            bin_factor: BIN_FACTOR,
            max_spat_freq: MAX_SPAT_FREQ,
            margin: MARGIN,
            spectrum_box: SPECTRUM_BOX,
            plot_size: (600, 300),
            annotation_height: 180,
        }
    }
}
impl Layout {
    pub fn contrast_factor(self, contrast_factor: f32) -> Self {
        Self {
            contrast_factor,
            ..self
        }
    }
    pub fn brightness_factor(self, brightness_factor: f32) -> Self {
        Self {
            brightness_factor,
            ..self
        }
    }
    pub fn bin_factor(self, bin_factor: u32) -> Self {
        Self {
            bin_factor: bin_factor.max(1),
            ..self
        }
    }
    pub fn max_spatial_frequency(self, max_spat_freq: f64) -> Self {
        Self {
            max_spat_freq,
            ..self
        }
    }
    pub fn spectrum_box(self, spectrum_box: usize) -> Self {
        Self {
            spectrum_box,
            ..self
        }
    }
    /// Checks that the display factors are finite and positive
    pub fn check(&self) -> Result<()> {
        for (name, value) in [
            ("contrast factor", self.contrast_factor as f64),
            ("brightness factor", self.brightness_factor as f64),
            ("max spatial frequency", self.max_spat_freq),
        ] {
            if !(value.is_finite() && value > 0.) {
                return Err(RenderError::Layout(name));
            }
        }
        Ok(())
    }
    /// Side of the micrograph and power spectrum square panels
    pub fn panel_side(&self) -> u32 {
        (self.plot_size.0.saturating_sub(self.margin) / 2).max(1)
    }
    /// Montage (width,height)
    pub fn size(&self) -> (u32, u32) {
        let (plot_width, plot_height) = self.plot_size;
        (
            2 * self.margin + plot_width,
            3 * self.margin + self.panel_side() + plot_height + self.annotation_height,
        )
    }
}

/// A composed montage
#[derive(Debug, Clone, PartialEq)]
pub struct Montage {
    image: RgbImage,
}
impl Montage {
    /// Renders the montage of a loaded group
    pub fn render(loaded: &LoadedGroup, layout: &Layout) -> Result<Self> {
        layout.check()?;
        let side = layout.panel_side();
        let margin = layout.margin;
        let (width, height) = layout.size();
        let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

        let pixel_size = if loaded.avrot.pixel_size > 0. {
            loaded.avrot.pixel_size
        } else {
            loaded.micrograph.pixel_size as f64
        };

        let micrograph = to_rgb(micrograph_panel(&loaded.micrograph, layout, side)?);
        let x = margin + (side - micrograph.width()) / 2;
        let y = margin + (side - micrograph.height()) / 2;
        imageops::overlay(&mut image, &micrograph, x as i64, y as i64);

        let spectrum = to_rgb(spectrum_panel(&loaded.micrograph, pixel_size, layout, side)?);
        imageops::overlay(&mut image, &spectrum, (2 * margin + side) as i64, margin as i64);

        let top = 2 * margin + side;
        let plot = rotational_average_plot(&loaded.avrot, layout)?;
        imageops::overlay(&mut image, &plot, margin as i64, top as i64);

        let annotation = annotation_panel(loaded, layout.plot_size.0, layout.annotation_height)?;
        imageops::overlay(
            &mut image,
            &annotation,
            margin as i64,
            (top + plot.height()) as i64,
        );

        Ok(Self { image })
    }
    pub fn image(&self) -> &RgbImage {
        &self.image
    }
    /// Writes the montage as a PNG file, removing any partial output on failure
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.image.save(path).map_err(|e| {
            if path.exists() {
                let _ = fs::remove_file(path);
            }
            RenderError::Save(e, path.to_path_buf())
        })
    }
}

fn to_rgb(image: GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(image).to_rgb8()
}

/// Width and height of an image of size `(nx,ny)` fitted into a `side` square
pub(crate) fn fit_into(nx: u32, ny: u32, side: u32) -> (u32, u32) {
    if nx >= ny {
        let h = (side as f64 * ny as f64 / nx as f64).round() as u32;
        (side, h.clamp(1, side))
    } else {
        let w = (side as f64 * nx as f64 / ny as f64).round() as u32;
        (w.clamp(1, side), side)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{error::Error, path::Path};

    use super::*;
    use crate::{
        ctffind::{
            tests::{AVROT, PARAMS},
            AvrotSeries, CtfParams,
        },
        mrc::Micrograph,
        scanner::InputGroup,
    };

    /// Deterministic micrograph with rings and a gradient
    pub(crate) fn micrograph(nx: usize, ny: usize) -> Micrograph {
        let data = (0..ny)
            .flat_map(|y| {
                (0..nx).map(move |x| {
                    let (dx, dy) = (x as f32 - nx as f32 / 2., y as f32 - ny as f32 / 2.);
                    let r = (dx * dx + dy * dy).sqrt();
                    (r * 0.7).sin() + 0.01 * x as f32 + ((x * 7 + y * 13) % 5) as f32 * 0.1
                })
            })
            .collect();
        Micrograph {
            nx,
            ny,
            pixel_size: 1.06,
            data,
        }
    }

    pub(crate) fn loaded_group() -> LoadedGroup {
        LoadedGroup {
            group: InputGroup::new("data", "foo"),
            micrograph: micrograph(96, 64),
            avrot: AvrotSeries::parse(Path::new("foo_avrot.txt"), AVROT).unwrap(),
            params: CtfParams::parse(Path::new("foo.txt"), PARAMS).unwrap(),
        }
    }

    #[test]
    fn layout_size() {
        let layout = Layout::default();
        assert_eq!(layout.panel_side(), 295);
        assert_eq!(layout.size(), (620, 30 + 295 + 300 + 180));
    }

    #[test]
    fn invalid_layouts() {
        let loaded = loaded_group();
        for max_spat_freq in [0., -0.2, f64::NAN, f64::INFINITY] {
            let layout = Layout::default().max_spatial_frequency(max_spat_freq);
            assert!(matches!(
                Montage::render(&loaded, &layout),
                Err(RenderError::Layout("max spatial frequency"))
            ));
        }
        let layout = Layout::default().contrast_factor(f32::NAN);
        assert!(matches!(
            layout.check(),
            Err(RenderError::Layout("contrast factor"))
        ));
        let layout = Layout::default().brightness_factor(0.);
        assert!(matches!(
            layout.check(),
            Err(RenderError::Layout("brightness factor"))
        ));
        assert!(Layout::default().check().is_ok());
    }

    #[test]
    fn fitting() {
        assert_eq!(fit_into(400, 200, 100), (100, 50));
        assert_eq!(fit_into(200, 400, 100), (50, 100));
        assert_eq!(fit_into(300, 300, 100), (100, 100));
        assert_eq!(fit_into(1000, 1, 100), (100, 1));
    }

    #[test]
    fn montage() {
        let layout = Layout::default().spectrum_box(32);
        let montage = Montage::render(&loaded_group(), &layout).unwrap();
        assert_eq!(montage.image().dimensions(), layout.size());
        assert_eq!(montage.image().get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn deterministic_montage() {
        let layout = Layout::default().spectrum_box(32);
        let loaded = loaded_group();
        let a = Montage::render(&loaded, &layout).unwrap();
        let b = Montage::render(&loaded, &layout).unwrap();
        assert!(a == b);
    }

    #[test]
    fn non_finite_series() {
        let mut loaded = loaded_group();
        loaded.avrot.ctf_fit[3] = f64::NAN;
        assert!(matches!(
            Montage::render(&loaded, &Layout::default().spectrum_box(32)),
            Err(RenderError::NonFinite("CTF fit"))
        ));
    }

    #[test]
    fn save_png() -> std::result::Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("foo_montage.png");
        let layout = Layout::default().spectrum_box(32);
        let montage = Montage::render(&loaded_group(), &layout)?;
        montage.save(&path)?;
        let saved = image::open(&path)?.to_rgb8();
        assert!(&saved == montage.image());
        Ok(())
    }

    #[test]
    fn save_failure() {
        let montage = Montage {
            image: RgbImage::new(4, 4),
        };
        let path = Path::new("no/such/directory/foo_montage.png");
        assert!(matches!(montage.save(path), Err(RenderError::Save(..))));
        assert!(!path.exists());
    }
}
