//! Power spectrum of a micrograph
//!
//! The micrograph is cut into square tiles, the power spectra of the tiles are
//! averaged and the result is centered on the zero frequency.

use image::{imageops, imageops::FilterType, GrayImage};
use rustfft::{num_complex::Complex, FftPlanner};

use super::{Layout, RenderError, Result};
use crate::mrc::Micrograph;

/// Averaged and centered power spectrum of `box_size`x`box_size` tiles
///
/// Returns the tile size and the row-major spectrum.
pub fn power_spectrum(micrograph: &Micrograph, box_size: usize) -> Result<(usize, Vec<f64>)> {
    let Micrograph { nx, ny, data, .. } = micrograph;
    let (nx, ny) = (*nx, *ny);
    let n = box_size.min(nx).min(ny);
    if n < 2 {
        return Err(RenderError::TooSmall(nx, ny));
    }
    if data.iter().any(|x| !x.is_finite()) {
        return Err(RenderError::NonFinitePixels);
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);

    let mut power = vec![0f64; n * n];
    let mut tile = vec![Complex::new(0f64, 0f64); n * n];
    let mut column = vec![Complex::new(0f64, 0f64); n];
    let n_tile = (nx / n) * (ny / n);
    for ty in 0..ny / n {
        for tx in 0..nx / n {
            for j in 0..n {
                let row = (ty * n + j) * nx + tx * n;
                tile[j * n..(j + 1) * n]
                    .iter_mut()
                    .zip(&data[row..row + n])
                    .for_each(|(c, &x)| *c = Complex::new(x as f64, 0.));
            }
            let mean = tile.iter().map(|c| c.re).sum::<f64>() / (n * n) as f64;
            tile.iter_mut().for_each(|c| c.re -= mean);

            tile.chunks_exact_mut(n).for_each(|row| fft.process(row));
            for i in 0..n {
                column
                    .iter_mut()
                    .enumerate()
                    .for_each(|(j, c)| *c = tile[j * n + i]);
                fft.process(&mut column);
                column
                    .iter()
                    .enumerate()
                    .for_each(|(j, c)| tile[j * n + i] = *c);
            }

            power
                .iter_mut()
                .zip(&tile)
                .for_each(|(p, c)| *p += c.norm_sqr());
        }
    }

    let h = n / 2;
    let mut centered = vec![0f64; n * n];
    for j in 0..n {
        for i in 0..n {
            centered[((j + h) % n) * n + (i + h) % n] = power[j * n + i] / n_tile as f64;
        }
    }
    Ok((n, centered))
}

/// `(p,q)` percentiles of `values`
fn percentiles(values: &[f64], p: f64, q: f64) -> (f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let at = |f: f64| sorted[((f * (sorted.len() - 1) as f64).round() as usize).min(sorted.len() - 1)];
    (at(p), at(q))
}

/// Power spectrum display panel of size `side`x`side`
///
/// The spectrum is cropped to `max_spat_freq` when the pixel size is known.
pub fn spectrum_panel(
    micrograph: &Micrograph,
    pixel_size: f64,
    layout: &Layout,
    side: u32,
) -> Result<GrayImage> {
    let (n, spectrum) = power_spectrum(micrograph, layout.spectrum_box)?;
    let h = n / 2;
    let mut log_spectrum: Vec<f64> = spectrum.iter().map(|p| p.ln_1p()).collect();
    // zero frequency
    log_spectrum[h * n + h] = log_spectrum[h * n + (h + 1) % n];

    let fraction = if pixel_size > 0. {
        (2. * pixel_size * layout.max_spat_freq).clamp(0., 1.)
    } else {
        1.
    };
    let r = ((h as f64 * fraction).round() as usize).clamp(1, h);
    let (start, size) = (h - r, (2 * r).min(n));
    let cropped: Vec<f64> = (start..start + size)
        .flat_map(|j| log_spectrum[j * n + start..j * n + start + size].iter().copied())
        .collect();
    log::debug!(
        "power spectrum: {}px tiles cropped to {}px ({:.0}% of Nyquist)",
        n,
        size,
        fraction * 100.
    );

    let (lo, hi) = percentiles(&cropped, 0.01, 0.99);
    let pixels: Vec<u8> = if hi > lo {
        cropped
            .iter()
            .map(|&x| ((x - lo) / (hi - lo) * 255.).round().clamp(0., 255.) as u8)
            .collect()
    } else {
        vec![128; cropped.len()]
    };
    let crop = GrayImage::from_raw(size as u32, size as u32, pixels).ok_or(RenderError::Buffer)?;
    Ok(imageops::resize(&crop, side, side, FilterType::Lanczos3))
}
