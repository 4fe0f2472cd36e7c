use image::{imageops, imageops::FilterType, GrayImage};

use super::{fit_into, Layout, RenderError, Result};
use crate::mrc::Micrograph;

/// Normalizes the pixels to the [0,255] range
fn to_gray(micrograph: &Micrograph) -> Result<Vec<u8>> {
    if micrograph.data.iter().any(|x| !x.is_finite()) {
        return Err(RenderError::NonFinitePixels);
    }
    let (min, max) = micrograph.minmax();
    let range = max - min;
    Ok(if range > 0. {
        micrograph
            .data
            .iter()
            .map(|&x| ((x - min) / range * 255.).round() as u8)
            .collect()
    } else {
        vec![128; micrograph.data.len()]
    })
}

/// Stretches the gray levels around their mean by `factor`
pub(crate) fn enhance_contrast(pixels: &mut [u8], factor: f32) {
    if pixels.is_empty() {
        return;
    }
    let mean = (pixels.iter().map(|&x| x as f64).sum::<f64>() / pixels.len() as f64).round() as f32;
    pixels
        .iter_mut()
        .for_each(|x| *x = (mean + factor * (*x as f32 - mean)).round().clamp(0., 255.) as u8);
}

/// Scales the gray levels by `factor`
pub(crate) fn enhance_brightness(pixels: &mut [u8], factor: f32) {
    pixels
        .iter_mut()
        .for_each(|x| *x = (*x as f32 * factor).round().clamp(0., 255.) as u8);
}

/// Averages non-overlapping `factor`x`factor` boxes, the incomplete boxes on the edges are dropped
pub(crate) fn reduce(pixels: &[u8], nx: usize, ny: usize, factor: usize) -> (Vec<u8>, usize, usize) {
    let factor = factor.clamp(1, nx.min(ny).max(1));
    let (mx, my) = (nx / factor, ny / factor);
    let area = (factor * factor) as u32;
    let reduced = (0..my)
        .flat_map(|j| {
            (0..mx).map(move |i| {
                let sum: u32 = (0..factor)
                    .flat_map(|v| {
                        let row = (j * factor + v) * nx + i * factor;
                        pixels[row..row + factor].iter().map(|&x| x as u32)
                    })
                    .sum();
                ((sum + area / 2) / area) as u8
            })
        })
        .collect();
    (reduced, mx, my)
}

/// Micrograph display panel fitted into a `side`x`side` square
pub fn micrograph_panel(micrograph: &Micrograph, layout: &Layout, side: u32) -> Result<GrayImage> {
    let mut pixels = to_gray(micrograph)?;
    enhance_contrast(&mut pixels, layout.contrast_factor);
    enhance_brightness(&mut pixels, layout.brightness_factor);
    let (reduced, mx, my) = reduce(
        &pixels,
        micrograph.nx,
        micrograph.ny,
        layout.bin_factor as usize,
    );
    let binned =
        GrayImage::from_raw(mx as u32, my as u32, reduced).ok_or(RenderError::Buffer)?;
    let (width, height) = fit_into(mx as u32, my as u32, side);
    log::debug!(
        "micrograph {}x{} displayed as {}x{}",
        micrograph.nx,
        micrograph.ny,
        width,
        height
    );
    Ok(imageops::resize(&binned, width, height, FilterType::Lanczos3))
}
