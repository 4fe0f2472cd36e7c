use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

use super::{RenderError, Result, DEJAVU_SANS};
use crate::scanner::LoadedGroup;

const LINE_HEIGHT: i32 = 13;

/// Annotation lines of a group
pub(crate) fn annotations(loaded: &LoadedGroup) -> Vec<String> {
    let LoadedGroup {
        group,
        avrot,
        params,
        ..
    } = loaded;
    let name = |path: std::path::PathBuf| {
        path.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    vec![
        format!("MRC file:        {}", avrot.mrc_name),
        format!("avrot text file: {}", name(group.avrot_path())),
        format!("text file:       {}", name(group.params_path())),
        format!("Pixel size (Å): {:.3}", avrot.pixel_size),
        format!("Voltage (kV): {:.1}", avrot.voltage),
        format!("Cs (mm): {:.2}", avrot.spherical_aberration),
        match avrot.amplitude_contrast {
            Some(ac) => format!("Amplitude contrast: {:.2}", ac),
            None => "Amplitude contrast: n/a".to_string(),
        },
        format!("Df1 (Å): {:.2}", params.defocus_1),
        format!("Df2 (Å): {:.2}", params.defocus_2),
        format!("Azimuth (°): {:.2}", params.azimuth),
        format!("Phase shift (rad): {:.3}", params.phase_shift),
        format!("Cross correlation score: {:.4}", params.cross_correlation),
        format!(
            "Spacing up to which CTF rings were fit successfully (Å): {:.2}",
            params.fit_spacing
        ),
    ]
}

/// Gray panel with the file names and the CTF parameters
pub fn annotation_panel(loaded: &LoadedGroup, width: u32, height: u32) -> Result<RgbImage> {
    let font = FontRef::try_from_slice(DEJAVU_SANS).map_err(|_| RenderError::Font)?;
    let scale = PxScale::from(12.0);
    let white = Rgb([255u8, 255u8, 255u8]);

    let mut panel = RgbImage::from_pixel(width, height, Rgb([128, 128, 128]));
    let mut y = 10i32;
    for line in annotations(loaded) {
        draw_text_mut(&mut panel, white, 10, y, scale, &font, &line);
        y += LINE_HEIGHT;
    }
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::super::tests::loaded_group;
    use super::*;

    #[test]
    fn annotation_lines() {
        let lines = annotations(&loaded_group());
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "MRC file:        foo.mrc");
        assert_eq!(lines[1], "avrot text file: foo_avrot.txt");
        assert_eq!(lines[2], "text file:       foo.txt");
        assert_eq!(lines[3], "Pixel size (Å): 1.060");
        assert_eq!(lines[6], "Amplitude contrast: 0.07");
        assert_eq!(lines[7], "Df1 (Å): 10215.48");
        assert_eq!(lines[9], "Azimuth (°): -44.13");
        assert_eq!(lines[11], "Cross correlation score: 0.0752");
        assert_eq!(
            lines[12],
            "Spacing up to which CTF rings were fit successfully (Å): 3.92"
        );
    }

    #[test]
    fn unknown_amplitude_contrast() {
        let mut loaded = loaded_group();
        loaded.avrot.amplitude_contrast = None;
        assert_eq!(annotations(&loaded)[6], "Amplitude contrast: n/a");
    }

    #[test]
    fn panel_has_text() {
        let panel = annotation_panel(&loaded_group(), 600, 180).unwrap();
        assert_eq!(panel.dimensions(), (600, 180));
        assert_eq!(panel.get_pixel(599, 179), &Rgb([128, 128, 128]));
        assert!(panel.pixels().any(|p| p[0] > 200));
    }
}
